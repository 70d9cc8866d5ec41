//! Error types for Bluetooth operations.

use thiserror::Error;

/// Bluetooth-specific error types.
#[derive(Error, Debug)]
pub enum BluetoothError {
    /// Bluetooth adapter not found.
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// Another service already owns the Hands-Free profile.
    #[error("Hands-Free profile is already registered by another service")]
    ProfileInUse,

    /// Incoming connection could not be accepted.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// BlueZ D-Bus error.
    #[error("BlueZ error: {0}")]
    BlueZ(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for Bluetooth operations.
pub type Result<T> = std::result::Result<T, BluetoothError>;
