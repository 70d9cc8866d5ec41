//! Error types for the hands-free headset.
//!
//! Only [`LinkError`] changes call state. Everything else is absorbed by the
//! component that raised it and reported through logging.

use thiserror::Error;

/// The RFCOMM signaling link is gone. Terminal for the link.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("AT link closed by peer")]
    Closed,

    #[error("AT link I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AT send timed out")]
    Timeout,
}

/// Applying an audio profile or volume failed. Recoverable.
#[derive(Error, Debug)]
pub enum AudioRouteError {
    #[error("No phone bound to the audio controller")]
    NoDevice,

    #[error("Bluetooth audio card not found for {0}")]
    CardNotFound(String),

    #[error("Audio server command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Audio server is not available: {0}")]
    Unavailable(String),

    #[error("Audio operation timed out")]
    Timeout,

    #[error("Volume persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Persisted state could not be read or written.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    Encoding(String),
}

/// GPIO read or write failed. Degrades the affected pin to log-only.
#[derive(Error, Debug)]
pub enum HardwareIoError {
    #[error("GPIO {pin} error: {reason}")]
    Gpio { pin: String, reason: String },

    #[error("GPIO chip {0} is not available")]
    ChipUnavailable(String),
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(String),

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
