//! # headset-core
//!
//! Core types, traits, and error definitions shared across all hands-free
//! headset crates.
//!
//! This crate provides:
//! - Call state and the LED patterns projected from it
//! - Parsed AT messages and outgoing AT commands
//! - Button events produced by the I/O layer
//! - Audio route requests and phone/system volume mapping
//! - Common error types

pub mod audio;
pub mod call;
pub mod error;
pub mod input;
pub mod message;
pub mod volume;

pub use audio::{AudioProfile, AudioRouteRequest};
pub use call::{CallState, LedFrame, LedPattern};
pub use error::{AudioRouteError, ConfigError, HardwareIoError, LinkError, StoreError};
pub use input::{Button, ButtonEvent, PressKind};
pub use message::{
    Ack, AtMessage, AtMessageKind, CallDirection, CallListEntry, CallStatus, OutgoingCommand,
    VolumeChannel,
};
pub use volume::{phone_to_system, system_to_phone, VolumeState, MAX_PHONE_LEVEL};
