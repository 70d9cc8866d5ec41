//! # headset-audio
//!
//! Drives the host sound server in lockstep with the call state: switches
//! the phone's Bluetooth card between its call and idle profiles, mirrors
//! speaker and microphone gain, and remembers the speaker level per phone.
//!
//! Every failure here is recoverable. Callers log it and carry on with the
//! call.

pub mod controller;
pub mod pactl;
pub mod server;
pub mod store;

pub use controller::{ApplyOutcome, AudioRouteController, ProfileNames, RetryPolicy};
pub use pactl::PactlServer;
pub use server::AudioServer;
pub use store::VolumeStore;
