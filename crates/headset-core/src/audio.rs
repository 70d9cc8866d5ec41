//! Audio route requests.

use std::fmt;

use crate::call::CallState;

/// Audio profile requested from the host sound server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioProfile {
    /// Call audio routed over the SCO link (HFP head unit profile).
    CallRouting,
    /// No call audio.
    Idle,
}

impl fmt::Display for AudioProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioProfile::CallRouting => f.write_str("call-routing"),
            AudioProfile::Idle => f.write_str("idle"),
        }
    }
}

/// A profile change requested by the call state machine.
///
/// `reason` is the call state that caused the request; it is carried for
/// diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioRouteRequest {
    pub profile: AudioProfile,
    pub reason: CallState,
}

impl AudioRouteRequest {
    pub fn new(profile: AudioProfile, reason: CallState) -> Self {
        Self { profile, reason }
    }
}
