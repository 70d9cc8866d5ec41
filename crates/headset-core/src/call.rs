//! Call state and its LED projection.

use std::fmt;

/// The single authoritative call state.
///
/// Only one call is tracked at a time; three-way calling is not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallState {
    /// No call in progress.
    #[default]
    Idle,
    /// The phone is ringing.
    Incoming,
    /// A call placed from the phone is dialing or alerting.
    Outgoing,
    /// A call is connected.
    Active,
    /// The connected call is on hold.
    Held,
}

impl CallState {
    /// Whether any call (ringing, dialing, connected or held) exists.
    pub fn has_call(self) -> bool {
        self != CallState::Idle
    }

    /// Whether the call is being set up and has not connected yet.
    pub fn is_setup(self) -> bool {
        matches!(self, CallState::Incoming | CallState::Outgoing)
    }

    /// LED pattern shown for this state on the call LED.
    pub fn led_pattern(self) -> LedPattern {
        match self {
            CallState::Idle => LedPattern::Off,
            CallState::Incoming => LedPattern::BlinkFast,
            CallState::Outgoing => LedPattern::SolidOn,
            CallState::Active => LedPattern::PulseSlow,
            CallState::Held => LedPattern::SolidOn,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Incoming => "incoming",
            CallState::Outgoing => "outgoing",
            CallState::Active => "active",
            CallState::Held => "held",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drive pattern for a single LED.
///
/// Never stored by the state machine; recomputed on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LedPattern {
    /// Pin held low.
    #[default]
    Off,
    /// Pin held high.
    SolidOn,
    /// Fast square wave.
    BlinkFast,
    /// Slow square wave.
    PulseSlow,
}

/// Patterns for both LEDs, published as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedFrame {
    /// Link LED: on while a phone is connected.
    pub status: LedPattern,
    /// Call LED: projection of the call state.
    pub call: LedPattern,
}

impl LedFrame {
    pub fn new(status: LedPattern, call: LedPattern) -> Self {
        Self { status, call }
    }

    /// Frame shown while no phone is connected.
    pub fn disconnected() -> Self {
        Self::new(LedPattern::PulseSlow, LedPattern::Off)
    }

    /// Frame shown while a phone is connected and in `state`.
    pub fn connected(state: CallState) -> Self {
        Self::new(LedPattern::SolidOn, state.led_pattern())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_projection() {
        assert_eq!(CallState::Idle.led_pattern(), LedPattern::Off);
        assert_eq!(CallState::Incoming.led_pattern(), LedPattern::BlinkFast);
        assert_eq!(CallState::Outgoing.led_pattern(), LedPattern::SolidOn);
        assert_eq!(CallState::Active.led_pattern(), LedPattern::PulseSlow);
        assert_eq!(CallState::Held.led_pattern(), LedPattern::SolidOn);
    }

    #[test]
    fn setup_states() {
        assert!(CallState::Incoming.is_setup());
        assert!(CallState::Outgoing.is_setup());
        assert!(!CallState::Active.is_setup());
        assert!(!CallState::Idle.has_call());
        assert!(CallState::Held.has_call());
    }

    #[test]
    fn frames() {
        assert_eq!(LedFrame::default(), LedFrame::new(LedPattern::Off, LedPattern::Off));
        assert_eq!(LedFrame::disconnected().status, LedPattern::PulseSlow);
        assert_eq!(
            LedFrame::connected(CallState::Incoming),
            LedFrame::new(LedPattern::SolidOn, LedPattern::BlinkFast)
        );
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(CallState::Incoming.to_string(), "incoming");
        assert_eq!(format!("{}", CallState::Held), "held");
    }
}
