//! Debounce and press classification for a single button.
//!
//! | Gesture     | Condition                         | Emitted                  |
//! |-------------|-----------------------------------|--------------------------|
//! | Press       | Release before `long_press`       | on release               |
//! | Long press  | Hold reaches `long_press`         | once, while still held   |
//!
//! A level change is only accepted after it has been stable for `debounce`.

use std::time::Duration;

use headset_core::PressKind;

const DEFAULT_DEBOUNCE_MS: u64 = 50;
const DEFAULT_LONG_PRESS_MS: u64 = 1500;

/// Timing thresholds shared by all buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub debounce: Duration,
    pub long_press: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            long_press: Duration::from_millis(DEFAULT_LONG_PRESS_MS),
        }
    }
}

/// Per-button debounce state machine. Feed it one sample per poll.
#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_ms: u64,
    long_press_ms: u64,
    /// Last accepted level.
    pressed: bool,
    /// Level that differs from `pressed` and since when it has been seen.
    candidate: Option<(bool, u64)>,
    pressed_since: u64,
    long_fired: bool,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            debounce_ms: config.debounce.as_millis() as u64,
            long_press_ms: config.long_press.as_millis() as u64,
            pressed: false,
            candidate: None,
            pressed_since: 0,
            long_fired: false,
        }
    }

    /// Whether the button is currently considered held.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed a raw sample taken at `now_ms` (monotonic milliseconds).
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> Option<PressKind> {
        if raw_pressed == self.pressed {
            self.candidate = None;
        } else {
            let since = match self.candidate {
                Some((level, since)) if level == raw_pressed => since,
                _ => {
                    self.candidate = Some((raw_pressed, now_ms));
                    now_ms
                }
            };

            if now_ms.saturating_sub(since) >= self.debounce_ms {
                self.candidate = None;
                self.pressed = raw_pressed;

                if raw_pressed {
                    self.pressed_since = since;
                    self.long_fired = false;
                } else if !self.long_fired {
                    return Some(PressKind::Press);
                }
            }
        }

        if self.pressed
            && !self.long_fired
            && now_ms.saturating_sub(self.pressed_since) >= self.long_press_ms
        {
            self.long_fired = true;
            return Some(PressKind::LongPress);
        }

        None
    }
}
