//! LED pattern rendering.
//!
//! | Pattern   | Output                    |
//! |-----------|---------------------------|
//! | Off       | low                       |
//! | SolidOn   | high                      |
//! | BlinkFast | 200 ms high / 200 ms low  |
//! | PulseSlow | 500 ms high / 500 ms low  |
//!
//! Every pattern starts with its "on" half, and a pattern change restarts
//! the phase so the new pattern shows on the next tick.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use headset_core::{LedFrame, LedPattern};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

const BLINK_FAST_HALF_MS: u64 = 200;
const PULSE_SLOW_HALF_MS: u64 = 500;

/// Pin level for `pattern` at `phase_ms` into the pattern.
pub fn level(pattern: LedPattern, phase_ms: u64) -> bool {
    let square = |half: u64| (phase_ms / half) % 2 == 0;
    match pattern {
        LedPattern::Off => false,
        LedPattern::SolidOn => true,
        LedPattern::BlinkFast => square(BLINK_FAST_HALF_MS),
        LedPattern::PulseSlow => square(PULSE_SLOW_HALF_MS),
    }
}

/// Tracks the active pattern and when it started.
#[derive(Debug, Clone, Default)]
pub struct LedRenderer {
    pattern: LedPattern,
    started_ms: u64,
}

impl LedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> LedPattern {
        self.pattern
    }

    /// Level to drive at `now_ms`, switching to `pattern` first if it changed.
    pub fn render(&mut self, pattern: LedPattern, now_ms: u64) -> bool {
        if pattern != self.pattern {
            self.pattern = pattern;
            self.started_ms = now_ms;
        }
        level(self.pattern, now_ms.saturating_sub(self.started_ms))
    }
}

struct LedOutput<P> {
    name: &'static str,
    pin: P,
    renderer: LedRenderer,
    driven: Option<bool>,
    disabled: bool,
}

impl<P: OutputPin> LedOutput<P> {
    fn new(name: &'static str, pin: P) -> Self {
        Self {
            name,
            pin,
            renderer: LedRenderer::new(),
            driven: None,
            disabled: false,
        }
    }

    fn drive(&mut self, pattern: LedPattern, now_ms: u64) {
        if self.disabled {
            return;
        }
        let high = self.renderer.render(pattern, now_ms);
        if self.driven == Some(high) {
            return;
        }

        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.driven = Some(high),
            Err(e) => {
                warn!("Writing {} failed, LED disabled: {:?}", self.name, e);
                self.disabled = true;
            }
        }
    }
}

/// Renders published [`LedFrame`]s onto the status and call LEDs.
pub struct LedDriver<P> {
    status: Option<LedOutput<P>>,
    call: Option<LedOutput<P>>,
    frames: watch::Receiver<LedFrame>,
    tick: Duration,
}

impl<P: OutputPin> LedDriver<P> {
    /// Either LED may be absent.
    pub fn new(
        status: Option<P>,
        call: Option<P>,
        frames: watch::Receiver<LedFrame>,
        tick: Duration,
    ) -> Self {
        Self {
            status: status.map(|pin| LedOutput::new("led_status", pin)),
            call: call.map(|pin| LedOutput::new("led_call", pin)),
            frames,
            tick,
        }
    }

    /// Drive both LEDs for `frame` at `now_ms`.
    pub fn render(&mut self, frame: LedFrame, now_ms: u64) {
        if let Some(status) = self.status.as_mut() {
            status.drive(frame.status, now_ms);
        }
        if let Some(call) = self.call.as_mut() {
            call.drive(frame.call, now_ms);
        }
    }

    /// Render until the publishing side is dropped.
    ///
    /// The last published frame is drawn once more before returning.
    pub async fn run(mut self) {
        let start = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let closed = self.frames.has_changed().is_err();
            let frame = *self.frames.borrow_and_update();
            self.render(frame, start.elapsed().as_millis() as u64);

            if closed {
                debug!("LED publisher gone, LED driver stopping");
                return;
            }
        }
    }
}
