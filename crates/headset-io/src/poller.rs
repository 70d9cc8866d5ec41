//! Button sampling.

use std::time::Duration;

use embedded_hal::digital::InputPin;
use headset_core::{Button, ButtonEvent, PressKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::debounce::{DebounceConfig, Debouncer};

const EVENT_QUEUE: usize = 16;

struct PolledButton<P> {
    button: Button,
    pin: P,
    debouncer: Debouncer,
    disabled: bool,
}

/// Samples button pins at a fixed interval and debounces them.
pub struct ButtonPoller<P> {
    buttons: Vec<PolledButton<P>>,
    config: DebounceConfig,
    interval: Duration,
    active_low: bool,
}

impl<P: InputPin> ButtonPoller<P> {
    /// `active_low`: a pressed button pulls the line low.
    pub fn new(config: DebounceConfig, interval: Duration, active_low: bool) -> Self {
        Self {
            buttons: Vec::new(),
            config,
            interval,
            active_low,
        }
    }

    pub fn add(&mut self, button: Button, pin: P) {
        self.buttons.push(PolledButton {
            button,
            pin,
            debouncer: Debouncer::new(self.config),
            disabled: false,
        });
    }

    /// Buttons that are still being read.
    pub fn active_buttons(&self) -> usize {
        self.buttons.iter().filter(|b| !b.disabled).count()
    }

    /// Read every pin once. A read error disables that button.
    pub fn sample(&mut self, now_ms: u64) -> Vec<ButtonEvent> {
        let mut events = Vec::new();

        for polled in self.buttons.iter_mut().filter(|b| !b.disabled) {
            let level = if self.active_low {
                polled.pin.is_low()
            } else {
                polled.pin.is_high()
            };

            let pressed = match level {
                Ok(pressed) => pressed,
                Err(e) => {
                    warn!(
                        "Reading {} failed, button disabled: {:?}",
                        polled.button.pin_name(),
                        e
                    );
                    polled.disabled = true;
                    continue;
                }
            };

            if let Some(kind) = polled.debouncer.update(pressed, now_ms) {
                events.push(ButtonEvent {
                    button: polled.button,
                    kind,
                });
            }
        }

        events
    }
}

impl<P: InputPin + Send + 'static> ButtonPoller<P> {
    /// Start polling on a background task.
    pub fn spawn(mut self) -> ButtonEvents {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let now_ms = start.elapsed().as_millis() as u64;

                for event in self.sample(now_ms) {
                    match event.kind {
                        PressKind::Press => debug!("{} pressed", event.button.pin_name()),
                        PressKind::LongPress => debug!("{} long-pressed", event.button.pin_name()),
                    }
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }

                if self.active_buttons() == 0 {
                    warn!("No readable buttons left, stopping button poller");
                    return;
                }
            }
        });

        ButtonEvents { rx, task }
    }
}

/// Receiving side of a running [`ButtonPoller`]. Stops the poller on drop.
pub struct ButtonEvents {
    rx: mpsc::Receiver<ButtonEvent>,
    task: JoinHandle<()>,
}

impl ButtonEvents {
    /// Wait for the next button event.
    ///
    /// Returns `None` once the poller has stopped.
    pub async fn poll_or_wait(&mut self) -> Option<ButtonEvent> {
        self.rx.recv().await
    }

    /// Forward every event into `sink` until the poller stops or the
    /// receiving side of `sink` is dropped.
    pub async fn forward<T>(mut self, sink: mpsc::Sender<T>, wrap: impl Fn(ButtonEvent) -> T) {
        loop {
            let event = tokio::select! {
                event = self.poll_or_wait() => event,
                _ = sink.closed() => None,
            };
            let Some(event) = event else {
                break;
            };
            if sink.send(wrap(event)).await.is_err() {
                break;
            }
        }
        debug!("Button forwarding stopped");
    }
}

impl Drop for ButtonEvents {
    fn drop(&mut self) {
        self.task.abort();
    }
}
