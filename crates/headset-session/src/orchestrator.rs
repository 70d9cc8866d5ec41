//! The session orchestrator.
//!
//! One task owns the [`CallStateMachine`] and the audio route controller.
//! Producers (link readers, the button poller, the profile listener, signal
//! handlers) only ever push [`SessionEvent`]s into its queue.

use std::collections::VecDeque;
use std::time::Duration;

use headset_audio::{ApplyOutcome, AudioRouteController, AudioServer};
use headset_core::{
    AudioProfile, AudioRouteRequest, CallState, LedFrame, LedPattern, LinkError, OutgoingCommand,
};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::events::{AtLink, LinkId, SessionEvent};
use crate::machine::{CallStateMachine, Effect, Input};

/// Create the event queue feeding an [`Orchestrator`].
pub fn event_queue(capacity: usize) -> (mpsc::Sender<SessionEvent>, mpsc::Receiver<SessionEvent>) {
    mpsc::channel(capacity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bound on a single AT command write.
    pub send_timeout: Duration,
    /// Bound on one audio operation, retries included.
    pub audio_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(2),
            audio_timeout: Duration::from_secs(15),
        }
    }
}

/// Consumes the event queue and executes the machine's effects.
pub struct Orchestrator<S> {
    machine: CallStateMachine,
    audio: AudioRouteController<S>,
    leds: watch::Sender<LedFrame>,
    events: mpsc::Receiver<SessionEvent>,
    link: Option<AtLink>,
    call_led: LedPattern,
    config: OrchestratorConfig,
}

impl<S: AudioServer> Orchestrator<S> {
    pub fn new(
        machine: CallStateMachine,
        audio: AudioRouteController<S>,
        leds: watch::Sender<LedFrame>,
        events: mpsc::Receiver<SessionEvent>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            machine,
            audio,
            leds,
            events,
            link: None,
            call_led: LedPattern::Off,
            config,
        }
    }

    /// Process events until `Shutdown` or until every producer is gone.
    ///
    /// Returns the machine for inspection.
    pub async fn run(mut self) -> CallStateMachine {
        info!("Session orchestrator started, waiting for a phone");
        self.publish_leds();

        while let Some(event) = self.events.recv().await {
            if let SessionEvent::Shutdown = event {
                info!("Shutdown requested");
                self.events.close();
                while let Ok(event) = self.events.try_recv() {
                    self.dispatch(event).await;
                }
                break;
            }
            self.dispatch(event).await;
        }

        self.shutdown().await;
        self.machine
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LinkUp(link) => self.on_link_up(link).await,
            SessionEvent::At { link, message } => {
                if !self.is_current(link) {
                    debug!("Dropping line from stale {}: {}", link, message.raw);
                    return;
                }
                let effects = self.machine.handle(Input::Message(message));
                self.execute(effects).await;
            }
            SessionEvent::LinkLost { link, error } => {
                if !self.is_current(link) {
                    debug!("Ignoring loss of stale {}", link);
                    return;
                }
                self.on_link_lost(error).await;
            }
            SessionEvent::Button(event) => {
                let effects = self.machine.handle(Input::Button(event));
                self.execute(effects).await;
            }
            SessionEvent::Shutdown => {}
        }
    }

    fn is_current(&self, id: LinkId) -> bool {
        self.link.as_ref().is_some_and(|link| link.id == id)
    }

    async fn on_link_up(&mut self, mut link: AtLink) {
        if let Some(current) = &self.link {
            warn!(
                "Refusing {} from {}: {} from {} is still connected",
                link.id, link.device, current.id, current.device
            );
            let _ = timeout(self.config.send_timeout, link.sender.close()).await;
            return;
        }

        info!("Phone {} connected on {}", link.device, link.id);
        let stored_level = self.audio.bind_device(&link.device);
        self.link = Some(link);
        self.call_led = LedPattern::Off;
        self.publish_leds();

        let effects = self.machine.handle(Input::LinkUp { stored_level });
        self.execute(effects).await;
    }

    async fn on_link_lost(&mut self, error: LinkError) {
        if let Some(link) = self.link.take() {
            warn!("Phone {} disconnected: {}", link.device, error);
        }
        let effects = self.machine.handle(Input::LinkLost);
        self.execute(effects).await;
        info!("Waiting for the next phone connection");
    }

    /// Execute effects in order. A failed send ends the link and replaces
    /// the remaining effects with those of the link loss.
    async fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Send(command) => {
                    if let Err(error) = self.send(command).await {
                        if let Some(link) = self.link.take() {
                            warn!("Sending {} to {} failed: {}", command, link.device, error);
                        }
                        queue.clear();
                        queue.extend(self.machine.handle(Input::LinkLost));
                    }
                }
                Effect::Route(request) => self.apply_route(request).await,
                Effect::Volume(volume) => {
                    match timeout(
                        self.config.audio_timeout,
                        self.audio.set_speaker_level(volume.level()),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!("Speaker volume update failed: {}", e),
                        Err(_) => warn!("Speaker volume update timed out"),
                    }
                }
                Effect::MicGain(level) => {
                    match timeout(self.config.audio_timeout, self.audio.set_mic_level(level)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!("Microphone gain update failed: {}", e),
                        Err(_) => warn!("Microphone gain update timed out"),
                    }
                }
                Effect::Led(pattern) => {
                    self.call_led = pattern;
                    self.publish_leds();
                }
            }
        }
    }

    async fn send(&mut self, command: OutgoingCommand) -> Result<(), LinkError> {
        let Some(link) = self.link.as_mut() else {
            debug!("No link, dropping {}", command);
            return Ok(());
        };
        timeout(self.config.send_timeout, link.sender.send(&command))
            .await
            .map_err(|_| LinkError::Timeout)?
    }

    async fn apply_route(&mut self, request: AudioRouteRequest) {
        match timeout(self.config.audio_timeout, self.audio.apply(&request)).await {
            Ok(ApplyOutcome::Applied) => {}
            Ok(ApplyOutcome::Failed(reason)) => {
                warn!("Audio route {} failed, call continues: {}", request.profile, reason)
            }
            Err(_) => warn!("Audio route {} timed out, call continues", request.profile),
        }
    }

    fn publish_leds(&self) {
        let status = if self.link.is_some() {
            LedPattern::SolidOn
        } else {
            LedPattern::PulseSlow
        };
        self.leds.send_replace(LedFrame::new(status, self.call_led));
    }

    async fn shutdown(&mut self) {
        if self.machine.state() != CallState::Idle || self.audio.current_profile().is_some() {
            self.apply_route(AudioRouteRequest::new(AudioProfile::Idle, CallState::Idle))
                .await;
        }
        self.leds.send_replace(LedFrame::default());

        if let Some(mut link) = self.link.take() {
            if let Err(e) = timeout(self.config.send_timeout, link.sender.close())
                .await
                .unwrap_or(Err(LinkError::Timeout))
            {
                debug!("Closing {} failed: {}", link.id, e);
            }
        }
        info!("Session orchestrator stopped");
    }
}
