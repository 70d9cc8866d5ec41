//! Shared fakes for orchestrator tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headset_at::{parse_line, AtSender};
use headset_audio::{AudioRouteController, AudioServer, ProfileNames, RetryPolicy, VolumeStore};
use headset_core::{AudioRouteError, ButtonEvent, LedFrame, LinkError, OutgoingCommand};
use headset_session::{
    event_queue, AtLink, CallStateMachine, LinkId, Orchestrator, OrchestratorConfig, SessionEvent,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const PHONE: &str = "AA:BB:CC:DD:EE:FF";

/// Sound server that records what it was asked to do.
#[derive(Clone, Default)]
pub struct FakeServer {
    pub calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AudioServer for FakeServer {
    async fn set_card_profile(&self, _device: &str, profile: &str) -> Result<(), AudioRouteError> {
        self.calls.lock().unwrap().push(format!("profile {}", profile));
        Ok(())
    }

    async fn set_sink_volume(&self, _device: &str, percent: u8) -> Result<(), AudioRouteError> {
        self.calls.lock().unwrap().push(format!("sink {}", percent));
        Ok(())
    }

    async fn set_source_volume(&self, _device: &str, percent: u8) -> Result<(), AudioRouteError> {
        self.calls.lock().unwrap().push(format!("source {}", percent));
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// AT sender that records commands instead of writing them.
#[derive(Clone, Default)]
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AtSender for RecordingSender {
    async fn send(&mut self, command: &OutgoingCommand) -> Result<(), LinkError> {
        if self.fail {
            return Err(LinkError::Closed);
        }
        self.sent.lock().unwrap().push(command.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Commands sent during a complete handshake with the default volume.
pub const HANDSHAKE: [&str; 7] = [
    "AT+BRSF=52",
    "AT+CIND=?",
    "AT+CIND?",
    "AT+CMER=3,0,0,1",
    "AT+CLIP=1",
    "AT+VGS=10",
    "AT+CLCC",
];

/// Host sink volume for the default speaker level.
pub const DEFAULT_SINK: &str = "sink 67";

/// A running orchestrator with a recording link.
pub struct Harness {
    pub events: mpsc::Sender<SessionEvent>,
    pub leds: watch::Receiver<LedFrame>,
    pub audio_calls: Arc<Mutex<Vec<String>>>,
    pub store: VolumeStore,
    pub link: LinkId,
    pub sender: RecordingSender,
    task: Option<JoinHandle<CallStateMachine>>,
    _dir: TempDir,
}

impl Harness {
    /// Start an orchestrator without any link.
    pub fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = VolumeStore::new(dir.path().join("volume.json"));
        let server = FakeServer::default();
        let audio_calls = server.calls.clone();

        let retry = RetryPolicy {
            attempts: 1,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(10),
        };
        let audio = AudioRouteController::new(server, ProfileNames::default(), retry)
            .with_store(store.clone());

        let (tx, rx) = event_queue(64);
        let (led_tx, leds) = watch::channel(LedFrame::default());
        let orchestrator = Orchestrator::new(
            CallStateMachine::default(),
            audio,
            led_tx,
            rx,
            OrchestratorConfig::default(),
        );
        let task = tokio::spawn(orchestrator.run());

        Self {
            events: tx,
            leds,
            audio_calls,
            store,
            link: LinkId::next(),
            sender: RecordingSender::default(),
            task: Some(task),
            _dir: dir,
        }
    }

    /// Start an orchestrator and connect a phone through the handshake.
    pub async fn connected() -> Self {
        let mut harness = Self::start();
        harness.link_up(RecordingSender::default()).await;
        for _ in HANDSHAKE {
            harness.at("OK").await;
        }
        harness
    }

    pub async fn link_up(&mut self, sender: RecordingSender) -> LinkId {
        let id = LinkId::next();
        self.link = id;
        self.sender = sender.clone();
        self.events
            .send(SessionEvent::LinkUp(AtLink {
                id,
                device: PHONE.to_string(),
                sender: Box::new(sender),
            }))
            .await
            .unwrap();
        id
    }

    pub async fn at(&self, line: &str) {
        self.at_on(self.link, line).await;
    }

    pub async fn at_on(&self, link: LinkId, line: &str) {
        self.events
            .send(SessionEvent::At {
                link,
                message: parse_line(line),
            })
            .await
            .unwrap();
    }

    pub async fn button(&self, event: ButtonEvent) {
        self.events.send(SessionEvent::Button(event)).await.unwrap();
    }

    pub async fn lose_link(&self) {
        self.events
            .send(SessionEvent::LinkLost {
                link: self.link,
                error: LinkError::Closed,
            })
            .await
            .unwrap();
    }

    /// Wait until the published LED frame satisfies `predicate`.
    pub async fn wait_leds(&mut self, predicate: impl Fn(&LedFrame) -> bool) -> LedFrame {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let frame = *self.leds.borrow_and_update();
                if predicate(&frame) {
                    return frame;
                }
                self.leds.changed().await.unwrap();
            }
        })
        .await
        .expect("LED frame before timeout")
    }

    pub fn audio_calls(&self) -> Vec<String> {
        self.audio_calls.lock().unwrap().clone()
    }

    /// Commands sent after the handshake.
    pub fn sent_after_handshake(&self) -> Vec<String> {
        self.sender.sent().into_iter().skip(HANDSHAKE.len()).collect()
    }

    /// Shut the orchestrator down and return its final machine.
    pub async fn finish(&mut self) -> CallStateMachine {
        self.events.send(SessionEvent::Shutdown).await.unwrap();
        let task = self.task.take().expect("orchestrator running");
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("orchestrator stops")
            .unwrap()
    }
}
