//! Events consumed by the orchestrator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use headset_at::{split, AtSender};
use headset_core::{AtMessage, ButtonEvent, LinkError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::debug;

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one AT link for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// A fresh, never reused id.
    pub fn next() -> Self {
        Self(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Writing side of a newly connected link.
pub struct AtLink {
    pub id: LinkId,
    /// Phone Bluetooth address.
    pub device: String,
    pub sender: Box<dyn AtSender>,
}

impl fmt::Debug for AtLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtLink")
            .field("id", &self.id)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Everything the orchestrator reacts to, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A phone connected its AT link.
    LinkUp(AtLink),
    /// A line arrived on `link`.
    At { link: LinkId, message: AtMessage },
    /// `link` failed or closed.
    LinkLost { link: LinkId, error: LinkError },
    /// A debounced button gesture.
    Button(ButtonEvent),
    /// Stop after the events already queued.
    Shutdown,
}

/// Announce a connected stream and start forwarding its lines.
///
/// `LinkUp` is queued before any `At` event of the link. Returns `false` if
/// the orchestrator is gone.
pub async fn attach_link<S>(
    events: &mpsc::Sender<SessionEvent>,
    device: String,
    stream: S,
    send_timeout: Duration,
) -> bool
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = LinkId::next();
    let (mut reader, writer) = split(stream, send_timeout);

    let link = AtLink {
        id,
        device,
        sender: Box::new(writer),
    };
    if events.send(SessionEvent::LinkUp(link)).await.is_err() {
        return false;
    }

    let events = events.clone();
    tokio::spawn(async move {
        while let Some(item) = reader.next_message().await {
            let event = match item {
                Ok(message) => SessionEvent::At { link: id, message },
                Err(error) => SessionEvent::LinkLost { link: id, error },
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
        debug!("{} reader finished", id);
    });

    true
}
