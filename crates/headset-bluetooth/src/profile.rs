//! Hands-Free profile registration.
//!
//! BlueZ owns the SDP record and the RFCOMM listener. Each phone that opens
//! the Hands-Free channel arrives here as a [`ConnectRequest`], is accepted,
//! and handed to the session as a new AT link.
//!
//! [`ConnectRequest`]: bluer::rfcomm::ConnectRequest

use std::time::Duration;

use bluer::rfcomm::{Profile, ProfileHandle, Role};
use bluer::{Session, Uuid};
use futures::StreamExt;
use headset_session::{attach_link, SessionEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{BluetoothError, Result};

/// Hands-Free unit service class.
pub const HFP_HF_UUID: Uuid = Uuid::from_u128(0x0000111e_0000_1000_8000_00805f9b34fb);

/// HFP 1.8.
pub const HFP_VERSION: u16 = 0x0108;

/// SDP advertises only the low five bits of the `AT+BRSF` feature mask.
pub fn sdp_features(hf_features: u32) -> u16 {
    (hf_features & 0x1f) as u16
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HfpProfileConfig {
    pub name: String,
    pub channel: u16,
    /// Feature mask sent in `AT+BRSF`.
    pub hf_features: u32,
}

impl Default for HfpProfileConfig {
    fn default() -> Self {
        Self {
            name: "Hands-Free".to_string(),
            channel: 1,
            hf_features: headset_session::DEFAULT_HF_FEATURES,
        }
    }
}

impl HfpProfileConfig {
    /// The profile description registered with BlueZ.
    pub fn to_profile(&self) -> Profile {
        Profile {
            uuid: HFP_HF_UUID,
            name: Some(self.name.clone()),
            role: Some(Role::Client),
            channel: Some(self.channel),
            version: Some(HFP_VERSION),
            features: Some(sdp_features(self.hf_features)),
            require_authentication: Some(false),
            require_authorization: Some(false),
            ..Default::default()
        }
    }
}

/// A registered Hands-Free profile waiting for phones.
pub struct HfpListener {
    handle: ProfileHandle,
}

impl HfpListener {
    /// Register the profile on `session`.
    pub async fn register(session: &Session, config: &HfpProfileConfig) -> Result<Self> {
        let handle = session
            .register_profile(config.to_profile())
            .await
            .map_err(|e| match e.kind {
                bluer::ErrorKind::AlreadyExists => BluetoothError::ProfileInUse,
                _ => BluetoothError::BlueZ(format!("Failed to register HFP profile: {}", e)),
            })?;

        info!(
            "Hands-Free profile registered on RFCOMM channel {} (features {:#x})",
            config.channel,
            sdp_features(config.hf_features)
        );
        Ok(Self { handle })
    }

    /// Accept phones and attach each one to the session queue.
    ///
    /// Returns when the orchestrator is gone or BlueZ drops the profile.
    pub async fn run(mut self, events: mpsc::Sender<SessionEvent>, send_timeout: Duration) {
        loop {
            let request = tokio::select! {
                request = self.handle.next() => request,
                _ = events.closed() => break,
            };
            let Some(request) = request else {
                warn!("BlueZ released the Hands-Free profile");
                break;
            };

            let device = request.device().to_string();
            let stream = match request.accept() {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("{}", BluetoothError::ConnectionFailed(format!("{}: {}", device, e)));
                    continue;
                }
            };

            info!("Accepted Hands-Free connection from {}", device);
            if !attach_link(&events, device, stream, send_timeout).await {
                break;
            }
        }
        debug!("Hands-Free listener stopped");
    }
}
