//! Audio route controller.

use std::time::Duration;

use headset_core::volume::{phone_to_system, MAX_PHONE_LEVEL};
use headset_core::{AudioProfile, AudioRouteError, AudioRouteRequest};
use tracing::{debug, error, info, warn};

use crate::server::AudioServer;
use crate::store::VolumeStore;

/// Card profile names for each routing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileNames {
    pub call: String,
    pub idle: String,
}

impl ProfileNames {
    pub fn name(&self, profile: AudioProfile) -> &str {
        match profile {
            AudioProfile::CallRouting => &self.call,
            AudioProfile::Idle => &self.idle,
        }
    }
}

impl Default for ProfileNames {
    fn default() -> Self {
        Self {
            call: "headset_head_unit".to_string(),
            idle: "a2dp_sink".to_string(),
        }
    }
}

/// Bounded exponential backoff for profile switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Result of an [`AudioRouteController::apply`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed(String),
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

/// Applies routing requests and mirrors volume for the bound phone.
pub struct AudioRouteController<S> {
    server: S,
    profiles: ProfileNames,
    retry: RetryPolicy,
    store: Option<VolumeStore>,
    device: Option<String>,
    current: Option<AudioProfile>,
    speaker: Option<u8>,
}

impl<S: AudioServer> AudioRouteController<S> {
    pub fn new(server: S, profiles: ProfileNames, retry: RetryPolicy) -> Self {
        Self {
            server,
            profiles,
            retry,
            store: None,
            device: None,
            current: None,
            speaker: None,
        }
    }

    /// Persist speaker levels in `store`.
    pub fn with_store(mut self, store: VolumeStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Drive the card of `device` from now on.
    ///
    /// Returns the speaker level stored for this phone, if any.
    pub fn bind_device(&mut self, device: &str) -> Option<u8> {
        info!(device = %device, "Binding audio route to phone");
        self.device = Some(device.to_string());
        self.current = None;
        self.speaker = None;

        let store = self.store.as_ref()?;
        match store.load(device) {
            Ok(level) => level,
            Err(e) => {
                warn!("Failed to read stored volume for {}: {}", device, e);
                None
            }
        }
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Profile last applied successfully.
    pub fn current_profile(&self) -> Option<AudioProfile> {
        self.current
    }

    /// Switch the bound phone's card to the requested profile.
    ///
    /// Applying the profile that is already active does nothing.
    pub async fn apply(&mut self, request: &AudioRouteRequest) -> ApplyOutcome {
        let profile = request.profile;
        if self.current == Some(profile) {
            debug!(profile = %profile, "Audio profile already applied");
            return ApplyOutcome::Applied;
        }

        let Some(device) = self.device.clone() else {
            warn!(profile = %profile, "No phone bound, skipping audio route change");
            return ApplyOutcome::Failed(AudioRouteError::NoDevice.to_string());
        };

        let name = self.profiles.name(profile).to_string();
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            match self.server.set_card_profile(&device, &name).await {
                Ok(()) => {
                    info!(
                        profile = %profile,
                        reason = %request.reason,
                        "Audio route set to {} after {} attempt(s)",
                        name,
                        attempt
                    );
                    self.current = Some(profile);
                    return ApplyOutcome::Applied;
                }
                Err(e) if attempt < attempts => {
                    let delay = self.retry.backoff(attempt - 1);
                    debug!(
                        "Audio route attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Audio route to {} failed after {} attempts: {}", name, attempts, e);
                    self.current = None;
                    return ApplyOutcome::Failed(e.to_string());
                }
            }
        }

        ApplyOutcome::Failed(AudioRouteError::Timeout.to_string())
    }

    /// Mirror an HFP speaker gain (0-15) to the sink volume and persist it.
    pub async fn set_speaker_level(&mut self, level: u8) -> Result<(), AudioRouteError> {
        let level = level.min(MAX_PHONE_LEVEL);
        if self.speaker == Some(level) {
            return Ok(());
        }
        let device = self.device.clone().ok_or(AudioRouteError::NoDevice)?;

        self.server
            .set_sink_volume(&device, phone_to_system(level))
            .await?;
        self.speaker = Some(level);
        debug!(level, percent = phone_to_system(level), "Speaker volume mirrored");

        if let Some(store) = &self.store {
            store.save(&device, level)?;
        }
        Ok(())
    }

    /// Mirror an HFP microphone gain (0-15) to the source volume.
    pub async fn set_mic_level(&mut self, level: u8) -> Result<(), AudioRouteError> {
        let level = level.min(MAX_PHONE_LEVEL);
        let device = self.device.clone().ok_or(AudioRouteError::NoDevice)?;
        self.server
            .set_source_volume(&device, phone_to_system(level))
            .await
    }
}
