//! Sound server abstraction.

use async_trait::async_trait;
use headset_core::AudioRouteError;

/// Operations the route controller needs from the host sound server.
///
/// `device` is always the phone's Bluetooth address (`AA:BB:CC:DD:EE:FF`);
/// implementations resolve it to their own card and node names.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioServer: Send + Sync {
    /// Switch the phone's card to the named profile.
    ///
    /// Returns [`AudioRouteError::CardNotFound`] while the card is not yet
    /// exposed by the server.
    async fn set_card_profile(&self, device: &str, profile: &str) -> Result<(), AudioRouteError>;

    /// Set the playback volume of the phone's sink, in percent.
    async fn set_sink_volume(&self, device: &str, percent: u8) -> Result<(), AudioRouteError>;

    /// Set the capture volume of the phone's source, in percent.
    async fn set_source_volume(&self, device: &str, percent: u8) -> Result<(), AudioRouteError>;

    /// Check that the server answers at all.
    async fn is_available(&self) -> bool;
}
