//! Bluetooth adapter management.
//!
//! Prepares the local adapter so phones can find and pair with the headset.

use bluer::{Adapter, Session};
use tracing::{debug, info};

use crate::error::{BluetoothError, Result};

/// How the adapter should present itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSettings {
    /// Friendly name shown on the phone.
    pub alias: String,
    /// Stay visible to scanning phones, without timeout.
    pub discoverable: bool,
    /// Accept pairing requests.
    pub pairable: bool,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            alias: "Pi Headset".to_string(),
            discoverable: true,
            pairable: true,
        }
    }
}

/// Wrapper around the Bluetooth adapter for simplified management.
pub struct BluetoothAdapter {
    session: Session,
    adapter: Adapter,
}

impl BluetoothAdapter {
    /// Create a new adapter manager using the default adapter.
    pub async fn new() -> Result<Self> {
        let session = Session::new().await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to create BlueZ session: {}", e))
        })?;

        let adapter = session.default_adapter().await.map_err(|e| {
            if e.to_string().contains("No default adapter") {
                BluetoothError::AdapterNotFound
            } else {
                BluetoothError::BlueZ(format!("Failed to get adapter: {}", e))
            }
        })?;

        info!("Using Bluetooth adapter: {}", adapter.name());

        Ok(Self { session, adapter })
    }

    /// Get the adapter name (e.g., "hci0").
    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub async fn is_powered(&self) -> Result<bool> {
        self.adapter.is_powered().await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to get power state: {}", e))
        })
    }

    pub async fn set_powered(&self, powered: bool) -> Result<()> {
        self.adapter.set_powered(powered).await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to set power state: {}", e))
        })?;

        if powered {
            info!("Bluetooth adapter powered on");
        } else {
            info!("Bluetooth adapter powered off");
        }

        Ok(())
    }

    /// Set the adapter's alias (friendly name).
    pub async fn set_alias(&self, alias: &str) -> Result<()> {
        self.adapter.set_alias(alias.to_string()).await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to set adapter alias: {}", e))
        })?;
        info!("Set adapter alias to: {}", alias);
        Ok(())
    }

    /// Set whether the adapter is discoverable, with no timeout.
    pub async fn set_discoverable(&self, discoverable: bool) -> Result<()> {
        if discoverable {
            self.adapter
                .set_discoverable_timeout(0)
                .await
                .map_err(|e| {
                    BluetoothError::BlueZ(format!("Failed to set discoverable timeout: {}", e))
                })?;
        }
        self.adapter.set_discoverable(discoverable).await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to set discoverable state: {}", e))
        })?;

        debug!(discoverable, "Updated discoverable state");
        Ok(())
    }

    /// Set whether the adapter accepts pairing requests.
    pub async fn set_pairable(&self, pairable: bool) -> Result<()> {
        self.adapter.set_pairable(pairable).await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to set pairable state: {}", e))
        })?;

        debug!(pairable, "Updated pairable state");
        Ok(())
    }

    /// Get the adapter's Bluetooth address.
    pub async fn address(&self) -> Result<String> {
        let addr = self.adapter.address().await.map_err(|e| {
            BluetoothError::BlueZ(format!("Failed to get adapter address: {}", e))
        })?;
        Ok(addr.to_string())
    }

    /// Make the adapter ready for phones to connect.
    pub async fn prepare(&self, settings: &AdapterSettings) -> Result<()> {
        if !self.is_powered().await? {
            self.set_powered(true).await?;
        }

        self.set_alias(&settings.alias).await?;
        self.set_discoverable(settings.discoverable).await?;
        self.set_pairable(settings.pairable).await?;

        info!(
            "Adapter {} ({}) is ready as \"{}\"",
            self.name(),
            self.address().await?,
            settings.alias
        );
        Ok(())
    }

    /// Get a reference to the underlying bluer session.
    pub fn session(&self) -> &Session {
        &self.session
    }
}
