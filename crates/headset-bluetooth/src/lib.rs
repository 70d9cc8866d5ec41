//! # headset-bluetooth
//!
//! The Bluetooth side of the hands-free headset.
//!
//! - Adapter preparation: power, friendly name, discoverable and pairable
//! - Hands-Free (HF role) profile registration with BlueZ
//! - Accepted RFCOMM connections handed to the session as AT links
//! - System setup verification for required components
//!
//! ## Requirements
//!
//! This crate is Linux-only and requires:
//! - BlueZ daemon (bluetooth service)
//! - A PulseAudio-compatible sound server reachable through `pactl`
//!
//! ## Example
//!
//! ```ignore
//! use headset_bluetooth::{AdapterSettings, BluetoothAdapter, HfpListener, HfpProfileConfig, SystemSetup};
//!
//! async fn example(events: tokio::sync::mpsc::Sender<headset_session::SessionEvent>)
//!     -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let status = SystemSetup::check();
//!     if !status.ready {
//!         eprintln!("System not ready: {}", status.summary());
//!         for issue in &status.issues {
//!             eprintln!("  - {}", issue.description);
//!             if let Some(cmd) = &issue.fix_command {
//!                 eprintln!("    Fix: {}", cmd);
//!             }
//!         }
//!         return Ok(());
//!     }
//!
//!     let adapter = BluetoothAdapter::new().await?;
//!     adapter.prepare(&AdapterSettings::default()).await?;
//!
//!     let listener = HfpListener::register(adapter.session(), &HfpProfileConfig::default()).await?;
//!     listener.run(events, std::time::Duration::from_secs(2)).await;
//!     Ok(())
//! }
//! ```

#![cfg(target_os = "linux")]

pub mod adapter;
pub mod error;
pub mod profile;
pub mod setup;

pub use adapter::{AdapterSettings, BluetoothAdapter};
pub use error::{BluetoothError, Result};
pub use profile::{sdp_features, HfpListener, HfpProfileConfig, HFP_HF_UUID, HFP_VERSION};
pub use setup::{ComponentStatus, SetupIssue, SetupStatus, SystemSetup};
