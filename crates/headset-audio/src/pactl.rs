//! PulseAudio / PipeWire-pulse backend using the `pactl` command.

use std::process::Stdio;

use async_trait::async_trait;
use headset_core::AudioRouteError;
use tokio::process::Command;
use tracing::debug;

use crate::server::AudioServer;

const SINK_PREFIXES: &[&str] = &["bluez_sink.", "bluez_output."];
const SOURCE_PREFIXES: &[&str] = &["bluez_source.", "bluez_input."];

/// Talks to the sound server through `pactl`.
#[derive(Debug, Clone)]
pub struct PactlServer {
    program: String,
}

impl PactlServer {
    pub fn new() -> Self {
        Self::with_program("pactl")
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, AudioRouteError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AudioRouteError::Unavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioRouteError::Command {
                command,
                reason: if stderr.trim().is_empty() {
                    output.status.to_string()
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn card(&self, device: &str) -> Result<String, AudioRouteError> {
        let listing = self.run(&["list", "short", "cards"]).await?;
        find_card(&listing, device).ok_or_else(|| AudioRouteError::CardNotFound(device.to_string()))
    }

    async fn node(&self, kind: &str, prefixes: &[&str], device: &str) -> Result<String, AudioRouteError> {
        let listing = self.run(&["list", "short", kind]).await?;
        find_node(&listing, prefixes, device)
            .ok_or_else(|| AudioRouteError::CardNotFound(device.to_string()))
    }
}

impl Default for PactlServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioServer for PactlServer {
    async fn set_card_profile(&self, device: &str, profile: &str) -> Result<(), AudioRouteError> {
        let card = self.card(device).await?;
        self.run(&["set-card-profile", &card, profile]).await?;
        Ok(())
    }

    async fn set_sink_volume(&self, device: &str, percent: u8) -> Result<(), AudioRouteError> {
        let sink = self.node("sinks", SINK_PREFIXES, device).await?;
        self.run(&["set-sink-volume", &sink, &format!("{}%", percent)])
            .await?;
        Ok(())
    }

    async fn set_source_volume(&self, device: &str, percent: u8) -> Result<(), AudioRouteError> {
        let source = self.node("sources", SOURCE_PREFIXES, device).await?;
        self.run(&["set-source-volume", &source, &format!("{}%", percent)])
            .await?;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.run(&["info"]).await.is_ok()
    }
}

/// `AA:BB:CC:DD:EE:FF` -> `AA_BB_CC_DD_EE_FF`
fn underscored(device: &str) -> String {
    device.replace(':', "_")
}

/// Card name for a phone, as both PulseAudio and PipeWire expose it.
pub fn card_name(device: &str) -> String {
    format!("bluez_card.{}", underscored(device))
}

/// Pick the phone's card out of `pactl list short cards`.
fn find_card(listing: &str, device: &str) -> Option<String> {
    let expected = card_name(device);
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .find(|name| name.eq_ignore_ascii_case(&expected))
        .map(str::to_string)
}

/// Pick the phone's sink or source out of `pactl list short sinks|sources`.
fn find_node(listing: &str, prefixes: &[&str], device: &str) -> Option<String> {
    let address = underscored(device).to_ascii_lowercase();
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .find(|name| {
            let lower = name.to_ascii_lowercase();
            prefixes.iter().any(|p| lower.starts_with(p)) && lower.contains(&address)
        })
        .map(str::to_string)
}
