//! Daemon configuration.
//!
//! Loaded from a TOML file. Every key is optional; a missing file section or
//! key falls back to the default listed here.
//!
//! ```toml
//! [bluetooth]
//! device_name = "Pi Headset"
//!
//! [gpio]
//! chip = "/dev/gpiochip0"
//! button_answer = 17
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use headset_audio::{ProfileNames, RetryPolicy};
use headset_core::{Button, ConfigError};
use headset_io::DebounceConfig;
use headset_session::{MachineConfig, OrchestratorConfig, DEFAULT_HF_FEATURES};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bluetooth: BluetoothConfig,
    pub audio: AudioConfig,
    pub gpio: GpioConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter alias shown on the phone.
    pub device_name: String,
    pub discoverable: bool,
    pub pairable: bool,
    /// RFCOMM channel of the Hands-Free profile.
    pub channel: u16,
    /// `AT+BRSF` feature mask.
    pub hf_features: u32,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_name: "Pi Headset".to_string(),
            discoverable: true,
            pairable: true,
            channel: 1,
            hf_features: DEFAULT_HF_FEATURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// `pactl` executable.
    pub pactl: String,
    pub call_profile: String,
    pub idle_profile: String,
    pub retry_attempts: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    /// Bound on one audio operation, retries included.
    pub timeout_ms: u64,
    /// Per-phone speaker level file.
    pub volume_file: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let names = ProfileNames::default();
        let retry = RetryPolicy::default();
        Self {
            pactl: "pactl".to_string(),
            call_profile: names.call,
            idle_profile: names.idle,
            retry_attempts: retry.attempts,
            retry_initial_ms: retry.initial_backoff.as_millis() as u64,
            retry_max_ms: retry.max_backoff.as_millis() as u64,
            timeout_ms: 15_000,
            volume_file: PathBuf::from("/var/lib/hfp-headset/volume.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Run without buttons and LEDs when false.
    pub enabled: bool,
    pub chip: String,
    pub button_answer: Option<u32>,
    pub button_reject: Option<u32>,
    pub button_vol_up: Option<u32>,
    pub button_vol_down: Option<u32>,
    pub led_status: Option<u32>,
    pub led_call: Option<u32>,
    /// Pressed buttons pull their line low.
    pub active_low: bool,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    pub poll_interval_ms: u64,
    pub led_tick_ms: u64,
}

impl Default for GpioConfig {
    fn default() -> Self {
        let debounce = DebounceConfig::default();
        Self {
            enabled: true,
            chip: "/dev/gpiochip0".to_string(),
            button_answer: Some(17),
            button_reject: Some(27),
            button_vol_up: Some(22),
            button_vol_down: Some(23),
            led_status: Some(24),
            led_call: Some(25),
            active_low: true,
            debounce_ms: debounce.debounce.as_millis() as u64,
            long_press_ms: debounce.long_press.as_millis() as u64,
            poll_interval_ms: 10,
            led_tick_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bound on a single AT command write.
    pub send_timeout_ms: u64,
    pub queue_capacity: usize,
    /// Long press of Answer while ringing rejects the call.
    pub long_press_rejects: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: OrchestratorConfig::default().send_timeout.as_millis() as u64,
            queue_capacity: 64,
            long_press_rejects: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Write logs here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl GpioConfig {
    /// Line wired to `button`, if any.
    pub fn button_line(&self, button: Button) -> Option<u32> {
        match button {
            Button::Answer => self.button_answer,
            Button::Reject => self.button_reject,
            Button::VolumeUp => self.button_vol_up,
            Button::VolumeDown => self.button_vol_down,
        }
    }
}

impl Config {
    /// Load `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("audio.retry_initial_ms", self.audio.retry_initial_ms),
            ("audio.timeout_ms", self.audio.timeout_ms),
            ("gpio.poll_interval_ms", self.gpio.poll_interval_ms),
            ("gpio.led_tick_ms", self.gpio.led_tick_ms),
            ("session.send_timeout_ms", self.session.send_timeout_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.audio.retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "audio.retry_attempts",
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.audio.retry_max_ms < self.audio.retry_initial_ms {
            return Err(ConfigError::Invalid {
                key: "audio.retry_max_ms",
                reason: "must not be below audio.retry_initial_ms".to_string(),
            });
        }
        if self.gpio.long_press_ms <= self.gpio.debounce_ms {
            return Err(ConfigError::Invalid {
                key: "gpio.long_press_ms",
                reason: "must exceed gpio.debounce_ms".to_string(),
            });
        }
        if self.session.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "session.queue_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.logging
            .level
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "logging.level",
                reason: format!("unknown level \"{}\"", self.logging.level),
            })
    }

    pub fn profile_names(&self) -> ProfileNames {
        ProfileNames {
            call: self.audio.call_profile.clone(),
            idle: self.audio.idle_profile.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.audio.retry_attempts,
            initial_backoff: Duration::from_millis(self.audio.retry_initial_ms),
            max_backoff: Duration::from_millis(self.audio.retry_max_ms),
        }
    }

    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig {
            debounce: Duration::from_millis(self.gpio.debounce_ms),
            long_press: Duration::from_millis(self.gpio.long_press_ms),
        }
    }

    pub fn machine(&self) -> MachineConfig {
        MachineConfig {
            hf_features: self.bluetooth.hf_features,
            long_press_rejects: self.session.long_press_rejects,
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            send_timeout: self.send_timeout(),
            audio_timeout: Duration::from_millis(self.audio.timeout_ms),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.session.send_timeout_ms)
    }
}
