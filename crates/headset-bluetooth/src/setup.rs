//! System setup verification for the hands-free headset.
//!
//! Checks that BlueZ and the PulseAudio-compatible sound server are
//! installed and running.

use std::process::Command;

/// Status of a system component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Component is installed and running.
    Ok,
    /// Component is installed but not running.
    NotRunning,
    /// Component is not installed.
    NotInstalled,
    /// Unable to determine status.
    Unknown,
}

/// A single setup issue with suggested fix.
#[derive(Debug, Clone)]
pub struct SetupIssue {
    pub description: String,
    /// Suggested command to fix the issue.
    pub fix_command: Option<String>,
}

/// Overall system setup status.
#[derive(Debug, Clone)]
pub struct SetupStatus {
    /// BlueZ daemon status.
    pub bluez: ComponentStatus,
    /// Sound server status, as seen through `pactl`.
    pub audio_server: ComponentStatus,
    pub issues: Vec<SetupIssue>,
    /// Whether the system can run the headset.
    pub ready: bool,
}

impl SetupStatus {
    /// Build the status and its fix hints from component states.
    pub fn from_components(bluez: ComponentStatus, audio_server: ComponentStatus) -> Self {
        let mut issues = Vec::new();

        if bluez != ComponentStatus::Ok {
            issues.push(SetupIssue {
                description: match bluez {
                    ComponentStatus::NotInstalled => "BlueZ is not installed".to_string(),
                    ComponentStatus::NotRunning => "Bluetooth service is not running".to_string(),
                    _ => "BlueZ status unknown".to_string(),
                },
                fix_command: Some(match bluez {
                    ComponentStatus::NotInstalled => "sudo apt install bluez".to_string(),
                    ComponentStatus::NotRunning => "sudo systemctl start bluetooth".to_string(),
                    _ => "sudo systemctl status bluetooth".to_string(),
                }),
            });
        }

        if audio_server != ComponentStatus::Ok {
            issues.push(SetupIssue {
                description: match audio_server {
                    ComponentStatus::NotInstalled => "pactl is not installed".to_string(),
                    ComponentStatus::NotRunning => "Sound server is not running".to_string(),
                    _ => "Sound server status unknown".to_string(),
                },
                fix_command: Some(match audio_server {
                    ComponentStatus::NotInstalled => {
                        "sudo apt install pulseaudio-utils pulseaudio-module-bluetooth".to_string()
                    }
                    ComponentStatus::NotRunning => "pulseaudio --start".to_string(),
                    _ => "pactl info".to_string(),
                }),
            });
        }

        let ready = bluez == ComponentStatus::Ok && audio_server == ComponentStatus::Ok;

        Self {
            bluez,
            audio_server,
            issues,
            ready,
        }
    }

    /// Get a summary message for the status.
    pub fn summary(&self) -> String {
        if self.ready {
            "System is ready for hands-free calls".to_string()
        } else {
            format!("{} issue(s) found", self.issues.len())
        }
    }
}

/// System setup verification.
pub struct SystemSetup;

impl SystemSetup {
    /// Check system setup status.
    pub fn check() -> SetupStatus {
        SetupStatus::from_components(Self::check_bluez(), Self::check_audio_server())
    }

    fn check_bluez() -> ComponentStatus {
        if !Self::installed("bluetoothctl") {
            return ComponentStatus::NotInstalled;
        }

        let running = Command::new("systemctl")
            .args(["is-active", "--quiet", "bluetooth"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if running {
            ComponentStatus::Ok
        } else {
            ComponentStatus::NotRunning
        }
    }

    fn check_audio_server() -> ComponentStatus {
        if !Self::installed("pactl") {
            return ComponentStatus::NotInstalled;
        }

        // `pactl info` fails when no server answers
        match Command::new("pactl").arg("info").output() {
            Ok(output) if output.status.success() => ComponentStatus::Ok,
            Ok(_) => ComponentStatus::NotRunning,
            Err(_) => ComponentStatus::Unknown,
        }
    }

    fn installed(program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
