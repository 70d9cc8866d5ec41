//! Phone (HFP gain 0-15) and system (percent 0-100) volume scales.

/// Highest HFP gain step.
pub const MAX_PHONE_LEVEL: u8 = 15;

/// Highest system volume percentage.
pub const MAX_SYSTEM_LEVEL: u8 = 100;

/// Map an HFP gain step to a system volume percentage.
///
/// `round(level * 100 / 15)`; levels above 15 are clamped first.
pub fn phone_to_system(level: u8) -> u8 {
    let level = level.min(MAX_PHONE_LEVEL) as f32;
    (level * MAX_SYSTEM_LEVEL as f32 / MAX_PHONE_LEVEL as f32).round() as u8
}

/// Map a system volume percentage to the nearest HFP gain step.
pub fn system_to_phone(percent: u8) -> u8 {
    let percent = percent.min(MAX_SYSTEM_LEVEL) as f32;
    (percent * MAX_PHONE_LEVEL as f32 / MAX_SYSTEM_LEVEL as f32).round() as u8
}

/// Speaker volume as seen by both the phone and the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeState {
    level: u8,
    mirrored: u8,
}

impl VolumeState {
    /// Build from an HFP gain step, clamping to 0-15.
    pub fn from_phone(level: u8) -> Self {
        let level = level.min(MAX_PHONE_LEVEL);
        Self {
            level,
            mirrored: phone_to_system(level),
        }
    }

    /// Build from a system percentage, snapping to the nearest phone step.
    pub fn from_system(percent: u8) -> Self {
        Self::from_phone(system_to_phone(percent))
    }

    /// HFP gain step (0-15).
    pub fn level(&self) -> u8 {
        self.level
    }

    /// System volume percentage (0-100).
    pub fn mirrored(&self) -> u8 {
        self.mirrored
    }

    /// One step louder, saturating at 15.
    pub fn step_up(&self) -> Self {
        Self::from_phone(self.level.saturating_add(1))
    }

    /// One step quieter, saturating at 0.
    pub fn step_down(&self) -> Self {
        Self::from_phone(self.level.saturating_sub(1))
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::from_phone(10)
    }
}
