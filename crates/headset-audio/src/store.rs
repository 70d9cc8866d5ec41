//! Per-phone speaker level persistence.
//!
//! File format: a JSON object mapping device address to HFP gain step,
//! e.g. `{"AA:BB:CC:DD:EE:FF": 9}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use headset_core::volume::MAX_PHONE_LEVEL;
use headset_core::StoreError;

type Levels = BTreeMap<String, u8>;

/// Speaker levels keyed by phone address.
#[derive(Debug, Clone)]
pub struct VolumeStore {
    path: PathBuf,
}

impl VolumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored level for a device, if any. A missing file means no levels.
    pub fn load(&self, device: &str) -> Result<Option<u8>, StoreError> {
        Ok(self
            .read_all()?
            .get(device)
            .map(|level| (*level).min(MAX_PHONE_LEVEL)))
    }

    /// Store a level, replacing the file atomically.
    pub fn save(&self, device: &str, level: u8) -> Result<(), StoreError> {
        let mut levels = self.read_all()?;
        levels.insert(device.to_string(), level.min(MAX_PHONE_LEVEL));

        let data = serde_json::to_string_pretty(&levels)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Levels, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Levels::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&data).map_err(|e| StoreError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = VolumeStore::new(dir.path().join("volume.json"));

        store.save("AA:BB:CC:DD:EE:FF", 9).unwrap();
        store.save("11:22:33:44:55:66", 3).unwrap();

        assert_eq!(store.load("AA:BB:CC:DD:EE:FF").unwrap(), Some(9));
        assert_eq!(store.load("11:22:33:44:55:66").unwrap(), Some(3));
    }

    #[test]
    fn missing_file_has_no_levels() {
        let dir = tempdir().unwrap();
        let store = VolumeStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load("AA:BB:CC:DD:EE:FF").unwrap(), None);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = VolumeStore::new(dir.path().join("state").join("volume.json"));
        store.save("AA:BB:CC:DD:EE:FF", 15).unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn overwrites_previous_level() {
        let dir = tempdir().unwrap();
        let store = VolumeStore::new(dir.path().join("volume.json"));
        store.save("AA:BB:CC:DD:EE:FF", 4).unwrap();
        store.save("AA:BB:CC:DD:EE:FF", 12).unwrap();
        assert_eq!(store.load("AA:BB:CC:DD:EE:FF").unwrap(), Some(12));
    }

    #[test]
    fn corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("volume.json");
        std::fs::write(&path, "not json").unwrap();

        let store = VolumeStore::new(path);
        assert!(matches!(
            store.load("AA:BB:CC:DD:EE:FF"),
            Err(StoreError::Encoding(_))
        ));
    }

    #[test]
    fn out_of_range_levels_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("volume.json");
        std::fs::write(&path, r#"{"AA:BB:CC:DD:EE:FF": 40}"#).unwrap();

        let store = VolumeStore::new(path);
        assert_eq!(store.load("AA:BB:CC:DD:EE:FF").unwrap(), Some(15));
    }
}
