//! JSON file persistence for the store configuration record.

use std::path::{Path, PathBuf};

use store_harness_core::error::Result;
use store_harness_core::models::StoreConfig;
use store_harness_core::state::ConfigStorage;

/// [`ConfigStorage`] backed by a pretty-printed JSON file.
///
/// A missing file loads as an empty record. Saving creates the parent
/// directory and overwrites the whole file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for JsonFileStorage {
    fn load(&self) -> Result<StoreConfig> {
        if !self.path.exists() {
            return Ok(StoreConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(StoreConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, config: &StoreConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "saved store config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty_record() {
        let tmp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(tmp.path().join("store_config.json"));
        assert_eq!(storage.load().unwrap(), StoreConfig::default());
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/config/store_config.json");
        let storage = JsonFileStorage::new(&path);
        storage.save(&StoreConfig::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_of_load_leaves_record_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store_config.json");
        std::fs::write(
            &path,
            r#"{
  "default_store": "fileSearchStores/docs-1",
  "stores": {
    "docs": {
      "name": "fileSearchStores/docs-1",
      "display_name": "docs",
      "created_at": "2025-06-01 09:30:00"
    }
  },
  "sample_files_count": 12
}"#,
        )
        .unwrap();
        let storage = JsonFileStorage::new(&path);

        let before = storage.load().unwrap();
        storage.save(&before).unwrap();
        let after = storage.load().unwrap();

        assert_eq!(before, after);
        assert_eq!(after.sample_files_count, 12);
        assert_eq!(after.stores["docs"].created_at, "2025-06-01 09:30:00");
    }

    #[test]
    fn null_default_store_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store_config.json");
        std::fs::write(&path, r#"{"default_store": null, "stores": {}}"#).unwrap();
        let storage = JsonFileStorage::new(&path);
        let cfg = storage.load().unwrap();
        assert!(cfg.default_store.is_none());
        storage.save(&cfg).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["default_store"].is_null());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store_config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileStorage::new(&path).load().is_err());
    }
}
