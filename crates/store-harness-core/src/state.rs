//! Store configuration state: merge policy and the storage port.
//!
//! The [`StoreConfig`] record is always read fully, mutated in memory and
//! written back fully. There is no locking; concurrent writers race and the
//! last write wins.

use std::sync::RwLock;

use crate::error::Result;
use crate::models::{StoreConfig, StoreEntry};

/// Timestamp format used for `created_at`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persistence port for [`StoreConfig`].
pub trait ConfigStorage: Send + Sync {
    /// Load the persisted record. Absence of prior state yields an empty record.
    fn load(&self) -> Result<StoreConfig>;

    /// Overwrite the persisted record.
    fn save(&self, config: &StoreConfig) -> Result<()>;
}

impl StoreConfig {
    /// Insert or overwrite the entry keyed by `display_name` and make it the
    /// default store.
    pub fn record_store(&mut self, display_name: &str, identifier: &str, created_at: String) {
        self.stores.insert(
            display_name.to_string(),
            StoreEntry {
                identifier: identifier.to_string(),
                display_name: display_name.to_string(),
                created_at,
            },
        );
        self.default_store = Some(identifier.to_string());
    }

    /// Remove every entry with this identifier. Clears `default_store` when it
    /// pointed at the removed store; no other store is promoted.
    ///
    /// Returns the number of entries removed.
    pub fn forget_store(&mut self, identifier: &str) -> usize {
        let before = self.stores.len();
        self.stores.retain(|_, entry| entry.identifier != identifier);
        if self.default_store.as_deref() == Some(identifier) {
            self.default_store = None;
        }
        before - self.stores.len()
    }

    /// Display name recorded for an identifier, if any.
    pub fn display_name_of(&self, identifier: &str) -> Option<&str> {
        self.stores
            .values()
            .find(|e| e.identifier == identifier)
            .map(|e| e.display_name.as_str())
    }
}

/// Current local time formatted as [`CREATED_AT_FORMAT`].
pub fn now_created_at() -> String {
    chrono::Local::now().format(CREATED_AT_FORMAT).to_string()
}

/// In-memory [`ConfigStorage`] for tests.
#[derive(Default)]
pub struct MemoryConfigStorage {
    inner: RwLock<Option<StoreConfig>>,
}

impl MemoryConfigStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: RwLock::new(Some(config)),
        }
    }

    /// Whether anything has been saved yet.
    pub fn is_persisted(&self) -> bool {
        self.inner.read().unwrap().is_some()
    }
}

impl ConfigStorage for MemoryConfigStorage {
    fn load(&self) -> Result<StoreConfig> {
        Ok(self.inner.read().unwrap().clone().unwrap_or_default())
    }

    fn save(&self, config: &StoreConfig) -> Result<()> {
        *self.inner.write().unwrap() = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> String {
        "2025-03-01 10:00:00".to_string()
    }

    #[test]
    fn record_store_sets_default_and_overwrites_by_display_name() {
        let mut cfg = StoreConfig::default();
        cfg.record_store("docs", "fileSearchStores/one", ts());
        cfg.record_store("docs", "fileSearchStores/two", ts());

        assert_eq!(cfg.stores.len(), 1);
        assert_eq!(cfg.stores["docs"].identifier, "fileSearchStores/two");
        assert_eq!(cfg.default_store.as_deref(), Some("fileSearchStores/two"));
    }

    #[test]
    fn forgetting_default_store_clears_it_without_promotion() {
        let mut cfg = StoreConfig::default();
        cfg.record_store("old", "fileSearchStores/old", ts());
        cfg.record_store("docs", "fileSearchStores/docs", ts());

        let removed = cfg.forget_store("fileSearchStores/docs");

        assert_eq!(removed, 1);
        assert!(cfg.default_store.is_none());
        assert!(cfg
            .stores
            .values()
            .all(|e| e.identifier != "fileSearchStores/docs"));
        assert!(cfg.stores.contains_key("old"));
    }

    #[test]
    fn forgetting_removes_every_alias_of_identifier() {
        let mut cfg = StoreConfig::default();
        cfg.record_store("a", "fileSearchStores/x", ts());
        cfg.record_store("b", "fileSearchStores/x", ts());
        cfg.record_store("c", "fileSearchStores/y", ts());

        assert_eq!(cfg.forget_store("fileSearchStores/x"), 2);
        assert_eq!(cfg.default_store.as_deref(), Some("fileSearchStores/y"));
    }

    #[test]
    fn forgetting_non_default_keeps_default() {
        let mut cfg = StoreConfig::default();
        cfg.record_store("a", "fileSearchStores/a", ts());
        cfg.record_store("b", "fileSearchStores/b", ts());
        cfg.forget_store("fileSearchStores/a");
        assert_eq!(cfg.default_store.as_deref(), Some("fileSearchStores/b"));
    }

    #[test]
    fn memory_storage_load_before_save_is_empty() {
        let storage = MemoryConfigStorage::new();
        assert_eq!(storage.load().unwrap(), StoreConfig::default());
        assert!(!storage.is_persisted());
    }

    #[test]
    fn save_of_load_is_a_no_op() {
        let mut cfg = StoreConfig::default();
        cfg.record_store("docs", "fileSearchStores/docs", ts());
        cfg.sample_files_count = 3;
        let storage = MemoryConfigStorage::with_config(cfg.clone());

        let loaded = storage.load().unwrap();
        storage.save(&loaded).unwrap();
        assert_eq!(storage.load().unwrap(), cfg);
    }

    #[test]
    fn created_at_has_expected_shape() {
        let stamp = now_created_at();
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, CREATED_AT_FORMAT).is_ok());
    }
}
