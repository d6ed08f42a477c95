//! `storectl store status`: the local store record and credential state,
//! rendered without contacting the remote service.

use store_harness_core::error::Result;
use store_harness_core::state::ConfigStorage;

use crate::config::Config;

/// Masked API key: first 8 characters followed by `...`.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Render the local store configuration and credential status.
pub fn render_status(config: &Config, storage: &dyn ConfigStorage) -> Result<String> {
    let state = storage.load()?;
    let mut out = String::new();

    let key_status = match std::env::var(&config.remote.api_key_env) {
        Ok(key) if !key.is_empty() => format!("set ({})", mask_key(&key)),
        _ => "NOT SET".to_string(),
    };
    out.push_str(&format!("{:<16} {}\n", config.remote.api_key_env, key_status));
    let default_store = match state.default_store.as_deref() {
        Some(id) => match state.display_name_of(id) {
            Some(name) => format!("{} ({})", id, name),
            None => id.to_string(),
        },
        None => "(none)".to_string(),
    };
    out.push_str(&format!("{:<16} {}\n", "default store", default_store));
    out.push_str(&format!("{:<16} {}\n", "bulk uploads", state.sample_files_count));

    if state.stores.is_empty() {
        out.push_str("\nno known stores\n");
        return Ok(out);
    }

    out.push_str(&format!(
        "\n{:<24} {:<20} {}\n",
        "DISPLAY NAME", "CREATED", "IDENTIFIER"
    ));
    for entry in state.stores.values() {
        let marker = if state.default_store.as_deref() == Some(entry.identifier.as_str()) {
            " *"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:<24} {:<20} {}{}\n",
            entry.display_name, entry.created_at, entry.identifier, marker
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_harness_core::state::MemoryConfigStorage;

    #[test]
    fn mask_keeps_eight_chars() {
        assert_eq!(mask_key("AIzaSyD-0123456789"), "AIzaSyD-...");
        assert_eq!(mask_key("abc"), "abc...");
    }

    #[test]
    fn status_marks_default_store() {
        let mut state = store_harness_core::models::StoreConfig::default();
        state.record_store("docs", "fileSearchStores/docs-1", "2025-06-01 09:30:00".into());
        let storage = MemoryConfigStorage::with_config(state);
        let mut config = Config::minimal();
        config.remote.api_key_env = "STORECTL_TEST_KEY_UNSET_A1".to_string();

        let out = render_status(&config, &storage).unwrap();
        assert!(out.contains("NOT SET"));
        assert!(out.contains("fileSearchStores/docs-1 (docs)"));
        assert!(out.contains("fileSearchStores/docs-1 *"));
        assert!(out.contains("2025-06-01 09:30:00"));
    }

    #[test]
    fn status_without_stores() {
        let mut config = Config::minimal();
        config.remote.api_key_env = "STORECTL_TEST_KEY_UNSET_A2".to_string();
        let out = render_status(&config, &MemoryConfigStorage::new()).unwrap();
        assert!(out.contains("(none)"));
        assert!(out.contains("no known stores"));
    }
}
