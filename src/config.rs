//! TOML application configuration.
//!
//! Every section is optional; a missing config file falls back to
//! [`Config::minimal`]. See `config/storectl.example.toml` for all keys.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use store_harness_core::search::DEFAULT_MAX_SECTIONS;

use crate::selection::SelectionProfile;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./config/store_config.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on one upload's poll loop. Absent means wait until done.
    #[serde(default)]
    pub upload_timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            poll_interval_ms: default_poll_interval_ms(),
            upload_timeout_secs: None,
        }
    }
}

impl RemoteConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_secs.map(Duration::from_secs)
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_model() -> String {
    "gemini-flash-latest".to_string()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,
    #[serde(default = "default_samples")]
    pub samples: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: default_exclude_dirs(),
            documents: default_documents(),
            samples: default_samples(),
        }
    }
}

impl SelectionConfig {
    /// Extension allow-list for a profile.
    pub fn extensions(&self, profile: SelectionProfile) -> &[String] {
        match profile {
            SelectionProfile::Documents => &self.documents,
            SelectionProfile::Samples => &self.samples,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_exclude_dirs() -> Vec<String> {
    strings(&[
        "bin",
        "obj",
        ".vs",
        ".git",
        "Debug",
        "Release",
        "packages",
        "node_modules",
    ])
}
fn default_documents() -> Vec<String> {
    strings(&["txt", "md", "html", "htm", "pdf", "doc", "docx"])
}
fn default_samples() -> Vec<String> {
    strings(&["cs", "xaml", "csproj", "manifest", "config", "md"])
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Default document for `storectl search`.
    #[serde(default)]
    pub document: Option<PathBuf>,
    #[serde(default = "default_radius")]
    pub radius: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            document: None,
            radius: default_radius(),
            max_chars: default_max_chars(),
            max_sections: default_max_sections(),
        }
    }
}

fn default_radius() -> usize {
    50
}
fn default_max_chars() -> usize {
    10_000
}
fn default_max_sections() -> usize {
    DEFAULT_MAX_SECTIONS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResetConfig {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Document or directory re-synced after `store init` / `store reset`.
    #[serde(default)]
    pub canonical: Option<PathBuf>,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            canonical: None,
        }
    }
}

fn default_display_name() -> String {
    "hmeg-api-docs".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise return [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.poll_interval_ms == 0 {
        anyhow::bail!("remote.poll_interval_ms must be > 0");
    }

    if config.search.max_sections == 0 {
        anyhow::bail!("search.max_sections must be >= 1");
    }

    if config.search.max_chars == 0 {
        anyhow::bail!("search.max_chars must be >= 1");
    }

    if config.selection.documents.is_empty() || config.selection.samples.is_empty() {
        anyhow::bail!("selection extension lists must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("storectl.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.remote.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(cfg.remote.poll_interval(), Duration::from_secs(1));
        assert!(cfg.remote.upload_timeout().is_none());
        assert_eq!(cfg.search.max_sections, 5);
        assert!(cfg.selection.exclude_dirs.contains(&"Debug".to_string()));
    }

    #[test]
    fn sections_override_defaults() {
        let (_tmp, path) = write_config(
            r#"
[remote]
poll_interval_ms = 250
upload_timeout_secs = 30

[search]
radius = 3

[reset]
display_name = "team-docs"
canonical = "./data/guide.md"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.remote.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.remote.upload_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.search.radius, 3);
        assert_eq!(cfg.reset.display_name, "team-docs");
        assert_eq!(
            cfg.reset.canonical.as_deref(),
            Some(Path::new("./data/guide.md"))
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let (_tmp, path) = write_config("[remote]\npoll_interval_ms = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let (_tmp, path) = write_config("[selection]\nsamples = []\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.reset.display_name, "hmeg-api-docs");
    }
}
