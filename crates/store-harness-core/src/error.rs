//! Error types shared by the store harness crates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while syncing or searching.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Missing settings: no active store, no API key, an invalid pattern.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Any failure reported by the remote store boundary.
    #[error("store service error: {0}")]
    Service(String),

    /// A sync root contained no eligible files.
    #[error("no eligible files under {}", .0.display())]
    SelectionEmpty(PathBuf),

    /// A document or file requested for local work does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The caller cancelled a poll loop.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// A poll loop exceeded its configured timeout.
    #[error("operation timed out after {secs}s: {operation}")]
    TimedOut { operation: String, secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Wrap any displayable failure from the service boundary.
    pub fn service(err: impl std::fmt::Display) -> Self {
        HarnessError::Service(err.to_string())
    }
}
