//! Core data models used throughout Store Harness.
//!
//! These types describe the persisted store configuration, the files chosen
//! for upload, the observable state of remote upload operations, and the
//! transient context sections produced by local keyword retrieval.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Persisted record describing the active remote store and all known stores.
///
/// Serialized as the JSON object documented in `store_config.json`:
/// `default_store`, `stores` (keyed by display name) and `sample_files_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Identifier of the currently active remote store.
    #[serde(default)]
    pub default_store: Option<String>,
    /// Known stores keyed by display name.
    #[serde(default)]
    pub stores: BTreeMap<String, StoreEntry>,
    /// Running total of files uploaded by bulk directory syncs.
    #[serde(default)]
    pub sample_files_count: u64,
}

/// A single known store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Opaque identifier assigned by the remote service.
    #[serde(rename = "name")]
    pub identifier: String,
    pub display_name: String,
    /// Local creation time, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
}

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub path: PathBuf,
    /// Lowercased extension without the leading dot.
    pub extension: String,
    /// Name shown in the remote store. Defaults to the file name.
    pub display_name: String,
}

impl UploadCandidate {
    /// MIME type sent alongside the file bytes.
    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.extension)
    }
}

/// Map a lowercased extension to the MIME type the remote store accepts.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "xaml" | "csproj" | "manifest" | "config" => "application/xml",
        _ => "text/plain",
    }
}

/// Result of uploading one file. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn ok(file: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            success: true,
            file: file.into(),
            display_name: Some(display_name.into()),
            error: None,
        }
    }

    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            file: file.into(),
            display_name: None,
            error: Some(error.into()),
        }
    }
}

/// A failed file inside a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

/// Aggregate outcome of a directory sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub errors: Vec<FileError>,
}

impl SyncReport {
    /// Record one upload outcome and refresh `success`.
    pub fn record(&mut self, outcome: &UploadOutcome) {
        if outcome.success {
            self.uploaded += 1;
        } else {
            self.failed += 1;
            self.errors.push(FileError {
                file: outcome.file.clone(),
                error: outcome.error.clone().unwrap_or_default(),
            });
        }
        self.success = self.failed == 0;
    }
}

/// Handle to a long-running remote upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

/// Observable state of a remote upload operation.
///
/// `PENDING` is `done == false`; `DONE` carries an optional error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    pub done: bool,
    pub error: Option<String>,
}

impl OperationStatus {
    pub fn pending() -> Self {
        Self {
            done: false,
            error: None,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            done: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(error.into()),
        }
    }
}

/// A store as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStoreInfo {
    pub identifier: String,
    pub display_name: String,
}

/// A document held inside a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteDocument {
    /// Fully qualified document name (`<store>/documents/<id>`).
    pub name: String,
    pub display_name: String,
    pub size_bytes: u64,
    pub state: String,
}

/// One grounding source attached to a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub source: String,
    pub content: String,
}

/// Per-call overrides for answer generation. `None` keeps the adapter's
/// configured default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// Text produced by the answer model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// A block of document lines surrounding a keyword hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSection {
    /// 1-based line number of the first keyword hit in the section.
    pub anchor_line: usize,
    /// 1-based line number of the first line in the window.
    pub start_line: usize,
    /// The window lines, in document order.
    pub lines: Vec<String>,
}

impl ContextSection {
    /// Window text, lines joined with `\n`.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    /// 1-based line number of the last line in the window.
    pub fn end_line(&self) -> usize {
        self.start_line + self.lines.len().saturating_sub(1)
    }
}
