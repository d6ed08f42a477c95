//! Sync orchestration.
//!
//! Resolves upload candidates through the [`SelectionPolicy`], uploads them
//! one at a time through the [`StoreClient`] and aggregates the outcomes
//! into a [`SyncReport`]. Also hosts the store-level compositions built on
//! top of sync: `init` (create default store and sync the canonical path),
//! `reset` (delete the default store, then init) and removal of remote
//! documents by display name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use store_harness_core::error::{HarnessError, Result};
use store_harness_core::models::{FileError, SyncReport, UploadCandidate};

use crate::client::StoreClient;
use crate::config::{ResetConfig, SelectionConfig};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::selection::{single_file_candidate, SelectOptions, SelectionPolicy, SelectionProfile};

/// Options for a directory sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub profile: SelectionProfile,
    pub recursive: bool,
    pub relative_names: bool,
    /// Upload only the first N candidates in selection order.
    pub limit: Option<usize>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            profile: SelectionProfile::Documents,
            recursive: true,
            relative_names: false,
            limit: None,
        }
    }
}

impl SyncOptions {
    fn select_options(&self) -> SelectOptions {
        SelectOptions {
            recursive: self.recursive,
            relative_names: self.relative_names,
        }
    }
}

/// Resolve the candidates a sync of `root` would upload, `limit` applied.
pub fn plan_directory(
    selection: &SelectionConfig,
    root: &Path,
    options: &SyncOptions,
) -> Result<Vec<UploadCandidate>> {
    let policy = SelectionPolicy::from_config(selection, options.profile)?;
    let mut candidates = policy.select(root, options.select_options())?;
    if let Some(limit) = options.limit {
        candidates.truncate(limit);
    }
    Ok(candidates)
}

/// Upload every eligible file under `root` into `identifier`.
///
/// A root without eligible files yields a failed report with `total == 0`
/// and a single "no eligible files" error, distinct from a report where
/// every upload failed. Successful uploads are added to the persisted
/// bulk-upload counter.
pub fn sync_directory(
    client: &StoreClient<'_>,
    selection: &SelectionConfig,
    root: &Path,
    identifier: &str,
    options: &SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport> {
    progress.report(SyncProgressEvent::Discovering {
        root: root.display().to_string(),
    });
    let candidates = plan_directory(selection, root, options)?;

    if candidates.is_empty() {
        tracing::warn!(root = %root.display(), "no eligible files");
        return Ok(empty_selection_report(root));
    }

    let report = upload_all(client, &candidates, identifier, progress);
    if report.uploaded > 0 {
        client.record_bulk_upload(report.uploaded)?;
    }

    tracing::info!(
        root = %root.display(),
        store = %identifier,
        total = report.total,
        uploaded = report.uploaded,
        failed = report.failed,
        "sync finished"
    );
    Ok(report)
}

/// Sync a file or a directory.
///
/// A single file is uploaded as-is, even if its extension is not on the
/// profile's allow-list.
pub fn sync_path(
    client: &StoreClient<'_>,
    selection: &SelectionConfig,
    path: &Path,
    identifier: &str,
    options: &SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport> {
    if path.is_dir() {
        return sync_directory(client, selection, path, identifier, options, progress);
    }
    let candidate = single_file_candidate(path)?;
    Ok(upload_all(client, &[candidate], identifier, progress))
}

/// Upload candidates sequentially, recording each outcome.
pub fn upload_all(
    client: &StoreClient<'_>,
    candidates: &[UploadCandidate],
    identifier: &str,
    progress: &dyn SyncProgressReporter,
) -> SyncReport {
    let total = candidates.len();
    let mut report = SyncReport {
        success: true,
        total,
        ..SyncReport::default()
    };

    for (i, candidate) in candidates.iter().enumerate() {
        progress.report(SyncProgressEvent::Uploading {
            file: candidate.display_name.clone(),
            n: (i + 1) as u64,
            total: total as u64,
        });
        let outcome = client.upload_candidate(candidate, identifier);
        report.record(&outcome);
    }
    report
}

fn empty_selection_report(root: &Path) -> SyncReport {
    SyncReport {
        success: false,
        total: 0,
        uploaded: 0,
        failed: 0,
        errors: vec![FileError {
            file: root.display().to_string(),
            error: HarnessError::SelectionEmpty(root.to_path_buf()).to_string(),
        }],
    }
}

/// Count candidates per extension, for dry runs.
pub fn extension_breakdown(candidates: &[UploadCandidate]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for c in candidates {
        *counts.entry(c.extension.clone()).or_insert(0) += 1;
    }
    counts
}

/// What happened to the canonical path during `init`.
#[derive(Debug)]
pub enum CanonicalSync {
    /// No canonical path is configured.
    Skipped,
    /// The configured path does not exist.
    Missing(PathBuf),
    Synced(SyncReport),
}

#[derive(Debug)]
pub struct InitOutcome {
    pub identifier: String,
    pub canonical: CanonicalSync,
}

impl InitOutcome {
    pub fn is_success(&self) -> bool {
        match &self.canonical {
            CanonicalSync::Synced(report) => report.success,
            CanonicalSync::Skipped | CanonicalSync::Missing(_) => true,
        }
    }
}

/// Create the default store and sync the canonical document into it.
pub fn init_default_store(
    client: &StoreClient<'_>,
    selection: &SelectionConfig,
    reset: &ResetConfig,
    progress: &dyn SyncProgressReporter,
) -> Result<InitOutcome> {
    let identifier = client.create_store(&reset.display_name)?;

    let canonical = match &reset.canonical {
        None => CanonicalSync::Skipped,
        Some(path) if !path.exists() => {
            tracing::warn!(path = %path.display(), "canonical path not found, store left empty");
            CanonicalSync::Missing(path.clone())
        }
        Some(path) => CanonicalSync::Synced(sync_path(
            client,
            selection,
            path,
            &identifier,
            &SyncOptions::default(),
            progress,
        )?),
    };

    Ok(InitOutcome {
        identifier,
        canonical,
    })
}

/// Delete the current default store, then run [`init_default_store`].
///
/// Returns the deleted identifier, if any. A failed delete is logged and
/// does not stop the re-creation.
pub fn reset_default_store(
    client: &StoreClient<'_>,
    selection: &SelectionConfig,
    reset: &ResetConfig,
    progress: &dyn SyncProgressReporter,
) -> Result<(Option<String>, InitOutcome)> {
    let previous = client.load_config()?.default_store;
    let mut deleted = None;
    if let Some(id) = previous {
        match client.delete_store(&id) {
            Ok(()) => deleted = Some(id),
            Err(e) => tracing::warn!(store = %id, error = %e, "could not delete previous store"),
        }
    }
    let init = init_default_store(client, selection, reset, progress)?;
    Ok((deleted, init))
}

/// Result of removing documents by display name.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Remote document names that were deleted.
    pub removed: Vec<String>,
    /// Requested display names with no matching document.
    pub missing: Vec<String>,
}

/// Delete every remote document whose display name is in `display_names`.
pub fn remove_documents_by_name(
    client: &StoreClient<'_>,
    identifier: &str,
    display_names: &[String],
) -> Result<RemovalReport> {
    let documents = client.list_documents(identifier)?;
    let mut report = RemovalReport::default();

    for wanted in display_names {
        let matches: Vec<_> = documents
            .iter()
            .filter(|d| &d.display_name == wanted)
            .collect();
        if matches.is_empty() {
            report.missing.push(wanted.clone());
            continue;
        }
        for doc in matches {
            client.delete_document(&doc.name)?;
            report.removed.push(doc.name.clone());
        }
    }
    Ok(report)
}

/// Print a [`SyncReport`] the way `storectl sync` shows it.
pub fn print_report(report: &SyncReport) {
    println!("sync");
    println!("  total: {}", report.total);
    println!("  uploaded: {}", report.uploaded);
    println!("  failed: {}", report.failed);
    for e in &report.errors {
        println!("  error: {}: {}", e.file, e.error);
    }
    println!("{}", if report.success { "ok" } else { "failed" });
}
