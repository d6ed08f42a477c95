//! Store lifecycle client.
//!
//! Wraps a [`RemoteStore`] with the bookkeeping every mutating operation
//! needs: store creation and deletion keep the persisted [`StoreConfig`]
//! in step, and uploads run the submit-then-poll protocol.
//!
//! Upload failures never escape as `Err`: [`StoreClient::upload`] returns an
//! [`UploadOutcome`] so bulk callers can continue with the next file. Local
//! config is only touched after the remote call succeeded.
//!
//! [`StoreConfig`]: store_harness_core::models::StoreConfig

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use store_harness_core::error::{HarnessError, Result};
use store_harness_core::models::{
    mime_for_extension, OperationHandle, RemoteDocument, RemoteStoreInfo, StoreConfig,
    UploadCandidate, UploadOutcome,
};
use store_harness_core::state::{now_created_at, ConfigStorage};
use store_harness_core::store::RemoteStore;

use crate::config::RemoteConfig;

/// Caller-owned cancellation flag, checked once per poll iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an upload waits for its remote operation.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Fixed sleep between status checks.
    pub interval: Duration,
    /// Give up after this long. `None` waits until the service reports done.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: None,
            cancel: None,
        }
    }
}

impl PollOptions {
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.upload_timeout(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Store lifecycle operations over a [`RemoteStore`], keeping the local
/// [`ConfigStorage`] record in step with the remote side.
///
/// Remote calls run first; the local record is only written after they
/// succeed. Uploads never fail the caller and report an [`UploadOutcome`].
pub struct StoreClient<'a> {
    remote: &'a dyn RemoteStore,
    storage: &'a dyn ConfigStorage,
    poll: PollOptions,
}

impl<'a> StoreClient<'a> {
    pub fn new(
        remote: &'a dyn RemoteStore,
        storage: &'a dyn ConfigStorage,
        poll: PollOptions,
    ) -> Self {
        Self {
            remote,
            storage,
            poll,
        }
    }

    pub fn load_config(&self) -> Result<StoreConfig> {
        self.storage.load()
    }

    /// The explicit store, or the configured default.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Configuration`] when neither is available.
    pub fn resolve_store(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(id) = explicit {
            return Ok(id.to_string());
        }
        self.storage.load()?.default_store.ok_or_else(|| {
            HarnessError::Configuration(
                "no store configured; pass --store or run `storectl store create` first"
                    .to_string(),
            )
        })
    }

    /// Create a store, record it under its display name and make it the default.
    pub fn create_store(&self, display_name: &str) -> Result<String> {
        let identifier = self.remote.create(display_name)?;

        let mut config = self.storage.load()?;
        config.record_store(display_name, &identifier, now_created_at());
        self.storage.save(&config)?;

        tracing::info!(store = %identifier, display_name, "created store");
        Ok(identifier)
    }

    pub fn list_stores(&self) -> Result<Vec<RemoteStoreInfo>> {
        self.remote.list()
    }

    /// Delete a store remotely, then forget it locally.
    ///
    /// A remote failure is returned as-is and leaves the local config untouched.
    pub fn delete_store(&self, identifier: &str) -> Result<()> {
        self.remote.delete(identifier)?;

        let mut config = self.storage.load()?;
        let removed = config.forget_store(identifier);
        self.storage.save(&config)?;

        tracing::info!(store = %identifier, removed, "deleted store");
        Ok(())
    }

    pub fn list_documents(&self, identifier: &str) -> Result<Vec<RemoteDocument>> {
        self.remote.list_documents(identifier)
    }

    pub fn delete_document(&self, document_name: &str) -> Result<()> {
        self.remote.delete_document(document_name)?;
        tracing::info!(document = %document_name, "deleted document");
        Ok(())
    }

    /// Add `uploaded` to the persisted bulk-upload counter.
    pub fn record_bulk_upload(&self, uploaded: usize) -> Result<u64> {
        let mut config = self.storage.load()?;
        config.sample_files_count += uploaded as u64;
        self.storage.save(&config)?;
        Ok(config.sample_files_count)
    }

    /// Upload one file and wait for the remote operation to finish.
    ///
    /// `display_name` defaults to the file name.
    pub fn upload(
        &self,
        path: &Path,
        identifier: &str,
        display_name: Option<&str>,
    ) -> UploadOutcome {
        let display_name = display_name.map(str::to_string).unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file = path.display().to_string();

        match self.upload_and_wait(path, identifier, &display_name, mime_for_extension(&extension))
        {
            Ok(()) => {
                tracing::info!(file = %file, store = %identifier, "uploaded");
                UploadOutcome::ok(file, display_name)
            }
            Err(e) => {
                tracing::warn!(file = %file, store = %identifier, error = %e, "upload failed");
                UploadOutcome::failed(file, e.to_string())
            }
        }
    }

    pub fn upload_candidate(&self, candidate: &UploadCandidate, identifier: &str) -> UploadOutcome {
        self.upload(&candidate.path, identifier, Some(&candidate.display_name))
    }

    fn upload_and_wait(
        &self,
        path: &Path,
        identifier: &str,
        display_name: &str,
        mime_type: &str,
    ) -> Result<()> {
        let handle = self
            .remote
            .upload_to_store(path, identifier, display_name, mime_type)?;
        self.wait(&handle)
    }

    /// Poll until the operation reports done, the timeout passes, or the
    /// cancel token fires.
    fn wait(&self, handle: &OperationHandle) -> Result<()> {
        let started = Instant::now();
        loop {
            if let Some(cancel) = &self.poll.cancel {
                if cancel.is_cancelled() {
                    return Err(HarnessError::Cancelled(handle.name.clone()));
                }
            }
            if let Some(timeout) = self.poll.timeout {
                if started.elapsed() >= timeout {
                    return Err(HarnessError::TimedOut {
                        operation: handle.name.clone(),
                        secs: timeout.as_secs(),
                    });
                }
            }

            std::thread::sleep(self.poll.interval);

            let status = self.remote.operation_status(handle)?;
            if status.done {
                return match status.error {
                    Some(err) => Err(HarnessError::Service(err)),
                    None => Ok(()),
                };
            }
            tracing::trace!(operation = %handle.name, "operation pending");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_harness_core::state::MemoryConfigStorage;
    use store_harness_core::store::memory::InMemoryRemoteStore;
    use tempfile::TempDir;

    fn fast_poll() -> PollOptions {
        PollOptions {
            interval: Duration::ZERO,
            timeout: None,
            cancel: None,
        }
    }

    fn write_file(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "content").unwrap();
        path
    }

    #[test]
    fn create_store_records_default() {
        let remote = InMemoryRemoteStore::new();
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());

        let id = client.create_store("docs").unwrap();

        let cfg = storage.load().unwrap();
        assert_eq!(cfg.default_store.as_deref(), Some(id.as_str()));
        assert_eq!(cfg.stores["docs"].identifier, id);
    }

    #[test]
    fn failed_create_leaves_config_untouched() {
        let remote = InMemoryRemoteStore::new();
        remote.set_fail_create(true);
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());

        let err = client.create_store("docs").unwrap_err();
        assert!(matches!(err, HarnessError::Service(_)));
        assert!(!storage.is_persisted());
    }

    #[test]
    fn deleting_default_store_clears_it() {
        let remote = InMemoryRemoteStore::new();
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        let id = client.create_store("docs").unwrap();

        client.delete_store(&id).unwrap();

        let cfg = storage.load().unwrap();
        assert!(cfg.default_store.is_none());
        assert!(cfg.stores.values().all(|e| e.identifier != id));
    }

    #[test]
    fn failed_delete_keeps_local_config() {
        let remote = InMemoryRemoteStore::new();
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        let id = client.create_store("docs").unwrap();
        remote.set_fail_delete(true);

        assert!(client.delete_store(&id).is_err());
        assert_eq!(storage.load().unwrap().default_store, Some(id));
    }

    #[test]
    fn upload_polls_until_done() {
        let tmp = TempDir::new().unwrap();
        let file = write_file(&tmp, "Guide.md");
        let remote = InMemoryRemoteStore::new();
        remote.set_polls_before_done(3);
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        let id = client.create_store("docs").unwrap();

        let outcome = client.upload(&file, &id, None);

        assert!(outcome.success, "{:?}", outcome);
        assert_eq!(outcome.display_name.as_deref(), Some("Guide.md"));
        assert_eq!(remote.status_calls(), 4);
        assert_eq!(remote.document_names(&id), vec!["Guide.md".to_string()]);
    }

    #[test]
    fn rejected_submit_becomes_failed_outcome() {
        let tmp = TempDir::new().unwrap();
        let file = write_file(&tmp, "bad.md");
        let remote = InMemoryRemoteStore::new();
        remote.reject_upload("bad.md");
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        let id = client.create_store("docs").unwrap();

        let outcome = client.upload(&file, &id, None);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("rejected"));
        assert_eq!(remote.status_calls(), 0);
    }

    #[test]
    fn operation_error_becomes_failed_outcome() {
        let tmp = TempDir::new().unwrap();
        let file = write_file(&tmp, "broken.md");
        let remote = InMemoryRemoteStore::new();
        remote.fail_operation("renamed.md");
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        let id = client.create_store("docs").unwrap();

        let outcome = client.upload(&file, &id, Some("renamed.md"));
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("failed to index"));
    }

    #[test]
    fn timeout_stops_polling() {
        let tmp = TempDir::new().unwrap();
        let file = write_file(&tmp, "slow.md");
        let remote = InMemoryRemoteStore::new();
        remote.set_polls_before_done(u32::MAX);
        let storage = MemoryConfigStorage::new();
        let poll = PollOptions {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(30)),
            cancel: None,
        };
        let client = StoreClient::new(&remote, &storage, poll);
        let id = client.create_store("docs").unwrap();

        let outcome = client.upload(&file, &id, None);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[test]
    fn cancelled_token_stops_polling() {
        let tmp = TempDir::new().unwrap();
        let file = write_file(&tmp, "slow.md");
        let remote = InMemoryRemoteStore::new();
        remote.set_polls_before_done(u32::MAX);
        let storage = MemoryConfigStorage::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let client = StoreClient::new(&remote, &storage, fast_poll().with_cancel(cancel));
        let id = client.create_store("docs").unwrap();

        let outcome = client.upload(&file, &id, None);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("cancelled"));
        assert_eq!(remote.status_calls(), 0);
    }

    #[test]
    fn resolve_store_prefers_explicit_then_default() {
        let remote = InMemoryRemoteStore::new();
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());

        assert!(matches!(
            client.resolve_store(None),
            Err(HarnessError::Configuration(_))
        ));
        assert_eq!(client.resolve_store(Some("explicit")).unwrap(), "explicit");

        let id = client.create_store("docs").unwrap();
        assert_eq!(client.resolve_store(None).unwrap(), id);
    }

    #[test]
    fn bulk_counter_accumulates() {
        let remote = InMemoryRemoteStore::new();
        let storage = MemoryConfigStorage::new();
        let client = StoreClient::new(&remote, &storage, fast_poll());
        assert_eq!(client.record_bulk_upload(3).unwrap(), 3);
        assert_eq!(client.record_bulk_upload(2).unwrap(), 5);
    }
}
