//! In-memory [`RemoteStore`] implementation for tests and offline runs.
//!
//! Stores and documents live in `Vec`s behind `std::sync::RwLock`. Upload
//! operations stay `PENDING` for a configurable number of status polls before
//! completing, and individual files can be scripted to fail either at submit
//! time or when the operation finishes.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{HarnessError, Result};
use crate::models::{
    Answer, Citation, GenerationOptions, OperationHandle, OperationStatus, RemoteDocument,
    RemoteStoreInfo,
};

use super::RemoteStore;

struct StoredStore {
    identifier: String,
    display_name: String,
    documents: Vec<RemoteDocument>,
}

struct StoredOperation {
    remaining_polls: u32,
    error: Option<String>,
    store: String,
    document: RemoteDocument,
}

/// In-memory remote store.
pub struct InMemoryRemoteStore {
    stores: RwLock<Vec<StoredStore>>,
    operations: RwLock<HashMap<String, StoredOperation>>,
    polls_before_done: RwLock<u32>,
    reject_uploads: RwLock<HashSet<String>>,
    fail_operations: RwLock<HashSet<String>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    upload_calls: AtomicUsize,
    status_calls: AtomicUsize,
    last_generation: RwLock<Option<(String, GenerationOptions)>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(Vec::new()),
            operations: RwLock::new(HashMap::new()),
            polls_before_done: RwLock::new(0),
            reject_uploads: RwLock::new(HashSet::new()),
            fail_operations: RwLock::new(HashSet::new()),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            upload_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            last_generation: RwLock::new(None),
        }
    }

    /// Number of status polls an operation reports `PENDING` before `DONE`.
    /// `u32::MAX` keeps operations pending forever.
    pub fn set_polls_before_done(&self, polls: u32) {
        *self.polls_before_done.write().unwrap() = polls;
    }

    /// Make `upload_to_store` fail immediately for this display name.
    pub fn reject_upload(&self, display_name: &str) {
        self.reject_uploads
            .write()
            .unwrap()
            .insert(display_name.to_string());
    }

    /// Let the upload be accepted but finish `DONE` with an error.
    pub fn fail_operation(&self, display_name: &str) {
        self.fail_operations
            .write()
            .unwrap()
            .insert(display_name.to_string());
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Prompt and options of the most recent `generate_answer` call.
    pub fn last_generation(&self) -> Option<(String, GenerationOptions)> {
        self.last_generation.read().unwrap().clone()
    }

    /// Display names of documents that finished uploading into a store.
    pub fn document_names(&self, identifier: &str) -> Vec<String> {
        let stores = self.stores.read().unwrap();
        stores
            .iter()
            .find(|s| s.identifier == identifier)
            .map(|s| s.documents.iter().map(|d| d.display_name.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn create(&self, display_name: &str) -> Result<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(HarnessError::Service("create rejected".to_string()));
        }
        let slug: String = display_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let suffix = Uuid::new_v4().simple().to_string();
        let identifier = format!("fileSearchStores/{}-{}", slug, &suffix[..12]);
        self.stores.write().unwrap().push(StoredStore {
            identifier: identifier.clone(),
            display_name: display_name.to_string(),
            documents: Vec::new(),
        });
        Ok(identifier)
    }

    fn upload_to_store(
        &self,
        path: &Path,
        identifier: &str,
        display_name: &str,
        _mime_type: &str,
    ) -> Result<OperationHandle> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_uploads.read().unwrap().contains(display_name) {
            return Err(HarnessError::Service(format!(
                "upload rejected: {}",
                display_name
            )));
        }
        if !self
            .stores
            .read()
            .unwrap()
            .iter()
            .any(|s| s.identifier == identifier)
        {
            return Err(HarnessError::Service(format!(
                "store not found: {}",
                identifier
            )));
        }
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let op_id = Uuid::new_v4().simple().to_string();
        let name = format!("{}/upload/operations/{}", identifier, op_id);
        let error = if self.fail_operations.read().unwrap().contains(display_name) {
            Some(format!("failed to index {}", display_name))
        } else {
            None
        };
        let document = RemoteDocument {
            name: format!("{}/documents/{}", identifier, &op_id[..12]),
            display_name: display_name.to_string(),
            size_bytes,
            state: "STATE_ACTIVE".to_string(),
        };
        self.operations.write().unwrap().insert(
            name.clone(),
            StoredOperation {
                remaining_polls: *self.polls_before_done.read().unwrap(),
                error,
                store: identifier.to_string(),
                document,
            },
        );
        Ok(OperationHandle { name })
    }

    fn operation_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let mut ops = self.operations.write().unwrap();
        let op = ops.get_mut(&handle.name).ok_or_else(|| {
            HarnessError::Service(format!("unknown operation: {}", handle.name))
        })?;

        if op.remaining_polls > 0 {
            if op.remaining_polls != u32::MAX {
                op.remaining_polls -= 1;
            }
            return Ok(OperationStatus::pending());
        }

        if let Some(err) = &op.error {
            return Ok(OperationStatus::failed(err.clone()));
        }

        let mut stores = self.stores.write().unwrap();
        if let Some(store) = stores.iter_mut().find(|s| s.identifier == op.store) {
            if !store.documents.iter().any(|d| d.name == op.document.name) {
                store.documents.push(op.document.clone());
            }
        }
        Ok(OperationStatus::succeeded())
    }

    fn list(&self) -> Result<Vec<RemoteStoreInfo>> {
        Ok(self
            .stores
            .read()
            .unwrap()
            .iter()
            .map(|s| RemoteStoreInfo {
                identifier: s.identifier.clone(),
                display_name: s.display_name.clone(),
            })
            .collect())
    }

    fn delete(&self, identifier: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(HarnessError::Service("delete rejected".to_string()));
        }
        let mut stores = self.stores.write().unwrap();
        let before = stores.len();
        stores.retain(|s| s.identifier != identifier);
        if stores.len() == before {
            return Err(HarnessError::Service(format!(
                "store not found: {}",
                identifier
            )));
        }
        Ok(())
    }

    fn list_documents(&self, identifier: &str) -> Result<Vec<RemoteDocument>> {
        let stores = self.stores.read().unwrap();
        let store = stores
            .iter()
            .find(|s| s.identifier == identifier)
            .ok_or_else(|| HarnessError::Service(format!("store not found: {}", identifier)))?;
        Ok(store.documents.clone())
    }

    fn delete_document(&self, document_name: &str) -> Result<()> {
        let mut stores = self.stores.write().unwrap();
        for store in stores.iter_mut() {
            let before = store.documents.len();
            store.documents.retain(|d| d.name != document_name);
            if store.documents.len() != before {
                return Ok(());
            }
        }
        Err(HarnessError::Service(format!(
            "document not found: {}",
            document_name
        )))
    }

    fn generate_answer(
        &self,
        identifier: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Answer> {
        *self.last_generation.write().unwrap() = Some((prompt.to_string(), options.clone()));
        let citations = match identifier {
            Some(id) => self
                .list_documents(id)?
                .into_iter()
                .map(|d| Citation {
                    source: d.display_name,
                    content: String::new(),
                })
                .collect(),
            None => Vec::new(),
        };
        let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        Ok(Answer {
            text: format!("answer: {}", first_line.trim()),
            citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_stays_pending_for_configured_polls() {
        let store = InMemoryRemoteStore::new();
        store.set_polls_before_done(2);
        let id = store.create("docs").unwrap();
        let handle = store
            .upload_to_store(Path::new("missing.md"), &id, "missing.md", "text/markdown")
            .unwrap();

        assert!(!store.operation_status(&handle).unwrap().done);
        assert!(!store.operation_status(&handle).unwrap().done);
        let status = store.operation_status(&handle).unwrap();
        assert!(status.done);
        assert!(status.error.is_none());
        assert_eq!(store.document_names(&id), vec!["missing.md".to_string()]);
    }

    #[test]
    fn failed_operation_reports_error_and_keeps_store_clean() {
        let store = InMemoryRemoteStore::new();
        let id = store.create("docs").unwrap();
        store.fail_operation("bad.md");
        let handle = store
            .upload_to_store(Path::new("bad.md"), &id, "bad.md", "text/markdown")
            .unwrap();
        let status = store.operation_status(&handle).unwrap();
        assert!(status.done);
        assert!(status.error.is_some());
        assert!(store.document_names(&id).is_empty());
    }

    #[test]
    fn delete_unknown_store_is_service_error() {
        let store = InMemoryRemoteStore::new();
        let err = store.delete("fileSearchStores/nope").unwrap_err();
        assert!(matches!(err, HarnessError::Service(_)));
    }

    #[test]
    fn identifiers_are_unique_per_create() {
        let store = InMemoryRemoteStore::new();
        let a = store.create("docs").unwrap();
        let b = store.create("docs").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
