//! Remote document-store abstraction.
//!
//! The [`RemoteStore`] trait is the only way the harness talks to the
//! externally hosted document index. Each method maps to one service call;
//! retries, polling and config bookkeeping live in the callers, so that an
//! HTTP adapter and the in-memory [`memory::InMemoryRemoteStore`] behave
//! identically from the lifecycle client's point of view.
//!
//! Implementations must be `Send + Sync`.

pub mod memory;

use std::path::Path;

use crate::error::Result;
use crate::models::{
    Answer, GenerationOptions, OperationHandle, OperationStatus, RemoteDocument, RemoteStoreInfo,
};

/// Abstract remote store service.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](RemoteStore::create) | Create a store, returning its identifier |
/// | [`upload_to_store`](RemoteStore::upload_to_store) | Start an asynchronous upload |
/// | [`operation_status`](RemoteStore::operation_status) | Poll an upload operation |
/// | [`list`](RemoteStore::list) | List all stores |
/// | [`delete`](RemoteStore::delete) | Delete a store and its documents |
/// | [`list_documents`](RemoteStore::list_documents) | List documents in a store |
/// | [`delete_document`](RemoteStore::delete_document) | Delete one document |
/// | [`generate_answer`](RemoteStore::generate_answer) | Answer a prompt, optionally grounded in a store |
pub trait RemoteStore: Send + Sync {
    /// Create a new store and return its service-assigned identifier.
    fn create(&self, display_name: &str) -> Result<String>;

    /// Submit one file to a store. Completion is observed via
    /// [`operation_status`](RemoteStore::operation_status).
    fn upload_to_store(
        &self,
        path: &Path,
        identifier: &str,
        display_name: &str,
        mime_type: &str,
    ) -> Result<OperationHandle>;

    /// Fetch the current state of an upload operation.
    fn operation_status(&self, handle: &OperationHandle) -> Result<OperationStatus>;

    fn list(&self) -> Result<Vec<RemoteStoreInfo>>;

    fn delete(&self, identifier: &str) -> Result<()>;

    fn list_documents(&self, identifier: &str) -> Result<Vec<RemoteDocument>>;

    /// Delete a document by its fully qualified name.
    fn delete_document(&self, document_name: &str) -> Result<()>;

    /// Generate an answer. When `identifier` is set the store is attached as
    /// a file-search tool and citations are returned.
    fn generate_answer(
        &self,
        identifier: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Answer>;
}
