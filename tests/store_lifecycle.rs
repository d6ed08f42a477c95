//! End-to-end store lifecycle against the in-memory remote store and the
//! JSON file storage.

use std::fs;
use std::path::Path;
use std::time::Duration;

use store_harness::client::{PollOptions, StoreClient};
use store_harness::config::{ResetConfig, SelectionConfig};
use store_harness::progress::NoProgress;
use store_harness::selection::SelectionProfile;
use store_harness::state::JsonFileStorage;
use store_harness::sync::{self, SyncOptions};
use store_harness_core::state::ConfigStorage;
use store_harness_core::store::memory::InMemoryRemoteStore;
use store_harness_core::store::RemoteStore;
use tempfile::TempDir;

fn poll() -> PollOptions {
    PollOptions {
        interval: Duration::ZERO,
        timeout: Some(Duration::from_secs(5)),
        cancel: None,
    }
}

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "content").unwrap();
}

#[test]
fn create_sync_and_delete_persist_to_json() {
    let tmp = TempDir::new().unwrap();
    let state_path = tmp.path().join("config/store_config.json");
    let samples = tmp.path().join("samples");
    touch(&samples, "Viewer/App.xaml");
    touch(&samples, "Viewer/App.xaml.cs");
    touch(&samples, "Viewer/obj/App.g.cs");
    touch(&samples, "Viewer/README.md");

    let remote = InMemoryRemoteStore::new();
    remote.set_polls_before_done(2);
    let storage = JsonFileStorage::new(&state_path);
    let client = StoreClient::new(&remote, &storage, poll());

    let id = client.create_store("hmeg-samples").unwrap();
    let options = SyncOptions {
        profile: SelectionProfile::Samples,
        relative_names: true,
        ..SyncOptions::default()
    };
    let report = sync::sync_directory(
        &client,
        &SelectionConfig::default(),
        &samples,
        &id,
        &options,
        &NoProgress,
    )
    .unwrap();

    assert!(report.success);
    assert_eq!(report.total, 3);
    assert_eq!(
        remote.document_names(&id),
        vec!["Viewer/App.xaml", "Viewer/App.xaml.cs", "Viewer/README.md"]
    );

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(raw["default_store"], serde_json::json!(id));
    assert_eq!(raw["stores"]["hmeg-samples"]["name"], serde_json::json!(id));
    assert_eq!(raw["sample_files_count"], serde_json::json!(3));

    client.delete_store(&id).unwrap();
    let after = storage.load().unwrap();
    assert!(after.default_store.is_none());
    assert!(after.stores.is_empty());
    assert_eq!(after.sample_files_count, 3);
    assert!(remote.list().unwrap().is_empty());
}

#[test]
fn second_create_becomes_default_without_dropping_first() {
    let tmp = TempDir::new().unwrap();
    let remote = InMemoryRemoteStore::new();
    let storage = JsonFileStorage::new(tmp.path().join("store_config.json"));
    let client = StoreClient::new(&remote, &storage, poll());

    let first = client.create_store("docs").unwrap();
    let second = client.create_store("samples").unwrap();

    let cfg = storage.load().unwrap();
    assert_eq!(cfg.default_store, Some(second.clone()));
    assert_eq!(cfg.stores.len(), 2);

    client.delete_store(&second).unwrap();
    let cfg = storage.load().unwrap();
    assert!(cfg.default_store.is_none(), "no store is promoted");
    assert_eq!(cfg.stores["docs"].identifier, first);
}

#[test]
fn reset_converges_store_to_canonical_document() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    touch(&docs, "guide.md");
    touch(&docs, "old.md");

    let remote = InMemoryRemoteStore::new();
    let storage = JsonFileStorage::new(tmp.path().join("store_config.json"));
    let client = StoreClient::new(&remote, &storage, poll());
    let id = client.create_store("docs").unwrap();
    sync::sync_directory(
        &client,
        &SelectionConfig::default(),
        &docs,
        &id,
        &SyncOptions::default(),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(remote.document_names(&id).len(), 2);

    let reset = ResetConfig {
        display_name: "docs".to_string(),
        canonical: Some(docs.join("guide.md")),
    };
    let (deleted, init) =
        sync::reset_default_store(&client, &SelectionConfig::default(), &reset, &NoProgress)
            .unwrap();

    assert_eq!(deleted, Some(id));
    assert!(init.is_success());
    assert_eq!(remote.document_names(&init.identifier), vec!["guide.md"]);
    assert_eq!(storage.load().unwrap().default_store, Some(init.identifier));
}

#[test]
fn failing_file_does_not_stop_the_rest() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    touch(&docs, "a.md");
    touch(&docs, "b.md");
    touch(&docs, "c.md");

    let remote = InMemoryRemoteStore::new();
    remote.reject_upload("b.md");
    let storage = JsonFileStorage::new(tmp.path().join("store_config.json"));
    let client = StoreClient::new(&remote, &storage, poll());
    let id = client.create_store("docs").unwrap();

    let report = sync::sync_directory(
        &client,
        &SelectionConfig::default(),
        &docs,
        &id,
        &SyncOptions::default(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(
        (report.total, report.uploaded, report.failed, report.success),
        (3, 2, 1, false)
    );
    assert_eq!(remote.upload_calls(), 3);
    assert_eq!(remote.document_names(&id), vec!["a.md", "c.md"]);
}
