use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tasksync_core::remote::{InMemoryBackend, InMemoryConnector, RemoteError};
use tasksync_core::{RemoteStore, Task};
use uuid::Uuid;

const OWNER: &str = "user-1";

fn connected_store() -> (RemoteStore, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let store = RemoteStore::new(Arc::new(InMemoryConnector::new(backend.clone())));
    assert!(store.initialize("memory://test"));
    store.set_owner(OWNER);
    (store, backend)
}

#[tokio::test]
async fn uninitialized_store_turns_every_operation_into_a_noop() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = RemoteStore::new(Arc::new(InMemoryConnector::new(backend.clone())));
    let task = Task::new("offline", None);

    store.create(&task).await.unwrap();
    store.upsert(&task).await.unwrap();
    store.delete(task.id()).await.unwrap();
    assert!(store.list_all(OWNER).await.unwrap().is_empty());

    assert!(!store.is_initialized());
    assert_eq!(backend.completed_ops(), 0);
}

#[tokio::test]
async fn writes_without_owner_are_skipped() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = RemoteStore::new(Arc::new(InMemoryConnector::new(backend.clone())));
    assert!(store.initialize("memory://test"));

    store.create(&Task::new("ownerless", None)).await.unwrap();
    assert_eq!(backend.completed_ops(), 0);
}

#[test]
fn initialize_is_idempotent() {
    let (store, _backend) = connected_store();
    assert!(store.is_initialized());
    assert!(store.initialize("ignored-the-second-time"));
    assert!(store.is_initialized());
}

#[test]
fn initialize_with_unreadable_credentials_stays_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("credentials.json");
    let store = RemoteStore::http();

    assert!(!store.initialize(missing.to_str().unwrap()));
    assert!(!store.is_initialized());
}

#[tokio::test]
async fn create_injects_owner_and_writes_whole_document() {
    let (store, backend) = connected_store();
    let task = Task::new("remote me", NaiveDate::from_ymd_opt(2024, 6, 1));

    store.create(&task).await.unwrap();

    let document = backend.document(OWNER, &task.id().to_string()).unwrap();
    assert_eq!(document["ownerId"], OWNER);
    assert_eq!(document["title"], "remote me");
    assert_eq!(document["due"], "2024-06-01");
    assert_eq!(document["completed"], false);
}

#[tokio::test]
async fn upsert_merges_and_create_replaces() {
    let (store, backend) = connected_store();
    let mut task = Task::new("v1", None);
    let doc_id = task.id().to_string();
    backend.insert_document(
        OWNER,
        &doc_id,
        json!({"id": doc_id, "foreign": "kept by merge"})
            .as_object()
            .cloned()
            .unwrap(),
    );

    task.set_title("v2");
    store.upsert(&task).await.unwrap();
    let merged = backend.document(OWNER, &doc_id).unwrap();
    assert_eq!(merged["title"], "v2");
    assert_eq!(merged["foreign"], "kept by merge");

    store.create(&task).await.unwrap();
    let replaced = backend.document(OWNER, &doc_id).unwrap();
    assert!(!replaced.contains_key("foreign"));
}

#[tokio::test]
async fn upsert_clears_a_removed_due_date() {
    let (store, backend) = connected_store();
    let mut task = Task::new("dated", NaiveDate::from_ymd_opt(2024, 1, 1));
    store.create(&task).await.unwrap();

    task.set_due(None);
    store.upsert(&task).await.unwrap();

    let document = backend.document(OWNER, &task.id().to_string()).unwrap();
    assert!(document["due"].is_null());
}

#[tokio::test]
async fn delete_removes_document_and_tolerates_absent_ones() {
    let (store, backend) = connected_store();
    let task = Task::new("short lived", None);
    store.create(&task).await.unwrap();

    store.delete(task.id()).await.unwrap();
    assert!(backend.document(OWNER, &task.id().to_string()).is_none());

    store.delete(Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn list_all_orders_by_updated_at_descending() {
    let (store, backend) = connected_store();
    let now = Utc::now();
    let oldest = Task::with_id(Uuid::new_v4(), "oldest", None, now - Duration::hours(2)).unwrap();
    let newest = Task::with_id(Uuid::new_v4(), "newest", None, now).unwrap();
    let middle = Task::with_id(Uuid::new_v4(), "middle", None, now - Duration::hours(1)).unwrap();

    for task in [&oldest, &newest, &middle] {
        store.create(task).await.unwrap();
    }
    // Another user's documents stay out of the listing.
    backend.insert_document(
        "someone-else",
        "x",
        json!({"id": Uuid::new_v4().to_string()}).as_object().cloned().unwrap(),
    );

    let titles: Vec<String> = store
        .list_all(OWNER)
        .await
        .unwrap()
        .iter()
        .map(|task| task.title().to_string())
        .collect();
    assert_eq!(titles, ["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn list_all_reports_undecodable_documents() {
    let (store, backend) = connected_store();
    backend.insert_document(
        OWNER,
        "broken",
        json!({"title": "no id"}).as_object().cloned().unwrap(),
    );

    let err = store.list_all(OWNER).await.unwrap_err();
    assert!(matches!(err, RemoteError::Codec(_)));
}

#[tokio::test]
async fn backend_failures_are_returned_not_panicked() {
    let (store, backend) = connected_store();
    backend.set_failing(true);

    let err = store.create(&Task::new("doomed", None)).await.unwrap_err();
    assert!(matches!(err, RemoteError::Backend(_)));
}

#[tokio::test]
async fn close_releases_backend_and_returns_to_noop() {
    let (store, backend) = connected_store();
    store.close();

    assert!(backend.is_closed());
    assert!(!store.is_initialized());

    store.create(&Task::new("after close", None)).await.unwrap();
    assert_eq!(backend.completed_ops(), 0);

    store.close();
}
