use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tasksync_core::remote::{InMemoryBackend, InMemoryConnector};
use tasksync_core::{
    CoreConfig, LocalStore, RemoteSyncConfig, RemoteStore, ServiceError, SyncEngine, SyncStatus,
    TaskService,
};
use tokio::runtime::Handle;
use uuid::Uuid;

fn service_at(path: PathBuf) -> (TaskService, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let remote = RemoteStore::new(Arc::new(InMemoryConnector::new(backend.clone())));
    let engine = SyncEngine::new(LocalStore::open(path).unwrap(), remote, Handle::current());
    (TaskService::new(engine), backend)
}

#[tokio::test(flavor = "multi_thread")]
async fn add_update_remove_through_string_ids() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _backend) = service_at(dir.path().join("tasks.json"));
    let due = NaiveDate::from_ymd_opt(2024, 6, 1);

    let task = service.add_task("  Buy milk  ", due).unwrap();
    assert_eq!(task.title(), "Buy milk");
    let id = task.id().to_string();

    let updated = service.update_task(&id, "Buy oat milk", true, None).unwrap();
    assert_eq!(updated.title(), "Buy oat milk");
    assert!(updated.is_completed());
    assert_eq!(updated.due(), None);

    let reopened = service.set_completed(&format!(" {id} "), false).unwrap();
    assert!(!reopened.is_completed());

    service.remove_task(&id).unwrap();
    assert!(service.list_tasks().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unchanged_update_keeps_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _backend) = service_at(dir.path().join("tasks.json"));
    let task = service.add_task("steady", None).unwrap();

    let same = service
        .update_task(&task.id().to_string(), "steady", false, None)
        .unwrap();
    assert_eq!(same.updated_at(), task.updated_at());
}

#[tokio::test(flavor = "multi_thread")]
async fn input_errors_map_to_caller_categories() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _backend) = service_at(dir.path().join("tasks.json"));

    assert!(matches!(
        service.add_task("   ", None),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        service.remove_task(""),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        service.remove_task("not-a-uuid"),
        Err(ServiceError::TaskNotFound(_))
    ));

    let missing = Uuid::new_v4().to_string();
    assert!(matches!(
        service.update_task(&missing, "x", false, None),
        Err(ServiceError::TaskNotFound(id)) if id == missing
    ));

    let task = service.add_task("real", None).unwrap();
    assert!(matches!(
        service.update_task(&task.id().to_string(), " ", false, None),
        Err(ServiceError::InvalidInput(_))
    ));
    assert_eq!(service.list_tasks()[0].title(), "real");
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_sync_initialization_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let (service, backend) = service_at(dir.path().join("tasks.json"));
    assert_eq!(service.sync_status(), SyncStatus::Local);

    assert!(matches!(
        service.initialize_remote_sync("memory://test", "  "),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        service.initialize_remote_sync("", "user-1"),
        Err(ServiceError::InvalidInput(_))
    ));
    assert_eq!(service.sync_status(), SyncStatus::Local);

    assert!(service.initialize_remote_sync("memory://test", "user-1").unwrap());
    assert_eq!(service.sync_status(), SyncStatus::Remote);
    assert_eq!(service.sync_status().to_string(), "remote");

    let task = service.add_task("uploaded", None).unwrap();
    assert!(service.wait_for_remote(Duration::from_secs(5)).await);
    assert!(backend
        .document("user-1", &task.id().to_string())
        .is_some());

    let remote = service.remote_tasks().await.unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].owner_id(), Some("user-1"));

    service.close();
    assert_eq!(service.sync_status(), SyncStatus::Local);
}

#[tokio::test(flavor = "multi_thread")]
async fn from_config_with_unusable_remote_stays_local() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        storage_path: dir.path().join("data").join("tasks.json"),
        remote: Some(RemoteSyncConfig {
            credentials: dir
                .path()
                .join("missing-credentials.json")
                .to_string_lossy()
                .into_owned(),
            user_id: "user-1".to_string(),
        }),
        ..CoreConfig::default()
    };

    let service = TaskService::from_config(&config, Handle::current()).unwrap();
    assert_eq!(service.sync_status(), SyncStatus::Local);

    service.add_task("still works", None).unwrap();
    assert!(config.storage_path.is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn from_config_fails_when_storage_directory_is_unusable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    let config = CoreConfig {
        storage_path: blocker.join("tasks.json"),
        ..CoreConfig::default()
    };

    assert!(matches!(
        TaskService::from_config(&config, Handle::current()),
        Err(ServiceError::Engine(_))
    ));
}
