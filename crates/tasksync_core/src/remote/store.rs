//! Owner-scoped task operations over a `DocumentBackend`.
//!
//! # Responsibility
//! - Hold connection and owner binding state.
//! - Encode tasks into documents with `ownerId` injected.
//! - Turn every operation into a successful no-op while unbound.
//!
//! # Invariants
//! - `initialize` is idempotent; failure leaves the store uninitialized.
//! - Writes and deletes need both a backend and an owner; `list_all` only
//!   needs a backend.

use super::{
    Document, DocumentBackend, HttpConnector, RemoteConnector, RemoteError, RemoteResult,
    WriteMode,
};
use crate::model::task::{Task, TaskId};
use log::{info, warn};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Remote task collection for one process.
pub struct RemoteStore {
    connector: Arc<dyn RemoteConnector>,
    backend: RwLock<Option<Arc<dyn DocumentBackend>>>,
    owner_id: RwLock<Option<String>>,
}

impl RemoteStore {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            connector,
            backend: RwLock::new(None),
            owner_id: RwLock::new(None),
        }
    }

    /// Store connecting through the HTTP document service.
    pub fn http() -> Self {
        Self::new(Arc::new(HttpConnector))
    }

    /// Connects once using `credentials`.
    ///
    /// Returns `true` when connected (including when already connected).
    /// Failures are logged and reported as `false`.
    pub fn initialize(&self, credentials: &str) -> bool {
        let mut backend = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        if backend.is_some() {
            return true;
        }

        match self.connector.connect(credentials) {
            Ok(connected) => {
                info!(
                    "event=remote_init module=remote status=ok backend={}",
                    connected.backend_id()
                );
                *backend = Some(connected);
                true
            }
            Err(err) => {
                warn!(
                    "event=remote_init module=remote status=error error={}",
                    err
                );
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Binds subsequent writes to `owner_id`'s collection.
    pub fn set_owner(&self, owner_id: impl Into<String>) {
        *self.owner_id.write().unwrap_or_else(PoisonError::into_inner) = Some(owner_id.into());
    }

    pub fn owner_id(&self) -> Option<String> {
        self.owner_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes a newly created task as a whole document.
    pub async fn create(&self, task: &Task) -> RemoteResult<()> {
        self.put(task, WriteMode::Replace).await
    }

    /// Writes an updated task, leaving unknown remote fields in place.
    pub async fn upsert(&self, task: &Task) -> RemoteResult<()> {
        self.put(task, WriteMode::Merge).await
    }

    /// Removes the document for `task_id`.
    pub async fn delete(&self, task_id: TaskId) -> RemoteResult<()> {
        let Some((backend, owner_id)) = self.binding() else {
            return Ok(());
        };
        backend
            .delete_document(&owner_id, &task_id.to_string())
            .await
    }

    /// Fetches every task of `user_id`, most recently updated first.
    pub async fn list_all(&self, user_id: &str) -> RemoteResult<Vec<Task>> {
        let Some(backend) = self.backend() else {
            return Ok(Vec::new());
        };

        let documents = backend.list_documents(user_id).await?;
        let mut tasks = documents
            .into_iter()
            .map(decode_document)
            .collect::<RemoteResult<Vec<Task>>>()?;
        tasks.sort_by(|left, right| right.updated_at().cmp(&left.updated_at()));
        Ok(tasks)
    }

    /// Drops the connection. Close errors are logged, never returned.
    pub fn close(&self) {
        let released = self
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(backend) = released else {
            return;
        };

        match backend.close() {
            Ok(()) => info!(
                "event=remote_close module=remote status=ok backend={}",
                backend.backend_id()
            ),
            Err(err) => warn!(
                "event=remote_close module=remote status=error backend={} error={}",
                backend.backend_id(),
                err
            ),
        }
    }

    async fn put(&self, task: &Task, mode: WriteMode) -> RemoteResult<()> {
        let Some((backend, owner_id)) = self.binding() else {
            return Ok(());
        };

        let mut owned = task.clone();
        owned.set_owner(owner_id.as_str());
        let document = encode_document(&owned)?;
        backend
            .put_document(&owner_id, &task.id().to_string(), document, mode)
            .await
    }

    fn backend(&self) -> Option<Arc<dyn DocumentBackend>> {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn binding(&self) -> Option<(Arc<dyn DocumentBackend>, String)> {
        let backend = self.backend()?;
        let owner_id = self.owner_id()?;
        Some((backend, owner_id))
    }
}

fn encode_document(task: &Task) -> RemoteResult<Document> {
    match serde_json::to_value(task) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(RemoteError::Codec(format!(
            "task encoded as non-object value: {other}"
        ))),
        Err(err) => Err(RemoteError::Codec(err.to_string())),
    }
}

fn decode_document(document: Document) -> RemoteResult<Task> {
    serde_json::from_value(Value::Object(document))
        .map_err(|err| RemoteError::Codec(err.to_string()))
}
