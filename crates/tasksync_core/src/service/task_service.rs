//! Task use-case service.
//!
//! # Responsibility
//! - Provide the caller-facing task operations (list/add/update/remove/
//!   clear-completed, remote sync init, sync status).
//! - Turn raw strings from outer layers into validated titles, ids and dates.
//!
//! # Invariants
//! - Blank titles and blank ids never reach the engine.
//! - Unknown or malformed ids surface as `TaskNotFound`, not as storage errors.
//! - Remote failures never surface through mutating calls.

use crate::config::CoreConfig;
use crate::model::task::{Task, TaskId};
use crate::remote::{RemoteResult, RemoteStore};
use crate::store::LocalStore;
use crate::sync::{EngineError, SyncEngine, SyncStatus};
use chrono::NaiveDate;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::runtime::Handle;
use uuid::Uuid;

const DUE_FORMAT: &str = "%Y-%m-%d";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for task use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Required input missing or malformed (HTTP 400 equivalent).
    InvalidInput(String),
    /// No task with this id (HTTP 404 equivalent).
    TaskNotFound(String),
    /// Local persistence or engine failure.
    Engine(EngineError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::NotFound(id) => Self::TaskNotFound(id.to_string()),
            other => Self::Engine(other),
        }
    }
}

/// Caller-facing wrapper around one `SyncEngine`.
pub struct TaskService {
    engine: SyncEngine,
}

impl TaskService {
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// Wires local storage, the HTTP remote connector and, when configured,
    /// remote sync.
    ///
    /// A failed remote initialization is logged and leaves the service
    /// local-only; only local storage setup can fail this call.
    pub fn from_config(config: &CoreConfig, runtime: Handle) -> ServiceResult<Self> {
        let local = LocalStore::open(&config.storage_path).map_err(EngineError::from)?;
        let service = Self::new(SyncEngine::new(local, RemoteStore::http(), runtime));

        if let Some(remote) = &config.remote {
            if !service.initialize_remote_sync(&remote.credentials, &remote.user_id)? {
                warn!("event=sync_enable module=service status=error reason=remote_init_failed");
            }
        }
        Ok(service)
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Current in-memory snapshot. No I/O.
    pub fn list_tasks(&self) -> Vec<Task> {
        self.engine.tasks()
    }

    /// Creates a task at the head of the list.
    pub fn add_task(&self, title: &str, due: Option<NaiveDate>) -> ServiceResult<Task> {
        let title = normalize_title(title)?;
        Ok(self.engine.add(Task::new(title, due))?)
    }

    /// Replaces title, completion and due date of task `id`.
    ///
    /// `updatedAt` only moves when one of the fields actually changes.
    pub fn update_task(
        &self,
        id: &str,
        title: &str,
        completed: bool,
        due: Option<NaiveDate>,
    ) -> ServiceResult<Task> {
        let id = parse_task_id(id)?;
        let title = normalize_title(title)?;
        Ok(self.engine.update(id, |task| {
            task.update_fields(title, completed, due);
        })?)
    }

    /// Flips only the completion flag of task `id`.
    pub fn set_completed(&self, id: &str, completed: bool) -> ServiceResult<Task> {
        let id = parse_task_id(id)?;
        Ok(self.engine.update(id, |task| {
            task.set_completed(completed);
        })?)
    }

    pub fn remove_task(&self, id: &str) -> ServiceResult<()> {
        let id = parse_task_id(id)?;
        self.engine.remove(id)?;
        Ok(())
    }

    /// Returns how many completed tasks were removed.
    pub fn clear_completed(&self) -> ServiceResult<usize> {
        Ok(self.engine.clear_completed()?)
    }

    /// Returns `Ok(false)` when the remote store could not be reached.
    pub fn initialize_remote_sync(&self, credentials: &str, user_id: &str) -> ServiceResult<bool> {
        let credentials = credentials.trim();
        let user_id = user_id.trim();
        if credentials.is_empty() {
            return Err(ServiceError::InvalidInput(
                "credentials locator is required".to_string(),
            ));
        }
        if user_id.is_empty() {
            return Err(ServiceError::InvalidInput("user id is required".to_string()));
        }
        Ok(self.engine.initialize_remote(credentials, user_id))
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.engine.status()
    }

    /// Remote copy of the user's tasks, most recently updated first.
    pub async fn remote_tasks(&self) -> RemoteResult<Vec<Task>> {
        self.engine.remote_snapshot().await
    }

    /// Gives launched remote writes up to `limit` to finish.
    pub async fn wait_for_remote(&self, limit: Duration) -> bool {
        self.engine.wait_for_dispatches(limit).await
    }

    pub fn close(&self) {
        self.engine.close();
    }
}

/// Parses an optional `YYYY-MM-DD` due date; blank means no due date.
pub fn parse_due(raw: Option<&str>) -> ServiceResult<Option<NaiveDate>> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, DUE_FORMAT)
        .map(Some)
        .map_err(|_| ServiceError::InvalidInput(format!("due date must be YYYY-MM-DD, got `{raw}`")))
}

fn parse_task_id(raw: &str) -> ServiceResult<TaskId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("task id is required".to_string()));
    }
    Uuid::parse_str(trimmed).map_err(|_| ServiceError::TaskNotFound(trimmed.to_string()))
}

fn normalize_title(raw: &str) -> ServiceResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("title is required".to_string()));
    }
    Ok(trimmed.to_string())
}
