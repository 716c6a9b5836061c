//! Write-through task list with best-effort remote mirroring.
//!
//! # Responsibility
//! - Apply add/update/remove/clear-completed to the in-memory list.
//! - Persist the whole list after each mutation, synchronously.
//! - Launch the matching remote call when sync is enabled.
//!
//! # Invariants
//! - One mutex covers "mutate + save"; concurrent callers see whole commits.
//! - A mutation is applied to a copy, saved, then swapped in, so a failed
//!   save leaves memory and file on the last committed state.
//! - Mutations behave identically with sync on or off apart from the
//!   background dispatch.

use super::dispatch::{spawn_bulk_delete, spawn_remote, InFlight, RemoteOp};
use super::{EngineError, EngineResult, SyncStatus};
use crate::model::task::{Task, TaskId};
use crate::remote::{RemoteResult, RemoteStore};
use crate::store::LocalStore;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

struct EngineState {
    tasks: Vec<Task>,
    local: LocalStore,
}

/// Single owner of the task list.
pub struct SyncEngine {
    state: Mutex<EngineState>,
    remote: Arc<RemoteStore>,
    sync_enabled: AtomicBool,
    runtime: Handle,
    in_flight: Arc<InFlight>,
}

impl SyncEngine {
    /// Loads the persisted list and starts in the Disabled sync state.
    ///
    /// `runtime` receives every background remote dispatch.
    pub fn new(local: LocalStore, remote: RemoteStore, runtime: Handle) -> Self {
        let tasks = local.load();
        info!(
            "event=engine_start module=sync status=ok count={} path={}",
            tasks.len(),
            local.path().display()
        );
        Self {
            state: Mutex::new(EngineState { tasks, local }),
            remote: Arc::new(remote),
            sync_enabled: AtomicBool::new(false),
            runtime,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Snapshot of the current list, newest additions first. No I/O.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock_state().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock_state()
            .tasks
            .iter()
            .find(|task| task.id() == id)
            .cloned()
    }

    /// Connects the remote store and enables sync on success.
    ///
    /// Failure keeps the engine local-only; it is not an error for callers.
    pub fn initialize_remote(&self, credentials: &str, user_id: &str) -> bool {
        if !self.remote.initialize(credentials) {
            return false;
        }
        self.remote.set_owner(user_id);
        self.sync_enabled.store(true, Ordering::Release);
        info!("event=sync_enable module=sync status=ok");
        true
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync_enabled.load(Ordering::Acquire)
    }

    /// `Remote` only while sync is enabled and the store is still connected.
    pub fn status(&self) -> SyncStatus {
        if self.is_sync_enabled() && self.remote.is_initialized() {
            SyncStatus::Remote
        } else {
            SyncStatus::Local
        }
    }

    /// Inserts `task` at the head of the list.
    ///
    /// # Errors
    /// - `EngineError::DuplicateId` when the id is already present.
    /// - `EngineError::Store` when the list cannot be saved.
    pub fn add(&self, task: Task) -> EngineResult<Task> {
        let added = self.commit(move |tasks| {
            if tasks.iter().any(|existing| existing.id() == task.id()) {
                return Err(EngineError::DuplicateId(task.id()));
            }
            tasks.insert(0, task.clone());
            Ok(task)
        })?;

        if self.is_sync_enabled() {
            let remote = self.remote.clone();
            let task = added.clone();
            let task_id = task.id();
            spawn_remote(
                &self.runtime,
                &self.in_flight,
                RemoteOp::Create,
                task_id,
                async move { remote.create(&task).await },
            );
        }
        Ok(added)
    }

    /// Edits the task `id` in place through its setters and persists.
    ///
    /// Returns the task as stored after the edit.
    pub fn update<F>(&self, id: TaskId, edit: F) -> EngineResult<Task>
    where
        F: FnOnce(&mut Task),
    {
        let updated = self.commit(move |tasks| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id() == id)
                .ok_or(EngineError::NotFound(id))?;
            edit(task);
            Ok(task.clone())
        })?;

        if self.is_sync_enabled() {
            let remote = self.remote.clone();
            let task = updated.clone();
            spawn_remote(
                &self.runtime,
                &self.in_flight,
                RemoteOp::Upsert,
                id,
                async move { remote.upsert(&task).await },
            );
        }
        Ok(updated)
    }

    /// Removes the task `id` and returns it.
    pub fn remove(&self, id: TaskId) -> EngineResult<Task> {
        let removed = self.commit(move |tasks| {
            let index = tasks
                .iter()
                .position(|task| task.id() == id)
                .ok_or(EngineError::NotFound(id))?;
            Ok(tasks.remove(index))
        })?;

        if self.is_sync_enabled() {
            let remote = self.remote.clone();
            spawn_remote(
                &self.runtime,
                &self.in_flight,
                RemoteOp::Delete,
                id,
                async move { remote.delete(id).await },
            );
        }
        Ok(removed)
    }

    /// Drops every task completed at call time; returns how many.
    ///
    /// Remote deletions are launched before returning but not awaited.
    pub fn clear_completed(&self) -> EngineResult<usize> {
        let cleared = self.commit(|tasks| {
            let cleared: Vec<TaskId> = tasks
                .iter()
                .filter(|task| task.is_completed())
                .map(Task::id)
                .collect();
            tasks.retain(|task| !task.is_completed());
            Ok(cleared)
        })?;

        debug!(
            "event=clear_completed module=sync status=ok count={}",
            cleared.len()
        );
        let count = cleared.len();
        if self.is_sync_enabled() && !cleared.is_empty() {
            spawn_bulk_delete(
                &self.runtime,
                &self.in_flight,
                self.remote.clone(),
                cleared,
            );
        }
        Ok(count)
    }

    /// One-shot fetch of the owner's remote collection.
    ///
    /// Empty while sync is disabled. Never touches the local list.
    pub async fn remote_snapshot(&self) -> RemoteResult<Vec<Task>> {
        if !self.is_sync_enabled() {
            return Ok(Vec::new());
        }
        let Some(owner_id) = self.remote.owner_id() else {
            return Ok(Vec::new());
        };
        self.remote.list_all(&owner_id).await
    }

    /// Waits up to `limit` for launched remote dispatches to finish.
    ///
    /// Returns `false` when some were still running at the deadline. Meant
    /// for short-lived processes about to exit; mutations never call it.
    pub async fn wait_for_dispatches(&self, limit: Duration) -> bool {
        let settled = tokio::time::timeout(limit, self.in_flight.wait_idle())
            .await
            .is_ok();
        if !settled {
            warn!(
                "event=remote_drain module=sync status=error reason=timeout pending={}",
                self.in_flight.pending()
            );
        }
        settled
    }

    /// Releases the remote connection. In-flight dispatches are not awaited.
    pub fn close(&self) {
        self.remote.close();
    }

    fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<Task>) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut state = self.lock_state();
        let mut next = state.tasks.clone();
        let outcome = mutate(&mut next)?;
        state.local.save(&next)?;
        state.tasks = next;
        Ok(outcome)
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
