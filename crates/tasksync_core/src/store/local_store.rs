//! Whole-file JSON persistence for the task list.
//!
//! # Responsibility
//! - Load the task list at startup, tolerating absent or damaged files.
//! - Save the full list on every committed mutation.
//!
//! # Invariants
//! - The storage directory exists once construction succeeds.
//! - `load` never returns two tasks with the same id.
//! - `save` goes through a sibling temp file + rename; readers never observe
//!   a partially written list.

use super::{StoreError, StoreResult};
use crate::model::task::Task;
use log::{debug, error, info};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// File-backed task list storage.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    dir: PathBuf,
}

impl LocalStore {
    /// Binds the store to `path`, creating its parent directory if absent.
    ///
    /// # Errors
    /// - `StoreError::CreateDir` when the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if let Err(source) = fs::create_dir_all(&dir) {
            error!(
                "event=local_open module=store status=error error_code=create_dir_failed dir={} error={}",
                dir.display(),
                source
            );
            return Err(StoreError::CreateDir { path: dir, source });
        }

        info!(
            "event=local_open module=store status=ok path={}",
            path.display()
        );
        Ok(Self { path, dir })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted task list.
    ///
    /// Never fails: a missing or blank file is an empty list, and an
    /// unreadable or undecodable file is logged and also read as empty.
    /// Records repeating an earlier id are logged and dropped; the first
    /// occurrence wins.
    pub fn load(&self) -> Vec<Task> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=local_load module=store status=skip reason=missing path={}",
                    self.path.display()
                );
                return Vec::new();
            }
            Err(err) => {
                error!(
                    "event=local_load module=store status=error error_code=read_failed path={} error={}",
                    self.path.display(),
                    err
                );
                return Vec::new();
            }
        };

        if raw.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                let tasks = self.drop_duplicate_ids(tasks);
                info!(
                    "event=local_load module=store status=ok count={}",
                    tasks.len()
                );
                tasks
            }
            Err(err) => {
                error!(
                    "event=local_load module=store status=error error_code=decode_failed path={} error={}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Replaces the backing file with `tasks`.
    ///
    /// # Errors
    /// - `StoreError::Serialize` when encoding fails.
    /// - `StoreError::Write` when the temp file cannot be written or renamed.
    pub fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let started_at = Instant::now();
        let bytes = serde_json::to_vec_pretty(tasks)?;

        if let Err(err) = self.replace_file(&bytes) {
            error!(
                "event=local_save module=store status=error duration_ms={} error_code=write_failed path={} error={}",
                started_at.elapsed().as_millis(),
                self.path.display(),
                err
            );
            return Err(StoreError::Write {
                path: self.path.clone(),
                source: err,
            });
        }

        debug!(
            "event=local_save module=store status=ok count={} duration_ms={}",
            tasks.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn drop_duplicate_ids(&self, tasks: Vec<Task>) -> Vec<Task> {
        let total = tasks.len();
        let mut seen = HashSet::with_capacity(total);
        let unique: Vec<Task> = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id()))
            .collect();

        if unique.len() < total {
            error!(
                "event=local_load module=store status=error error_code=duplicate_id path={} dropped={}",
                self.path.display(),
                total - unique.len()
            );
        }
        unique
    }

    fn replace_file(&self, bytes: &[u8]) -> io::Result<()> {
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}
