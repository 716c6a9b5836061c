//! Local-first orchestration of the task list.
//!
//! # Responsibility
//! - Own the authoritative in-memory task list.
//! - Write every mutation through to `LocalStore` before returning.
//! - Mirror mutations to `RemoteStore` in the background when sync is on.
//!
//! # Invariants
//! - Only local write failures fail a mutation.
//! - Remote work is launched, never awaited, by mutating calls.
//! - Sync moves Disabled -> Enabled once and never back.

use crate::model::task::TaskId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod dispatch;
pub mod engine;

pub use engine::SyncEngine;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by mutating engine calls.
#[derive(Debug)]
pub enum EngineError {
    /// Local persistence failed; memory and file keep the previous state.
    Store(StoreError),
    NotFound(TaskId),
    DuplicateId(TaskId),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::DuplicateId(id) => write!(f, "task already exists: {id}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateId(_) => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Where mutations currently end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Sync enabled and the remote store is connected.
    Remote,
    /// Local file only.
    Local,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
