//! Durable local persistence of the task list.
//!
//! # Responsibility
//! - Keep the whole task list in one JSON document on local disk.
//! - Classify local failures into fatal (write path) and recoverable (read path).
//!
//! # Invariants
//! - Only `LocalStore` reads or writes the backing file.
//! - A successful `save` fully replaces prior content; there is no patching.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

mod local_store;

pub use local_store::LocalStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Fatal local persistence failures.
///
/// Read-side problems (missing, empty, undecodable file) are not represented
/// here; `LocalStore::load` recovers from them.
#[derive(Debug)]
pub enum StoreError {
    /// Storage directory could not be created at construction time.
    CreateDir { path: PathBuf, source: io::Error },
    /// Task list could not be encoded.
    Serialize(serde_json::Error),
    /// Temporary file could not be written or moved over the target.
    Write { path: PathBuf, source: io::Error },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => write!(
                f,
                "failed to create storage directory `{}`: {source}",
                path.display()
            ),
            Self::Serialize(err) => write!(f, "failed to encode task list: {err}"),
            Self::Write { path, source } => {
                write!(f, "failed to save tasks to `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Write { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}
