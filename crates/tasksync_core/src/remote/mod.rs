//! Remote mirror of a user's task list.
//!
//! # Responsibility
//! - Abstract a keyed, per-owner collection of task documents.
//! - Keep every remote concern (credentials, transport, codec) out of the
//!   local write path.
//!
//! # Invariants
//! - One document per task, keyed by task id, under the owner's collection.
//! - Remote failures are reported as `RemoteError` values and never panic.
//!
//! # See also
//! - `sync::engine` for the fire-and-forget dispatch boundary.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod http;
pub mod memory;
mod store;

pub use http::{HttpBackend, HttpConnector, RemoteCredentials};
pub use memory::{InMemoryBackend, InMemoryConnector};
pub use store::RemoteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// A task encoded as a remote document.
pub type Document = Map<String, Value>;

/// Remote-side failures. Never fatal for a local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Credentials locator could not be read or is malformed.
    Credentials(String),
    /// Request could not be sent or the response could not be read.
    Transport(String),
    /// Backend answered with a non-success status.
    Status { code: u16, body: String },
    /// Document could not be encoded or decoded.
    Codec(String),
    /// Backend-specific failure.
    Backend(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credentials(message) => write!(f, "invalid remote credentials: {message}"),
            Self::Transport(message) => write!(f, "remote transport failed: {message}"),
            Self::Status { code, body } => write!(f, "remote returned status {code}: {body}"),
            Self::Codec(message) => write!(f, "remote document codec failed: {message}"),
            Self::Backend(message) => write!(f, "remote backend failed: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// How a document write treats fields already stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite the whole document.
    Replace,
    /// Overwrite only the fields present in the write.
    Merge,
}

/// Transport for one remote document collection family.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Short backend label used in log events.
    fn backend_id(&self) -> &str;

    async fn put_document(
        &self,
        owner_id: &str,
        doc_id: &str,
        document: Document,
        mode: WriteMode,
    ) -> RemoteResult<()>;

    /// Deleting an absent document succeeds.
    async fn delete_document(&self, owner_id: &str, doc_id: &str) -> RemoteResult<()>;

    /// Every document stored under `owner_id`, in no particular order.
    async fn list_documents(&self, owner_id: &str) -> RemoteResult<Vec<Document>>;

    /// Releases held connections.
    fn close(&self) -> RemoteResult<()> {
        Ok(())
    }
}

/// Turns a credentials locator into a connected backend.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, credentials: &str) -> RemoteResult<Arc<dyn DocumentBackend>>;
}
