//! Core domain logic for TaskSync.
//! Local-first task list with best-effort remote mirroring.

pub mod config;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{ConfigError, CoreConfig, RemoteSyncConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use service::task_service::{parse_due, ServiceError, ServiceResult, TaskService};
pub use store::{LocalStore, StoreError};
pub use sync::{EngineError, SyncEngine, SyncStatus};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
