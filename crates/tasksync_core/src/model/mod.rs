//! Domain model for the task list.
//!
//! # Responsibility
//! - Define the record shared by the local file and remote documents.
//!
//! # Invariants
//! - Every task is identified by a stable, non-nil `TaskId`.
//! - Content changes refresh `updated_at`; identity never changes.

pub mod task;
