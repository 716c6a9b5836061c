//! Use-case services exposed to outer layers (HTTP, CLI).
//!
//! # Responsibility
//! - Validate raw caller input before it reaches the engine.
//! - Map engine outcomes onto caller-facing error categories.

pub mod task_service;
