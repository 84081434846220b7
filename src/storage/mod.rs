//! # Storage Layer
//!
//! Persistence for task lists with git-friendly file formats. Nothing here
//! is part of the graph engine: the engine only ever sees a task snapshot
//! loaded through [`TaskRepository`].
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line), one file per list | `.taskdeps/lists/{list}.jsonl` |
//! | Config | TOML | `.taskdeps/config.toml` |
//! | Graph cache | SQLite (auto-regenerated) | `.taskdeps/.cache/graph.db` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] reads a whole list under a shared `fs2` lock, so one call
//!   always sees a consistent snapshot
//! - All rewrites are atomic (temp file + rename)
//! - Cached graphs are keyed by list revision (content hash) and dropped on
//!   every mutation
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a project
//! - [`TaskStore`] - Read/write lists as JSONL
//! - [`GraphCache`] - Cache port for derived graphs
//! - [`Config`] - Project and global configuration

use anyhow::Result;

use crate::domain::{ListId, Task};

mod jsonl;
mod config;
mod project;
mod cache;

pub use jsonl::{Revision, TaskStore, StoreError};
pub use config::{Config, ConfigError, OutputFormat, ProjectConfig};
pub use project::{Project, ProjectError};
pub use cache::{CacheError, GraphCache, MemoryGraphCache, SqliteGraphCache};

/// Persistence collaborator for task lists
pub trait TaskRepository {
    /// Loads every task of a list (empty if the list does not exist)
    fn load_tasks(&self, list: &ListId) -> Result<Vec<Task>>;

    /// Inserts or replaces a task
    fn save_task(&self, list: &ListId, task: &Task) -> Result<()>;
}
