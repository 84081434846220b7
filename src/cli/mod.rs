//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting. Every command loads a
//! list snapshot through the storage layer and hands it to [`crate::engine`].
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Task | Work item management | `task add`, `task start`, `task done` |
//! | Deps | Dependency edits | `deps set`, `deps check` |
//! | Query | Derived graph queries | `graph`, `ready`, `blocked`, `why` |
//! | Cache | Graph cache upkeep | `cache clear`, `cache status` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default comes from `default_format` in the global config.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. `--verbose` (or `-v`) enables
//! debug output; `TASKDEPS_LOG` takes a full filter directive:
//! ```bash
//! TASKDEPS_LOG=taskdeps=trace taskdeps graph backlog
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

use anyhow::Result;

use crate::domain::{ListId, Task, TaskId};
use crate::storage::{GraphCache, Project};

mod app;
mod output;
mod task;
mod deps;
mod query;
mod cache_cmd;

pub use app::{run, Cli, Commands};
pub use output::Output;

/// Opens the current project and parses the list argument
fn open_list(list: &str) -> Result<(Project, ListId)> {
    let project = Project::open_current()?;
    let list: ListId = list.parse()?;
    Ok((project, list))
}

/// Parses a batch of task ID arguments
fn parse_ids(raw: &[String]) -> Result<Vec<TaskId>> {
    raw.iter()
        .map(|s| s.parse::<TaskId>().map_err(Into::into))
        .collect()
}

fn find_task<'a>(tasks: &'a [Task], id: &TaskId) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| &t.id == id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))
}

/// Drops the cached graph of a list after a write
fn invalidate_graph(project: &Project, list: &ListId) -> Result<()> {
    if let Some(cache) = project.graph_cache()? {
        cache.invalidate(list)?;
    }
    Ok(())
}
