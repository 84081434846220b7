//! Dependency CLI commands
//!
//! Every write goes through the dependency validator first. Errors abort the
//! write; warnings are printed and the write goes ahead.

use anyhow::Result;
use clap::Subcommand;
use tracing::debug;

use super::output::Output;
use super::task::dedupe;
use super::{invalidate_graph, open_list, parse_ids};
use crate::domain::{TaskId, ValidationResult};
use crate::engine::validate_dependencies;

#[derive(Subcommand)]
pub enum DepsCommands {
    /// Replace a task's dependencies
    ///
    /// Pass no dependencies to clear them.
    Set {
        /// List ID
        list: String,

        /// Task ID
        id: String,

        /// Tasks that must be completed first
        deps: Vec<String>,
    },

    /// Check a dependency set without saving it
    ///
    /// The task does not need to exist yet.
    Check {
        /// List ID
        list: String,

        /// Task ID
        id: String,

        /// Proposed dependencies
        deps: Vec<String>,
    },
}

pub fn run(cmd: DepsCommands, output: &Output) -> Result<()> {
    match cmd {
        DepsCommands::Set { list, id, deps } => set_deps(output, &list, &id, &deps),
        DepsCommands::Check { list, id, deps } => check_deps(output, &list, &id, &deps),
    }
}

/// Prints warnings and fails if the result has errors
pub(super) fn enforce(output: &Output, result: &ValidationResult) -> Result<()> {
    for warning in &result.warnings {
        output.warning(&warning.to_string());
    }

    if !result.is_valid {
        let errors: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid dependencies:\n  {}", errors.join("\n  "));
    }

    Ok(())
}

fn set_deps(output: &Output, list_str: &str, id_str: &str, raw: &[String]) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let store = project.task_store();
    let options = project.config().project.validate_options();

    let id: TaskId = id_str.parse()?;
    let proposed = parse_ids(raw)?;

    // Validate and write under one list lock
    let (task, result) = store.modify(&list, |tasks| {
        let pos = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

        let result = validate_dependencies(&id, &proposed, &tasks[..], options)?;
        enforce(output, &result)?;

        tasks[pos].set_dependencies(dedupe(&proposed));
        Ok((tasks[pos].clone(), result))
    })?;
    invalidate_graph(&project, &list)?;
    debug!(list = %list, task = %id, count = task.dependencies.len(), "Updated dependencies");

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "dependencies": task.dependencies,
            "warnings": result.warnings,
        }));
    } else if task.dependencies.is_empty() {
        output.success(&format!("{} has no dependencies", task.id));
    } else {
        let deps: Vec<&str> = task.dependencies.iter().map(TaskId::as_str).collect();
        output.success(&format!("{} now depends on {}", task.id, deps.join(", ")));
    }

    Ok(())
}

fn check_deps(output: &Output, list_str: &str, id_str: &str, raw: &[String]) -> Result<()> {
    let (project, list) = open_list(list_str)?;

    let id: TaskId = id_str.parse()?;
    let proposed = parse_ids(raw)?;
    let tasks = project.task_store().read_list(&list)?;

    let result = validate_dependencies(
        &id,
        &proposed,
        &tasks,
        project.config().project.validate_options(),
    )?;

    if output.is_json() {
        output.data(&result);
    } else {
        if result.is_valid {
            println!("Dependencies for {} are valid", id);
        } else {
            println!("Dependencies for {} are invalid", id);
        }
        for message in result.messages() {
            println!("  {}", message);
        }
    }

    if !result.is_valid {
        anyhow::bail!("{} validation error(s)", result.errors.len());
    }

    Ok(())
}
