//! # Engine entry points
//!
//! The in-process interface adapters call. Each function takes the full
//! task snapshot of one list, recomputes everything from scratch and
//! performs no I/O.
//!
//! | Function | Used for |
//! |----------|----------|
//! | [`build_dependency_graph`] | "get dependency graph" reads |
//! | [`get_ready_items`] | "get ready tasks" reads |
//! | [`validate_dependencies`] | guarding "set task dependencies" writes |
//! | [`calculate_block_reason`] | single-task "why is this blocked" lookups |

use std::collections::HashMap;

use crate::domain::{
    validate, DependencyGraph, GraphError, TaskGraph, Task, TaskId, ValidateOptions,
    ValidationResult,
};

/// Builds the derived dependency report for a list
pub fn build_dependency_graph(tasks: &[Task]) -> Result<DependencyGraph, GraphError> {
    DependencyGraph::from_tasks(tasks)
}

/// Returns the ready tasks of a list in collection order
///
/// Callers sort with [`crate::domain::ready_order`] and apply their own limit.
pub fn get_ready_items(tasks: &[Task]) -> Result<Vec<&Task>, GraphError> {
    let graph = TaskGraph::from_tasks(tasks)?;
    let ready = crate::domain::compute_readiness(&graph).ready_items;
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();

    Ok(ready
        .iter()
        .filter_map(|id| by_id.get(id).copied())
        .collect())
}

/// Validates replacing a task's dependencies with `proposed`
pub fn validate_dependencies(
    task_id: &TaskId,
    proposed: &[TaskId],
    tasks: &[Task],
    options: ValidateOptions,
) -> Result<ValidationResult, GraphError> {
    validate(task_id, proposed, tasks, options)
}

/// Returns the dependencies currently blocking `task`
///
/// Same as the `blocked_by` field of the task's node: unmet dependencies
/// that exist in `tasks`, deduplicated. Empty for completed or cancelled
/// tasks. Dangling IDs are not included; see [`missing_dependencies`].
pub fn calculate_block_reason(task: &Task, tasks: &[Task]) -> Vec<TaskId> {
    if !task.status.is_open() {
        return Vec::new();
    }

    let statuses: HashMap<&TaskId, _> = tasks.iter().map(|t| (&t.id, t.status)).collect();
    task.unique_dependencies()
        .into_iter()
        .filter(|dep| {
            statuses
                .get(dep)
                .map(|s| !s.is_complete())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Returns the dependencies of `task` that reference no task in `tasks`
pub fn missing_dependencies(task: &Task, tasks: &[Task]) -> Vec<TaskId> {
    task.unique_dependencies()
        .into_iter()
        .filter(|dep| !tasks.iter().any(|t| &t.id == *dep))
        .cloned()
        .collect()
}
