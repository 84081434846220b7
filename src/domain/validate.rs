//! Validation of proposed dependency changes
//!
//! [`validate`] answers "may task X depend on exactly these tasks?" without
//! mutating anything. The caller commits the change only when the result is
//! valid. Business-rule violations are returned as data; only malformed input
//! (duplicate task IDs in the collection) is an `Err`.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use super::cycles::{find_path, Cycle};
use super::graph::{GraphError, NodeSpec, TaskGraph};
use super::id::TaskId;
use super::task::{Task, TaskStatus};

/// A problem that makes a proposed dependency set invalid
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DependencyError {
    #[error("Task {task} cannot depend on itself")]
    SelfDependency { task: TaskId },

    #[error("Dependency task not found: {task}")]
    UnknownTask { task: TaskId },

    #[error("Circular dependency: {cycle}")]
    Circular { cycle: Cycle },
}

/// A non-fatal concern about a proposed dependency set
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DependencyWarning {
    #[error("Dependency {task} is listed more than once")]
    Duplicate { task: TaskId },

    #[error("Dependency {task} is cancelled and will never complete")]
    CancelledDependency { task: TaskId },

    #[error("{count} dependencies exceed the soft limit of {limit}")]
    SoftLimitExceeded { count: usize, limit: usize },
}

/// Caller-supplied validation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Warn when a task would have more dependencies than this
    pub soft_limit: Option<usize>,
}

/// Outcome of validating a proposed dependency set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<DependencyError>,
    pub warnings: Vec<DependencyWarning>,

    /// Cycles the change would close, each starting at the validated task
    pub circular_dependencies: Vec<Cycle>,
}

impl ValidationResult {
    /// User-facing messages for errors then warnings
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.warnings.iter().map(|w| format!("warning: {}", w)))
            .collect()
    }
}

/// Validates replacing `task_id`'s dependencies with `proposed`
///
/// `task_id` does not have to exist in `tasks`; a task that is about to be
/// created is simulated as a new pending node.
pub fn validate(
    task_id: &TaskId,
    proposed: &[TaskId],
    tasks: &[Task],
    options: ValidateOptions,
) -> Result<ValidationResult, GraphError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Dedupe, reporting each repeated ID once
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut unique: Vec<&TaskId> = Vec::new();
    for dep in proposed {
        if seen.insert(dep) {
            unique.push(dep);
        } else if reported.insert(dep) {
            warnings.push(DependencyWarning::Duplicate { task: dep.clone() });
        }
    }

    let mut linkable: Vec<&TaskId> = Vec::new();
    for dep in unique.iter().copied() {
        if dep == task_id {
            errors.push(DependencyError::SelfDependency { task: dep.clone() });
            continue;
        }
        match tasks.iter().find(|t| &t.id == dep) {
            None => errors.push(DependencyError::UnknownTask { task: dep.clone() }),
            Some(t) => {
                if t.status.is_cancelled() {
                    warnings.push(DependencyWarning::CancelledDependency { task: dep.clone() });
                }
                linkable.push(dep);
            }
        }
    }

    if let Some(limit) = options.soft_limit {
        if unique.len() > limit {
            warnings.push(DependencyWarning::SoftLimitExceeded {
                count: unique.len(),
                limit,
            });
        }
    }

    // Simulate the change: the task's current edges are replaced by the
    // proposed ones, everything else stays as persisted.
    let mut specs: Vec<NodeSpec<'_>> = Vec::with_capacity(tasks.len() + 1);
    let mut present = false;
    for task in tasks {
        let mut spec = NodeSpec::from(task);
        if &task.id == task_id {
            spec.dependencies = linkable.clone();
            present = true;
        }
        specs.push(spec);
    }
    if !present {
        specs.push(NodeSpec {
            id: task_id,
            status: TaskStatus::Pending,
            dependencies: linkable.clone(),
        });
    }
    let graph = TaskGraph::from_specs(specs)?;

    // A proposed edge closes a cycle iff the dependency already reaches
    // back to the task through existing edges.
    let mut circular_dependencies: Vec<Cycle> = Vec::new();
    for dep in linkable {
        if let Some(path) = find_path(&graph, dep, task_id) {
            let mut ids = Vec::with_capacity(path.len());
            ids.push(task_id.clone());
            ids.extend(path.into_iter().filter(|id| id != task_id));
            let cycle = Cycle::new(ids);
            if !circular_dependencies.contains(&cycle) {
                errors.push(DependencyError::Circular {
                    cycle: cycle.clone(),
                });
                circular_dependencies.push(cycle);
            }
        }
    }

    debug!(
        task = %task_id,
        proposed = proposed.len(),
        errors = errors.len(),
        warnings = warnings.len(),
        "Validated dependencies"
    );

    Ok(ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        circular_dependencies,
    })
}
