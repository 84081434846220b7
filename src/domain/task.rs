//! Task domain model
//!
//! Tasks are owned by the task store. The graph engine only reads them:
//! `id`, `status` and `dependencies` drive the graph, while `priority` and
//! `created_at` feed the ready-set ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::TaskId;

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("Invalid priority {0}: expected 1-5")]
    InvalidPriority(u8),

    #[error("Unknown status '{0}': expected pending, in_progress, completed, blocked or cancelled")]
    UnknownStatus(String),
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// Returns true if this status satisfies dependents
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if the task will never be completed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskStatus::Cancelled)
    }

    /// Returns true if the task can still become ready (not completed, not cancelled)
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Returns the snake_case name used in storage and output
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(TaskError::UnknownStatus(other.to_string())),
        }
    }
}

/// Task priority, 1 (lowest) to 5 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(5);

    /// Creates a priority, rejecting values outside 1-5
    pub fn new(value: u8) -> Result<Self, TaskError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TaskError::InvalidPriority(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Priority {
    type Error = TaskError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("P{}", self.0))
    }
}

/// A task within a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the list
    pub id: TaskId,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// IDs of tasks this one depends on, in declaration order
    ///
    /// Raw input may contain duplicates or IDs of tasks that do not exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,

    #[serde(default)]
    pub priority: Priority,

    /// When the task was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// When the task was completed (if completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Task {
    /// Creates a new pending task with the given ID and title
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            priority: Priority::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            description: None,
        }
    }

    /// Sets the status (builder style)
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        if status.is_complete() {
            self.completed_at = Some(self.updated_at);
        }
        self
    }

    /// Sets the dependencies (builder style)
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Sets the priority (builder style)
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the creation timestamp (builder style)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the dependency IDs with duplicates removed, keeping first occurrence
    pub fn unique_dependencies(&self) -> Vec<&TaskId> {
        let mut seen = std::collections::HashSet::new();
        self.dependencies
            .iter()
            .filter(|dep| seen.insert(*dep))
            .collect()
    }

    /// Transitions to in_progress status
    pub fn start(&mut self) {
        if matches!(self.status, TaskStatus::Pending | TaskStatus::Blocked) {
            self.set_status(TaskStatus::InProgress);
        }
    }

    /// Transitions to completed status
    pub fn complete(&mut self) {
        if self.status.is_open() {
            self.set_status(TaskStatus::Completed);
        }
    }

    /// Marks the task as blocked (an explicit, user-set status)
    pub fn block(&mut self) {
        if self.status.is_open() {
            self.set_status(TaskStatus::Blocked);
        }
    }

    /// Transitions to cancelled status
    pub fn cancel(&mut self) {
        if self.status.is_open() {
            self.set_status(TaskStatus::Cancelled);
        }
    }

    /// Transitions a completed or cancelled task back to pending
    pub fn reopen(&mut self) {
        if !self.status.is_open() {
            self.set_status(TaskStatus::Pending);
        }
    }

    /// Replaces the dependency list
    pub fn set_dependencies(&mut self, dependencies: Vec<TaskId>) {
        self.dependencies = dependencies;
        self.updated_at = Utc::now();
    }

    fn set_status(&mut self, status: TaskStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        self.completed_at = status.is_complete().then_some(now);
    }
}
