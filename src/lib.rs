//! taskdeps - dependency-aware task lists
//!
//! Tasks in a list may depend on other tasks in the same list. The engine
//! derives a dependency graph from a task snapshot: cycles, depth,
//! readiness, block reasons, and validation of proposed dependency edits.
//! Storage and the CLI are thin adapters around it.

pub mod domain;
pub mod engine;
pub mod storage;
pub mod cli;

pub use domain::{DependencyGraph, ListId, Task, TaskId, TaskStatus, ValidationResult};
pub use engine::{
    build_dependency_graph, calculate_block_reason, get_ready_items, validate_dependencies,
};
