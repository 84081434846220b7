//! Domain models and the dependency graph engine
//!
//! Contains the core business logic without any I/O concerns. Every
//! function here is a pure computation over a task snapshot.

mod id;
mod task;
mod graph;
mod cycles;
mod depth;
mod readiness;
mod validate;
mod report;

pub use id::{IdError, ListId, TaskId, MAX_LIST_ID_LEN};
pub use task::{Priority, Task, TaskError, TaskStatus};
pub use graph::{build_graph, GraphError, GraphNode, TaskGraph};
pub use cycles::{find_cycles, find_path, Cycle};
pub use depth::{compute_depths, Depths};
pub use readiness::{compute_readiness, node_readiness, ready_order, sort_ready, NodeReadiness, Readiness};
pub use validate::{validate, DependencyError, DependencyWarning, ValidateOptions, ValidationResult};
pub use report::{DanglingReference, DependencyGraph, DependencyNode};
