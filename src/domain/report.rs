//! Derived dependency report
//!
//! [`DependencyGraph`] is the assembled, serializable view of one task list:
//! structure from the builder, cycles from the detector, and per-node depth
//! and readiness. It is rebuilt from the task snapshot on every call and
//! holds no state beyond that.

use serde::{Deserialize, Serialize};

use super::cycles::{find_cycles, Cycle};
use super::depth::compute_depths;
use super::graph::{GraphError, TaskGraph};
use super::id::TaskId;
use super::readiness::compute_readiness;
use super::task::{Task, TaskStatus};

/// Derived view of a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub id: TaskId,
    pub status: TaskStatus,
    pub dependencies: Vec<TaskId>,
    pub dependents: Vec<TaskId>,
    pub depth: usize,
    pub is_ready: bool,
    pub blocked_by: Vec<TaskId>,

    /// Dependency IDs that reference no task in the list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_dependencies: Vec<TaskId>,

    /// True if the node sits on a dependency cycle (its depth ignores cyclic edges)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_cycle: bool,
}

/// A task referencing dependencies that do not exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub task: TaskId,
    pub missing: Vec<TaskId>,
}

/// Derived dependency report for one task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    /// One node per task, in collection order
    pub nodes: Vec<DependencyNode>,
    pub roots: Vec<TaskId>,
    pub leaves: Vec<TaskId>,
    pub cycles: Vec<Cycle>,
    pub ready_items: Vec<TaskId>,
    pub blocked_items: Vec<TaskId>,

    /// Dependencies before dependents, cyclic edges ignored
    pub execution_order: Vec<TaskId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dangling: Vec<DanglingReference>,
}

impl DependencyGraph {
    /// Builds the full report for a task collection
    pub fn from_tasks(tasks: &[Task]) -> Result<Self, GraphError> {
        let graph = TaskGraph::from_tasks(tasks)?;
        Ok(Self::from_graph(&graph))
    }

    /// Assembles the report from an already built graph
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let cycles = find_cycles(graph);
        let depths = compute_depths(graph);
        let readiness = compute_readiness(graph);

        let nodes = graph
            .nodes()
            .zip(readiness.nodes)
            .enumerate()
            .map(|(index, (node, state))| DependencyNode {
                id: node.id.clone(),
                status: node.status,
                dependencies: node.dependencies.clone(),
                dependents: node.dependents.clone(),
                depth: depths.depth_at(index),
                is_ready: state.is_ready,
                blocked_by: state.blocked_by,
                missing_dependencies: node.missing.clone(),
                in_cycle: depths.in_cycle_at(index),
            })
            .collect();

        let dangling = graph
            .dangling()
            .into_iter()
            .map(|(task, missing)| DanglingReference { task, missing })
            .collect();

        Self {
            nodes,
            roots: graph.roots(),
            leaves: graph.leaves(),
            cycles,
            ready_items: readiness.ready_items,
            blocked_items: readiness.blocked_items,
            execution_order: depths.execution_order().to_vec(),
            dangling,
        }
    }

    /// Returns the node for a task ID
    pub fn node(&self, task_id: &TaskId) -> Option<&DependencyNode> {
        self.nodes.iter().find(|n| &n.id == task_id)
    }

    /// Returns true if any cycle was found
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Greatest node depth, 0 for an empty graph
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Groups task IDs by depth: level 0 first
    ///
    /// Tasks in one level do not depend on each other (ignoring cyclic
    /// edges), so each level can be worked on in parallel once the previous
    /// levels are done.
    pub fn levels(&self) -> Vec<Vec<TaskId>> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        let mut levels = vec![Vec::new(); self.max_depth() + 1];
        for node in &self.order_nodes() {
            levels[node.depth].push(node.id.clone());
        }
        levels
    }

    fn order_nodes(&self) -> Vec<&DependencyNode> {
        self.execution_order
            .iter()
            .filter_map(|id| self.node(id))
            .collect()
    }
}
