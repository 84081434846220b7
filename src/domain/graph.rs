//! Dependency graph for tasks
//!
//! Converts a flat task collection into an arena-indexed directed graph.
//! Uses petgraph for the arena; edge direction is `dependency -> dependent`,
//! meaning "the dependency must be completed before the dependent".
//!
//! The builder is lenient about data quality: duplicate dependency IDs are
//! collapsed, dangling references are recorded per node and never become
//! edges, and self-dependencies become self-loops. Only caller contract
//! violations (the same task ID twice in one collection) are errors.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use super::id::TaskId;
use super::task::{Task, TaskStatus};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Duplicate task ID in collection: {0}")]
    DuplicateTask(TaskId),
}

/// A node in the task graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: TaskId,
    pub status: TaskStatus,

    /// Existing dependencies, deduplicated, in declaration order
    pub dependencies: Vec<TaskId>,

    /// Tasks that depend on this one, in collection order
    pub dependents: Vec<TaskId>,

    /// Dependency IDs that reference no task in the collection
    pub missing: Vec<TaskId>,
}

/// The task-level input of a graph build
///
/// Lets callers substitute a task's dependencies without cloning the
/// collection (used to simulate a proposed change).
#[derive(Debug, Clone)]
pub(crate) struct NodeSpec<'a> {
    pub id: &'a TaskId,
    pub status: TaskStatus,
    pub dependencies: Vec<&'a TaskId>,
}

impl<'a> From<&'a Task> for NodeSpec<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: &task.id,
            status: task.status,
            dependencies: task.dependencies.iter().collect(),
        }
    }
}

/// A dependency graph for the tasks of one list
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Arena of nodes; edges point from dependency to dependent
    graph: DiGraph<GraphNode, ()>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    /// Builds a graph from a collection of tasks
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<Self, GraphError> {
        Self::from_specs(tasks.into_iter().map(NodeSpec::from).collect())
    }

    pub(crate) fn from_specs(specs: Vec<NodeSpec<'_>>) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(specs.len(), 0);
        let mut node_map = HashMap::with_capacity(specs.len());

        // First pass: add all nodes
        for spec in &specs {
            if node_map.contains_key(spec.id) {
                return Err(GraphError::DuplicateTask(spec.id.clone()));
            }
            let idx = graph.add_node(GraphNode {
                id: spec.id.clone(),
                status: spec.status,
                dependencies: Vec::new(),
                dependents: Vec::new(),
                missing: Vec::new(),
            });
            node_map.insert(spec.id.clone(), idx);
        }

        // Second pass: resolve dependencies and add edges
        for spec in &specs {
            let idx = node_map[spec.id];
            let mut seen = HashSet::new();
            let mut dependencies = Vec::new();
            let mut missing = Vec::new();

            for dep_id in spec.dependencies.iter().copied() {
                if !seen.insert(dep_id) {
                    continue;
                }
                match node_map.get(dep_id) {
                    Some(&dep_idx) => {
                        graph.add_edge(dep_idx, idx, ());
                        dependencies.push(dep_id.clone());
                    }
                    None => missing.push(dep_id.clone()),
                }
            }

            let node = &mut graph[idx];
            node.dependencies = dependencies;
            node.missing = missing;
        }

        // Third pass: inverse edges
        for idx in graph.node_indices() {
            let id = graph[idx].id.clone();
            let deps: Vec<NodeIndex> = graph[idx]
                .dependencies
                .iter()
                .filter_map(|dep_id| node_map.get(dep_id).copied())
                .collect();
            for dep_idx in deps {
                graph[dep_idx].dependents.push(id.clone());
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built task graph"
        );

        Ok(Self { graph, node_map })
    }

    /// Returns the node for a task ID
    pub fn node(&self, task_id: &TaskId) -> Option<&GraphNode> {
        self.node_map.get(task_id).map(|idx| &self.graph[*idx])
    }

    /// Iterates over nodes in collection order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Returns the direct dependencies of a task
    pub fn dependencies(&self, task_id: &TaskId) -> &[TaskId] {
        self.node(task_id)
            .map(|n| n.dependencies.as_slice())
            .unwrap_or_default()
    }

    /// Returns the direct dependents of a task (tasks that depend on it)
    pub fn dependents(&self, task_id: &TaskId) -> &[TaskId] {
        self.node(task_id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or_default()
    }

    /// Returns the IDs of tasks with no dependencies
    ///
    /// A task whose only dependencies are dangling is still a root: dangling
    /// references are not edges.
    pub fn roots(&self) -> Vec<TaskId> {
        self.nodes()
            .filter(|n| n.dependencies.is_empty())
            .map(|n| n.id.clone())
            .collect()
    }

    /// Returns the IDs of tasks nothing depends on
    pub fn leaves(&self) -> Vec<TaskId> {
        self.nodes()
            .filter(|n| n.dependents.is_empty())
            .map(|n| n.id.clone())
            .collect()
    }

    /// Returns `(task, missing dependency IDs)` for every task with dangling references
    pub fn dangling(&self) -> Vec<(TaskId, Vec<TaskId>)> {
        self.nodes()
            .filter(|n| !n.missing.is_empty())
            .map(|n| (n.id.clone(), n.missing.clone()))
            .collect()
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn index_of(&self, task_id: &TaskId) -> Option<NodeIndex> {
        self.node_map.get(task_id).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub(crate) fn arena(&self) -> &DiGraph<GraphNode, ()> {
        &self.graph
    }

    /// Dependency indices per node, in declaration order
    pub(crate) fn dependency_lists(&self) -> Vec<Vec<NodeIndex>> {
        self.adjacency(Direction::Incoming)
    }

    /// Dependent indices per node, in collection order
    pub(crate) fn dependent_lists(&self) -> Vec<Vec<NodeIndex>> {
        self.adjacency(Direction::Outgoing)
    }

    fn adjacency(&self, direction: Direction) -> Vec<Vec<NodeIndex>> {
        self.graph
            .node_weights()
            .map(|n| {
                let ids = match direction {
                    Direction::Incoming => &n.dependencies,
                    Direction::Outgoing => &n.dependents,
                };
                ids.iter()
                    .filter_map(|id| self.node_map.get(id).copied())
                    .collect()
            })
            .collect()
    }
}

/// Builds the dependency graph for a task collection
pub fn build_graph(tasks: &[Task]) -> Result<TaskGraph, GraphError> {
    TaskGraph::from_tasks(tasks)
}
