//! Depth and execution order
//!
//! Depth is the length of the longest dependency chain leading into a node.
//! Edges that take part in a cycle (edges inside one strongly connected
//! component, and self-loops) are ignored, which leaves a DAG. A single Kahn
//! pass over that DAG yields both the depths and an execution order, so the
//! computation terminates for every input. Nodes that sit on a cycle are
//! flagged instead of being silently assigned depth 0.

use petgraph::algo::tarjan_scc;
use petgraph::visit::EdgeRef;
use std::collections::VecDeque;

use super::graph::TaskGraph;
use super::id::TaskId;

/// Depth information for every node of a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Depths {
    depth: Vec<usize>,
    in_cycle: Vec<bool>,
    order: Vec<TaskId>,
}

impl Depths {
    /// Depth of a node by position in the graph
    pub(crate) fn depth_at(&self, index: usize) -> usize {
        self.depth.get(index).copied().unwrap_or(0)
    }

    /// Whether a node sits on a cycle, by position in the graph
    pub(crate) fn in_cycle_at(&self, index: usize) -> bool {
        self.in_cycle.get(index).copied().unwrap_or(false)
    }

    /// Task IDs with dependencies before dependents (cyclic edges ignored)
    pub fn execution_order(&self) -> &[TaskId] {
        &self.order
    }

    /// Greatest depth in the graph, or `None` for an empty graph
    pub fn max_depth(&self) -> Option<usize> {
        self.depth.iter().copied().max()
    }
}

/// Computes depth and execution order for every node
pub fn compute_depths(graph: &TaskGraph) -> Depths {
    let arena = graph.arena();
    let n = arena.node_count();

    // Component id per node; a component is cyclic if it has more than one
    // member or a self-loop.
    let mut component = vec![0usize; n];
    let mut in_cycle = vec![false; n];
    for (comp_id, members) in tarjan_scc(arena).into_iter().enumerate() {
        let cyclic = members.len() > 1;
        for idx in members {
            component[idx.index()] = comp_id;
            in_cycle[idx.index()] = cyclic;
        }
    }

    let mut indegree = vec![0usize; n];
    for edge in arena.edge_references() {
        let (from, to) = (edge.source().index(), edge.target().index());
        if from == to {
            in_cycle[from] = true;
        } else if component[from] != component[to] {
            indegree[to] += 1;
        }
    }

    let dependents = graph.dependent_lists();
    let mut depth = vec![0usize; n];
    let mut order = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();

    while let Some(node) = queue.pop_front() {
        order.push(graph.node_at(petgraph::graph::NodeIndex::new(node)).id.clone());

        for dependent in &dependents[node] {
            let next = dependent.index();
            if next == node || component[next] == component[node] {
                continue;
            }
            depth[next] = depth[next].max(depth[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    Depths {
        depth,
        in_cycle,
        order,
    }
}
