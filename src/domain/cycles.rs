//! Cycle detection over dependency edges
//!
//! [`find_cycles`] walks the graph depth-first from every unvisited node,
//! keeping the current path on an explicit stack. An edge that reaches a node
//! already on the stack closes a cycle; the stack slice from that node to the
//! current one is reported. Every node is expanded once, so the walk is
//! O(V + E), and disjoint cycles are all reported.
//!
//! Cycles are listed in "depends on" order: `[a, b]` means `a` depends on
//! `b` and `b` depends on `a`.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::debug;

use super::graph::TaskGraph;
use super::id::TaskId;

/// A closed loop of dependency edges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cycle(Vec<TaskId>);

impl Cycle {
    pub fn new(ids: Vec<TaskId>) -> Self {
        Self(ids)
    }

    /// Task IDs in the loop, without repeating the first one
    pub fn ids(&self) -> &[TaskId] {
        &self.0
    }

    /// Number of distinct tasks in the loop
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.0.contains(task_id)
    }

    /// Returns true if a task depends on itself
    pub fn is_self_loop(&self) -> bool {
        self.0.len() == 1
    }

    /// Returns the same loop rotated to start at `task_id`
    ///
    /// Returns an unchanged copy when the task is not part of the loop.
    pub fn starting_at(&self, task_id: &TaskId) -> Cycle {
        match self.0.iter().position(|id| id == task_id) {
            Some(pos) => {
                let mut ids = self.0.clone();
                ids.rotate_left(pos);
                Cycle(ids)
            }
            None => self.clone(),
        }
    }
}

impl fmt::Display for Cycle {
    /// Formats as a closed path: `a -> b -> c -> a`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.0 {
            write!(f, "{} -> ", id)?;
        }
        match self.0.first() {
            Some(first) => write!(f, "{}", first),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnStack,
    Done,
}

/// Finds the dependency cycles of a graph
pub fn find_cycles(graph: &TaskGraph) -> Vec<Cycle> {
    let adjacency = graph.dependency_lists();
    let mut state = vec![Visit::Unvisited; adjacency.len()];
    let mut cycles = Vec::new();

    for root in 0..adjacency.len() {
        if state[root] != Visit::Unvisited {
            continue;
        }

        // (node, index of the next dependency to follow)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        state[root] = Visit::OnStack;

        while let Some(&(node, next)) = stack.last() {
            let Some(dep) = adjacency[node].get(next).map(|idx| idx.index()) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match state[dep] {
                Visit::Unvisited => {
                    state[dep] = Visit::OnStack;
                    stack.push((dep, 0));
                }
                Visit::OnStack => {
                    if let Some(start) = stack.iter().position(|(n, _)| *n == dep) {
                        let ids = stack[start..]
                            .iter()
                            .map(|(n, _)| graph.node_at(NodeIndex::new(*n)).id.clone())
                            .collect();
                        cycles.push(Cycle(ids));
                    }
                }
                Visit::Done => {}
            }
        }
    }

    if !cycles.is_empty() {
        debug!(count = cycles.len(), "Found dependency cycles");
    }

    cycles
}

/// Finds a shortest chain of dependency edges from `from` to `to`
///
/// The result starts with `from` and ends with `to`. Returns `None` when
/// either task is unknown or `to` is not reachable.
pub fn find_path(graph: &TaskGraph, from: &TaskId, to: &TaskId) -> Option<Vec<TaskId>> {
    let start = graph.index_of(from)?;
    let target = graph.index_of(to)?;

    if start == target {
        return Some(vec![from.clone()]);
    }

    let adjacency = graph.dependency_lists();
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut seen = HashSet::from([start]);

    while let Some(node) = queue.pop_front() {
        for &dep in &adjacency[node.index()] {
            if !seen.insert(dep) {
                continue;
            }
            parent.insert(dep, node);

            if dep == target {
                let mut path = vec![dep];
                let mut current = dep;
                while let Some(&prev) = parent.get(&current) {
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return Some(
                    path.into_iter()
                        .map(|idx| graph.node_at(idx).id.clone())
                        .collect(),
                );
            }
            queue.push_back(dep);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::Task;

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn task(s: &str, deps: &[&str]) -> Task {
        Task::new(id(s), s).with_dependencies(deps.iter().map(|d| id(d)))
    }

    fn cycles_of(tasks: &[Task]) -> Vec<Cycle> {
        find_cycles(&TaskGraph::from_tasks(tasks).unwrap())
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["a", "b"])];
        assert!(cycles_of(&tasks).is_empty());
    }

    #[test]
    fn two_node_cycle_reported_once() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let cycles = cycles_of(&tasks);

        assert_eq!(cycles.len(), 1);
        let members: HashSet<&TaskId> = cycles[0].ids().iter().collect();
        assert_eq!(members, HashSet::from([&id("a"), &id("b")]));
    }

    #[test]
    fn self_loop_is_single_node_cycle() {
        let tasks = vec![task("a", &["a"]), task("b", &["a"])];
        let cycles = cycles_of(&tasks);

        assert_eq!(cycles, vec![Cycle::new(vec![id("a")])]);
        assert!(cycles[0].is_self_loop());
    }

    #[test]
    fn disjoint_cycles_all_reported() {
        let tasks = vec![
            task("a", &["b"]),
            task("b", &["a"]),
            task("c", &["d"]),
            task("d", &["e"]),
            task("e", &["c"]),
            task("f", &["a", "c"]),
        ];
        let cycles = cycles_of(&tasks);

        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().any(|c| c.len() == 2 && c.contains(&id("a"))));
        assert!(cycles.iter().any(|c| c.len() == 3 && c.contains(&id("e"))));
        assert!(cycles.iter().all(|c| !c.contains(&id("f"))));
    }

    #[test]
    fn cycle_follows_depends_on_order() {
        // a depends on c, c on b, b on a
        let tasks = vec![task("a", &["c"]), task("b", &["a"]), task("c", &["b"])];
        let cycles = cycles_of(&tasks);

        assert_eq!(cycles, vec![Cycle::new(vec![id("a"), id("c"), id("b")])]);
        assert_eq!(cycles[0].to_string(), "a -> c -> b -> a");
    }

    #[test]
    fn dangling_references_never_form_cycles() {
        let tasks = vec![task("a", &["ghost"]), task("b", &["a", "ghost"])];
        assert!(cycles_of(&tasks).is_empty());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut tasks = vec![task("n0", &[])];
        for i in 1..5000 {
            tasks.push(task(&format!("n{}", i), &[&format!("n{}", i - 1)]));
        }
        assert!(cycles_of(&tasks).is_empty());
    }

    #[test]
    fn rotation_and_display() {
        let cycle = Cycle::new(vec![id("a"), id("b"), id("c")]);
        let rotated = cycle.starting_at(&id("b"));

        assert_eq!(rotated.ids(), &[id("b"), id("c"), id("a")]);
        assert_eq!(rotated.to_string(), "b -> c -> a -> b");
        assert_eq!(cycle.starting_at(&id("zzz")), cycle);
        assert_eq!(Cycle::new(vec![id("a")]).to_string(), "a -> a");
    }

    #[test]
    fn path_follows_dependency_edges() {
        let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])];
        let graph = TaskGraph::from_tasks(&tasks).unwrap();

        assert_eq!(
            find_path(&graph, &id("c"), &id("a")),
            Some(vec![id("c"), id("b"), id("a")])
        );
        assert_eq!(find_path(&graph, &id("a"), &id("c")), None);
        assert_eq!(find_path(&graph, &id("a"), &id("ghost")), None);
        assert_eq!(find_path(&graph, &id("b"), &id("b")), Some(vec![id("b")]));
    }

    #[test]
    fn path_prefers_shortest_route() {
        let tasks = vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["b"]),
            task("d", &["c", "a"]),
        ];
        let graph = TaskGraph::from_tasks(&tasks).unwrap();

        assert_eq!(
            find_path(&graph, &id("d"), &id("a")),
            Some(vec![id("d"), id("a")])
        );
    }
}
