//! Readiness and blocking
//!
//! Only open tasks (not completed, not cancelled) are candidates. A candidate
//! is ready when every dependency in the graph is completed and it has no
//! dangling references. `blocked_by` lists the unmet dependencies that exist
//! in the graph; dangling IDs are reported separately as missing because no
//! status change can satisfy them.

use std::cmp::Ordering;

use super::graph::{GraphNode, TaskGraph};
use super::id::TaskId;
use super::task::Task;

/// Readiness of a single node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeReadiness {
    pub is_ready: bool,
    pub blocked_by: Vec<TaskId>,
}

/// Ready/blocked partition of a graph's open tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    pub ready_items: Vec<TaskId>,
    pub blocked_items: Vec<TaskId>,

    /// Per-node readiness, in graph order
    pub nodes: Vec<NodeReadiness>,
}

/// Computes the readiness of one node
pub fn node_readiness(graph: &TaskGraph, node: &GraphNode) -> NodeReadiness {
    if !node.status.is_open() {
        return NodeReadiness::default();
    }

    let blocked_by: Vec<TaskId> = node
        .dependencies
        .iter()
        .filter(|dep_id| {
            graph
                .node(dep_id)
                .map(|dep| !dep.status.is_complete())
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    NodeReadiness {
        is_ready: blocked_by.is_empty() && node.missing.is_empty(),
        blocked_by,
    }
}

/// Partitions the open tasks of a graph into ready and blocked
pub fn compute_readiness(graph: &TaskGraph) -> Readiness {
    let mut readiness = Readiness::default();

    for node in graph.nodes() {
        let state = node_readiness(graph, node);
        if node.status.is_open() {
            if state.is_ready {
                readiness.ready_items.push(node.id.clone());
            } else {
                readiness.blocked_items.push(node.id.clone());
            }
        }
        readiness.nodes.push(state);
    }

    readiness
}

/// Presentation order for ready tasks
///
/// Higher priority first, then oldest first. The task ID breaks remaining
/// ties so the order is total.
pub fn ready_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts tasks with [`ready_order`]
pub fn sort_ready(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| ready_order(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Priority, TaskStatus};
    use chrono::{TimeZone, Utc};

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn task(s: &str, deps: &[&str], status: TaskStatus) -> Task {
        Task::new(id(s), s)
            .with_dependencies(deps.iter().map(|d| id(d)))
            .with_status(status)
    }

    fn readiness_of(tasks: &[Task]) -> Readiness {
        compute_readiness(&TaskGraph::from_tasks(tasks).unwrap())
    }

    #[test]
    fn ready_set_example() {
        let tasks = vec![
            task("a", &[], TaskStatus::Completed),
            task("b", &["a"], TaskStatus::Pending),
            task("c", &["b"], TaskStatus::Pending),
            task("d", &[], TaskStatus::Pending),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.ready_items, vec![id("b"), id("d")]);
        assert_eq!(readiness.blocked_items, vec![id("c")]);
        assert_eq!(readiness.nodes[2].blocked_by, vec![id("b")]);
    }

    #[test]
    fn closed_tasks_are_neither_ready_nor_blocked() {
        let tasks = vec![
            task("a", &[], TaskStatus::Completed),
            task("b", &["x"], TaskStatus::Cancelled),
            task("x", &[], TaskStatus::Pending),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.ready_items, vec![id("x")]);
        assert!(readiness.blocked_items.is_empty());
        assert_eq!(readiness.nodes[1], NodeReadiness::default());
    }

    #[test]
    fn in_progress_and_blocked_status_are_candidates() {
        let tasks = vec![
            task("a", &[], TaskStatus::Completed),
            task("b", &["a"], TaskStatus::InProgress),
            task("c", &["a"], TaskStatus::Blocked),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.ready_items, vec![id("b"), id("c")]);
    }

    #[test]
    fn cancelled_dependency_blocks_forever() {
        let tasks = vec![
            task("a", &[], TaskStatus::Cancelled),
            task("b", &["a"], TaskStatus::Pending),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.blocked_items, vec![id("b")]);
        assert_eq!(readiness.nodes[1].blocked_by, vec![id("a")]);
    }

    #[test]
    fn dangling_dependency_blocks_without_reason() {
        let tasks = vec![
            task("a", &[], TaskStatus::Completed),
            task("b", &["a", "ghost"], TaskStatus::Pending),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.blocked_items, vec![id("b")]);
        assert!(!readiness.nodes[1].is_ready);
        assert!(readiness.nodes[1].blocked_by.is_empty());
    }

    #[test]
    fn self_dependency_blocks_itself() {
        let tasks = vec![task("a", &["a"], TaskStatus::Pending)];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.blocked_items, vec![id("a")]);
        assert_eq!(readiness.nodes[0].blocked_by, vec![id("a")]);
    }

    #[test]
    fn blocked_by_lists_every_unmet_dependency_once() {
        let tasks = vec![
            task("a", &[], TaskStatus::Pending),
            task("b", &[], TaskStatus::Completed),
            task("c", &[], TaskStatus::InProgress),
            task("d", &["a", "b", "c", "a"], TaskStatus::Pending),
        ];
        let readiness = readiness_of(&tasks);

        assert_eq!(readiness.nodes[3].blocked_by, vec![id("a"), id("c")]);
    }

    #[test]
    fn ready_order_priority_then_age() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let low_old = Task::new(id("low-old"), "")
            .with_priority(Priority::new(1).unwrap())
            .with_created_at(t0);
        let high_new = Task::new(id("high-new"), "")
            .with_priority(Priority::new(5).unwrap())
            .with_created_at(t1);
        let high_old = Task::new(id("high-old"), "")
            .with_priority(Priority::new(5).unwrap())
            .with_created_at(t0);

        let mut tasks = vec![&low_old, &high_new, &high_old];
        sort_ready(&mut tasks);

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high-old", "high-new", "low-old"]);
    }

    #[test]
    fn ready_order_is_total() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = Task::new(id("a"), "").with_created_at(t0);
        let b = Task::new(id("b"), "").with_created_at(t0);

        assert_eq!(ready_order(&a, &b), Ordering::Less);
        assert_eq!(ready_order(&b, &a), Ordering::Greater);
        assert_eq!(ready_order(&a, &a), Ordering::Equal);
    }
}
