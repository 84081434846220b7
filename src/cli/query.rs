//! Query commands (graph, ready, blocked, why)
//!
//! `graph` goes through the SQLite graph cache, keyed by the list revision.
//! The other queries need task fields the report does not carry and read
//! the list directly.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::output::Output;
use super::{find_task, open_list};
use crate::domain::{sort_ready, DependencyGraph, ListId, Task, TaskId};
use crate::engine::{
    build_dependency_graph, calculate_block_reason, get_ready_items, missing_dependencies,
};
use crate::storage::{GraphCache, Project};

/// Show the derived dependency graph of a list
pub fn graph(output: &Output, list_str: &str) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let report = load_graph(&project, &list)?;

    print_graph(output, &report);
    Ok(())
}

/// Show the dependency graph of a task snapshot file
pub fn graph_file(output: &Output, path: &Path) -> Result<()> {
    let tasks = read_snapshot(path)?;
    debug!(path = %path.display(), tasks = tasks.len(), "Loaded snapshot");

    let report = build_dependency_graph(&tasks)?;
    print_graph(output, &report);
    Ok(())
}

/// Show tasks ready to work on, best first
pub fn ready(output: &Output, list_str: &str, limit: Option<usize>) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let tasks = project.task_store().read_list(&list)?;

    let mut ready_tasks = get_ready_items(&tasks)?;
    sort_ready(&mut ready_tasks);

    let total = ready_tasks.len();
    let limit = limit.unwrap_or(project.config().project.ready.default_limit);
    ready_tasks.truncate(limit);
    debug!(list = %list, total, shown = ready_tasks.len(), "Ready query");

    if output.is_json() {
        output.data(&ready_tasks);
    } else if ready_tasks.is_empty() {
        println!("No tasks ready to work on.");
    } else {
        println!("Ready tasks ({}):", total);
        println!("{:<12} {:<4} TITLE", "ID", "PRI");
        println!("{}", "-".repeat(60));
        for task in &ready_tasks {
            println!("{:<12} {:<4} {}", task.id, task.priority, task.title);
        }
        if total > ready_tasks.len() {
            println!("... and {} more (use --limit)", total - ready_tasks.len());
        }
    }

    Ok(())
}

/// Show blocked tasks and what blocks them
pub fn blocked(output: &Output, list_str: &str) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let tasks = project.task_store().read_list(&list)?;
    let report = build_dependency_graph(&tasks)?;

    let rows: Vec<(&Task, Vec<TaskId>, Vec<TaskId>)> = report
        .blocked_items
        .iter()
        .filter_map(|id| {
            let task = tasks.iter().find(|t| &t.id == id)?;
            let node = report.node(id)?;
            Some((task, node.blocked_by.clone(), node.missing_dependencies.clone()))
        })
        .collect();

    if output.is_json() {
        let items: Vec<_> = rows
            .iter()
            .map(|(task, blocked_by, missing)| {
                serde_json::json!({
                    "id": task.id,
                    "title": task.title,
                    "blockedBy": blocked_by,
                    "missingDependencies": missing,
                })
            })
            .collect();
        output.data(&items);
    } else if rows.is_empty() {
        println!("No blocked tasks.");
    } else {
        println!("Blocked tasks ({}):", rows.len());
        println!("{:<12} {:<30} BLOCKED BY", "ID", "TITLE");
        println!("{}", "-".repeat(80));
        for (task, blocked_by, missing) in &rows {
            let mut reasons: Vec<String> = blocked_by.iter().map(ToString::to_string).collect();
            reasons.extend(missing.iter().map(|m| format!("{} (missing)", m)));
            println!("{:<12} {:<30} {}", task.id, task.title, reasons.join(", "));
        }
    }

    Ok(())
}

/// Explain what blocks a single task
pub fn why(output: &Output, list_str: &str, id_str: &str) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let tasks = project.task_store().read_list(&list)?;

    let id: TaskId = id_str.parse()?;
    let task = find_task(&tasks, &id)?;

    let blocked_by = calculate_block_reason(task, &tasks);
    let missing = missing_dependencies(task, &tasks);
    let report = build_dependency_graph(&tasks)?;
    let cycles: Vec<_> = report
        .cycles
        .iter()
        .filter(|c| c.contains(&id))
        .map(|c| c.starting_at(&id))
        .collect();

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "status": task.status,
            "isReady": task.status.is_open() && blocked_by.is_empty() && missing.is_empty(),
            "blockedBy": blocked_by,
            "missingDependencies": missing,
            "cycles": cycles,
        }));
        return Ok(());
    }

    if !task.status.is_open() {
        println!("{} is {}; nothing blocks it.", task.id, task.status);
        return Ok(());
    }

    if blocked_by.is_empty() && missing.is_empty() {
        println!("{} is ready to work on.", task.id);
        return Ok(());
    }

    println!("{} is waiting on:", task.id);
    for dep in &blocked_by {
        if let Some(dep_task) = tasks.iter().find(|t| &t.id == dep) {
            println!("  {} ({}) {}", dep, dep_task.status, dep_task.title);
        }
    }
    for dep in &missing {
        println!("  {} (missing: no such task in {})", dep, list);
    }
    for cycle in &cycles {
        if cycle.is_self_loop() {
            println!("\n{} depends on itself", task.id);
        } else {
            println!("\nCircular dependency: {}", cycle);
        }
    }

    Ok(())
}

/// Returns the derived graph of a list, using the cache when possible
fn load_graph(project: &Project, list: &ListId) -> Result<DependencyGraph> {
    let store = project.task_store();
    let cache = match project.graph_cache() {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "Graph cache unavailable");
            None
        }
    };

    // Revision and tasks come from one read so the cache key matches the graph
    let (tasks, revision) = store.read_list_at(list)?;
    if let Some(cache) = &cache {
        match cache.get(list, &revision) {
            Ok(Some(report)) => return Ok(report),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read graph cache"),
        }
    }

    let report = build_dependency_graph(&tasks)?;

    if let Some(cache) = &cache {
        if let Err(e) = cache.set(list, &revision, &report) {
            warn!(error = %e, "Failed to write graph cache");
        }
    }

    Ok(report)
}

/// Reads a task snapshot (a JSON or YAML sequence of tasks)
fn read_snapshot(path: &Path) -> Result<Vec<Task>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML snapshot: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON snapshot: {}", path.display()))
    }
}

fn print_graph(output: &Output, report: &DependencyGraph) {
    for cycle in &report.cycles {
        output.warning(&format!("Circular dependency: {}", cycle));
    }
    for dangling in &report.dangling {
        let missing: Vec<&str> = dangling.missing.iter().map(TaskId::as_str).collect();
        output.warning(&format!(
            "{} depends on missing task(s): {}",
            dangling.task,
            missing.join(", ")
        ));
    }

    if output.is_json() {
        output.data(report);
        return;
    }

    if report.nodes.is_empty() {
        println!("No tasks.");
        return;
    }

    println!(
        "{} tasks, {} ready, {} blocked, max depth {}",
        report.nodes.len(),
        report.ready_items.len(),
        report.blocked_items.len(),
        report.max_depth()
    );
    if report.has_cycles() {
        println!(
            "{} circular dependency loop(s); tasks on a loop are never ready",
            report.cycles.len()
        );
    }
    println!();

    for (depth, ids) in report.levels().iter().enumerate() {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| match report.node(id) {
                Some(node) if node.is_ready => format!("{}*", id),
                _ => id.to_string(),
            })
            .collect();
        println!("Depth {}: {}", depth, ids.join(", "));
    }

    println!();
    println!("* ready");
}
