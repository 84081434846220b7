//! Task CLI commands

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use tracing::debug;

use super::deps::enforce;
use super::output::Output;
use super::{find_task, invalidate_graph, open_list, parse_ids};
use crate::domain::{Priority, Task, TaskId, TaskStatus};
use crate::engine::{build_dependency_graph, validate_dependencies};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a list
    ///
    /// Examples:
    ///   taskdeps task add backlog "Write parser"
    ///   taskdeps task add backlog "Ship it" --priority 5 --after t-1a2b3c4
    Add {
        /// List ID
        list: String,

        /// Task title
        title: String,

        /// Priority from 1 (lowest) to 5 (highest)
        #[arg(long, short, default_value_t = 3)]
        priority: u8,

        /// Tasks that must be completed first (repeatable or comma-separated)
        #[arg(long, value_name = "ID", value_delimiter = ',')]
        after: Vec<String>,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List the tasks of a list
    List {
        /// List ID
        list: String,
    },

    /// Show task details
    Show {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Mark task as in progress
    Start {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Mark task as completed
    Done {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Mark task as cancelled
    Cancel {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Mark task as blocked
    Block {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Move a completed or cancelled task back to pending
    Reopen {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },
}

/// Status change requested from the command line
#[derive(Debug, Clone, Copy)]
enum Transition {
    Start,
    Done,
    Cancel,
    Block,
    Reopen,
}

impl Transition {
    fn apply(self, task: &mut Task) {
        match self {
            Transition::Start => task.start(),
            Transition::Done => task.complete(),
            Transition::Cancel => task.cancel(),
            Transition::Block => task.block(),
            Transition::Reopen => task.reopen(),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Done => "complete",
            Transition::Cancel => "cancel",
            Transition::Block => "block",
            Transition::Reopen => "reopen",
        }
    }
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            list,
            title,
            priority,
            after,
            description,
        } => add_task(output, &list, &title, priority, &after, description),
        TaskCommands::List { list } => list_tasks(output, &list),
        TaskCommands::Show { list, id } => show_task(output, &list, &id),
        TaskCommands::Start { list, id } => transition(output, &list, &id, Transition::Start),
        TaskCommands::Done { list, id } => transition(output, &list, &id, Transition::Done),
        TaskCommands::Cancel { list, id } => transition(output, &list, &id, Transition::Cancel),
        TaskCommands::Block { list, id } => transition(output, &list, &id, Transition::Block),
        TaskCommands::Reopen { list, id } => transition(output, &list, &id, Transition::Reopen),
    }
}

fn add_task(
    output: &Output,
    list_str: &str,
    title: &str,
    priority: u8,
    after: &[String],
    description: Option<String>,
) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let store = project.task_store();

    let priority = Priority::new(priority)?;
    let after = parse_ids(after)?;

    let now = Utc::now();
    let mut task = Task::new(TaskId::generate(title, now), title)
        .with_created_at(now)
        .with_priority(priority);
    task.description = description;

    task.dependencies = dedupe(&after);
    let options = project.config().project.validate_options();

    store.append_checked(&list, &task, |tasks| {
        if after.is_empty() {
            return Ok(());
        }
        let result = validate_dependencies(&task.id, &after, tasks, options)?;
        enforce(output, &result)
    })?;
    invalidate_graph(&project, &list)?;
    debug!(list = %list, task = %task.id, "Added task");

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(output: &Output, list_str: &str) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let tasks = project.task_store().read_list(&list)?;

    if output.is_json() {
        output.data(&tasks);
    } else if tasks.is_empty() {
        println!("No tasks in {}", list);
    } else {
        println!("{:<12} {:<12} {:<4} {:<40} DEPENDS ON", "ID", "STATUS", "PRI", "TITLE");
        println!("{}", "-".repeat(90));

        for task in &tasks {
            let deps: Vec<&str> = task.dependencies.iter().map(TaskId::as_str).collect();
            println!(
                "{:<12} {:<12} {:<4} {:<40} {}",
                task.id,
                task.status,
                task.priority,
                task.title,
                deps.join(", ")
            );
        }
    }

    Ok(())
}

fn show_task(output: &Output, list_str: &str, id_str: &str) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let tasks = project.task_store().read_list(&list)?;

    let id: TaskId = id_str.parse()?;
    let task = find_task(&tasks, &id)?;

    let report = build_dependency_graph(&tasks)?;
    let node = report
        .node(&id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "node": node,
        }));
    } else {
        println!("Task: {}", task.id);
        println!("Title: {}", task.title);
        println!("Status: {}", task.status);
        println!("Priority: {}", task.priority);
        println!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", task.updated_at.format("%Y-%m-%d %H:%M"));

        if let Some(completed) = task.completed_at {
            println!("Completed: {}", completed.format("%Y-%m-%d %H:%M"));
        }

        if !node.dependencies.is_empty() || !node.missing_dependencies.is_empty() {
            println!("\nDepends on:");
            for dep in &node.dependencies {
                let dep_status = report
                    .node(dep)
                    .map(|n| n.status.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("  {} ({})", dep, dep_status);
            }
            for dep in &node.missing_dependencies {
                println!("  {} (missing)", dep);
            }
        }

        if !node.dependents.is_empty() {
            let dependents: Vec<&str> = node.dependents.iter().map(TaskId::as_str).collect();
            println!("\nRequired by: {}", dependents.join(", "));
        }

        if let Some(desc) = &task.description {
            println!("\nDescription:");
            println!("{}", desc);
        }

        println!();
        println!("Depth: {}", node.depth);
        if node.is_ready {
            println!("Status: READY (all dependencies complete)");
        } else if task.status.is_open() {
            println!("Status: BLOCKED (see 'taskdeps why {} {}')", list, task.id);
        }
    }

    Ok(())
}

fn transition(output: &Output, list_str: &str, id_str: &str, change: Transition) -> Result<()> {
    let (project, list) = open_list(list_str)?;
    let store = project.task_store();

    let id: TaskId = id_str.parse()?;
    let (task, before, tasks) = store.modify(&list, |tasks| {
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

        let before = task.status;
        change.apply(task);
        if task.status == before {
            anyhow::bail!("Cannot {} task {}: status is {}", change.verb(), id, before);
        }

        let task = task.clone();
        Ok((task, before, tasks.clone()))
    })?;
    invalidate_graph(&project, &list)?;
    debug!(list = %list, task = %id, from = %before, to = %task.status, "Changed task status");

    // Report dependents this change made ready
    let unblocked = if task.status == TaskStatus::Completed {
        let report = build_dependency_graph(&tasks)?;
        report
            .node(&id)
            .map(|node| {
                node.dependents
                    .iter()
                    .filter(|dep| report.node(dep).is_some_and(|n| n.is_ready))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "status": task.status,
            "completed_at": task.completed_at,
            "unblocked": unblocked,
        }));
    } else {
        output.success(&format!("Task {} is now {}", task.id, task.status));
        for dep in &unblocked {
            println!("  unblocked: {}", dep);
        }
    }

    Ok(())
}

/// Drops repeated IDs, keeping first occurrence
pub(super) fn dedupe(ids: &[TaskId]) -> Vec<TaskId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}
