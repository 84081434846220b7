//! Cache CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::ListId;
use crate::storage::{GraphCache, Project};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop cached graphs (all lists, or just one)
    Clear {
        /// List ID
        list: Option<String>,
    },

    /// Show cache status
    Status,
}

pub fn run(cmd: CacheCommands, output: &Output) -> Result<()> {
    match cmd {
        CacheCommands::Clear { list } => clear(output, list.as_deref()),
        CacheCommands::Status => status(output),
    }
}

fn clear(output: &Output, list: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    let Some(cache) = project.graph_cache()? else {
        output.success("Graph cache is disabled; nothing to clear");
        return Ok(());
    };

    match list {
        Some(list) => {
            let list: ListId = list.parse()?;
            cache.invalidate(&list)?;
            output.success(&format!("Cleared cached graph for {}", list));
        }
        None => {
            let removed = cache.clear()?;
            output.success(&format!("Cleared {} cached graph(s)", removed));
        }
    }

    Ok(())
}

fn status(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let Some(cache) = project.graph_cache()? else {
        if output.is_json() {
            output.data(&serde_json::json!({ "enabled": false }));
        } else {
            println!("Graph cache is disabled ([cache] enabled = false)");
        }
        return Ok(());
    };

    let store = project.task_store();
    let mut fresh = Vec::new();
    for list in store.lists()? {
        let revision = store.revision(&list)?;
        if cache.get(&list, &revision)?.is_some() {
            fresh.push(list.to_string());
        }
    }
    let cached = cache.cached_lists()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "enabled": true,
            "path": cache.path().display().to_string(),
            "cached": cached,
            "fresh": fresh,
        }));
    } else {
        println!("Cache Status");
        println!("{}", "=".repeat(40));
        println!("Path: {}", cache.path().display());
        println!("Cached lists: {}", cached.len());
        for list in &cached {
            let state = if fresh.contains(list) { "fresh" } else { "stale" };
            println!("  {:<20} {}", list, state);
        }
    }

    Ok(())
}
