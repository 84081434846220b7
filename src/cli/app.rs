//! Main CLI application structure

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::Output;
use super::{cache_cmd, deps, query, task};
use crate::storage::{Config, OutputFormat, Project};

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "TASKDEPS_LOG";

#[derive(Parser)]
#[command(name = "taskdeps")]
#[command(author, version, about = "Dependency-aware task lists")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format [default: global config, else text]
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskdeps project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Edit and check task dependencies
    #[command(subcommand)]
    Deps(deps::DepsCommands),

    /// Show the derived dependency graph of a list
    Graph {
        /// List ID
        #[arg(required_unless_present = "file")]
        list: Option<String>,

        /// Read tasks from a JSON or YAML snapshot instead of a list
        #[arg(long, conflicts_with = "list")]
        file: Option<PathBuf>,
    },

    /// Show tasks ready to work on
    Ready {
        /// List ID
        list: String,

        /// Maximum number of tasks to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Show blocked tasks
    Blocked {
        /// List ID
        list: String,
    },

    /// Explain what blocks a task
    Why {
        /// List ID
        list: String,

        /// Task ID
        id: String,
    },

    /// Manage the graph cache
    #[command(subcommand)]
    Cache(cache_cmd::CacheCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        // Config problems surface again once a command opens the project
        None => Config::load()
            .map(|config| config.global.default_format)
            .unwrap_or_default(),
    };
    let output = Output::new(format);

    match cli.command {
        Commands::Init { path } => {
            debug!(path = %path, "Initializing project");
            let project = Project::init(&path)?;
            output.success(&format!(
                "Initialized taskdeps project at {}",
                project.root().display()
            ));
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,
        Commands::Deps(cmd) => deps::run(cmd, &output)?,

        Commands::Graph { list, file } => match (list, file) {
            (_, Some(path)) => query::graph_file(&output, &path)?,
            (Some(list), None) => query::graph(&output, &list)?,
            (None, None) => anyhow::bail!("Either a list or --file is required"),
        },
        Commands::Ready { list, limit } => query::ready(&output, &list, limit)?,
        Commands::Blocked { list } => query::blocked(&output, &list)?,
        Commands::Why { list, id } => query::why(&output, &list, &id)?,

        Commands::Cache(cmd) => cache_cmd::run(cmd, &output)?,
    }

    debug!("Command completed successfully");
    Ok(())
}

/// Installs the stderr log subscriber
///
/// `TASKDEPS_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,taskdeps={}", level)));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn graph_accepts_list_or_file() {
        let cli = Cli::try_parse_from(["taskdeps", "graph", "backlog"]).unwrap();
        assert!(matches!(cli.command, Commands::Graph { list: Some(_), file: None }));

        let cli = Cli::try_parse_from(["taskdeps", "graph", "--file", "tasks.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Graph { list: None, file: Some(_) }));

        assert!(Cli::try_parse_from(["taskdeps", "graph"]).is_err());
        assert!(Cli::try_parse_from(["taskdeps", "graph", "backlog", "--file", "x.json"]).is_err());
    }

    #[test]
    fn format_is_optional_and_global() {
        let cli = Cli::try_parse_from(["taskdeps", "ready", "backlog", "--format", "json"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));

        let cli = Cli::try_parse_from(["taskdeps", "ready", "backlog"]).unwrap();
        assert_eq!(cli.format, None);
    }
}
