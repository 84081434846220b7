//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_DIR;
use super::{Config, SqliteGraphCache, TaskStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskdeps project. Run 'taskdeps init' first.")]
    NotInProject,
}

/// A taskdeps project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        let lists_dir = project_dir.join("lists");
        fs::create_dir_all(&lists_dir).with_context(|| {
            format!("Failed to create lists directory: {}", lists_dir.display())
        })?;

        // Create default config
        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# taskdeps configuration

[dependencies]
# Warn when a task has more dependencies than this (0 disables)
soft_limit = 10

[lists]
# Maximum number of tasks per list
max_tasks = 1000

[ready]
# Ready tasks shown when no --limit is given
default_limit = 20

[cache]
# Cache derived graphs in .taskdeps/.cache/graph.db
enabled = true
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        // Create .gitignore for the project directory
        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Ignore SQLite cache (regenerated from list files)
.cache/

# Ignore interrupted writes
lists/*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.taskdeps` directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the task store, capped by the configured list size
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root).with_max_tasks(self.config.project.lists.max_tasks)
    }

    /// Returns the cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir().join(".cache")
    }

    /// Opens the SQLite graph cache, or `None` when caching is disabled
    pub fn graph_cache(&self) -> Result<Option<SqliteGraphCache>> {
        if !self.config.project.cache.enabled {
            return Ok(None);
        }
        SqliteGraphCache::open(&self.cache_dir().join("graph.db")).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.project_dir().is_dir());
        assert!(project.project_dir().join("lists").is_dir());
        assert!(project.project_dir().join("config.toml").is_file());
        assert!(project.project_dir().join(".gitignore").is_file());
    }

    #[test]
    fn default_config_file_parses() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(
            project.config().project,
            crate::storage::config::ProjectConfig::default()
        );
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap(); // Should not fail

        assert!(dir.path().join(PROJECT_DIR).is_dir());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn stores_are_accessible() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.task_store().dir().ends_with("lists"));
        assert!(project.graph_cache().unwrap().is_some());
        assert!(project.cache_dir().join("graph.db").is_file());
    }
}
