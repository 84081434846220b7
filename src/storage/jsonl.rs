//! JSONL storage for task lists
//!
//! Each list is stored in `.taskdeps/lists/{list}.jsonl` with one JSON object
//! per line. Uses file locking for concurrent access safety. When a task ID
//! appears on several lines (appended updates) the last line wins, while the
//! task keeps the position of its first appearance.
//!
//! Writers serialize on a per-list lock file (`.{list}.lock`), held across the
//! whole read-check-write step so a check made against the list still holds
//! when the write lands.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

use super::TaskRepository;
use crate::domain::{ListId, Task, TaskId};

/// Default cap on tasks per list
pub const DEFAULT_MAX_TASKS: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("List '{list}' is full ({max} tasks)")]
    ListFull { list: ListId, max: usize },

    #[error("Task {task} already exists in list '{list}'")]
    TaskExists { list: ListId, task: TaskId },
}

/// Content hash of a list file
///
/// Changes whenever the file changes; used to key cached graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Revision of a list that has no file yet
    pub fn empty() -> Self {
        Self::of(b"")
    }

    /// Revision of the given list file content
    pub fn of(content: &[u8]) -> Self {
        Self(blake3::hash(content).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Revision {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store for task lists in JSONL format
pub struct TaskStore {
    dir: PathBuf,
    max_tasks: usize,
}

impl TaskStore {
    /// Creates a new task store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_tasks: DEFAULT_MAX_TASKS,
        }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".taskdeps").join("lists"))
    }

    /// Sets the per-list task cap
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Returns the directory holding the list files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path of a list
    pub fn path_for(&self, list: &ListId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", list))
    }

    /// Returns the IDs of all lists with a file, sorted
    pub fn lists(&self) -> Result<Vec<ListId>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut lists = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read list directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().map(|ext| ext == "jsonl").unwrap_or(false) {
                if let Some(list) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<ListId>().ok())
                {
                    lists.push(list);
                }
            }
        }
        lists.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(lists)
    }

    /// Reads all tasks of a list
    pub fn read_list(&self, list: &ListId) -> Result<Vec<Task>> {
        self.read_list_at(list).map(|(tasks, _)| tasks)
    }

    /// Reads all tasks of a list with the revision of the bytes they came from
    pub fn read_list_at(&self, list: &ListId) -> Result<(Vec<Task>, Revision)> {
        let path = self.path_for(list);
        let Some(content) = self.read_bytes(&path)? else {
            return Ok((Vec::new(), Revision::empty()));
        };

        let revision = Revision::of(&content);
        let mut tasks: Vec<Task> = Vec::new();
        let mut positions: HashMap<TaskId, usize> = HashMap::new();

        for (line_num, line) in content.as_slice().lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line).with_context(|| {
                format!("Failed to parse task at {}:{}", path.display(), line_num + 1)
            })?;

            match positions.get(&task.id) {
                Some(&pos) => tasks[pos] = task,
                None => {
                    positions.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
        }

        debug!(list = %list, tasks = tasks.len(), revision = %revision, "Loaded task list");
        Ok((tasks, revision))
    }

    /// Runs a read-modify-write step on a list under the list lock
    ///
    /// The list is rewritten only when `f` succeeds. Growing the list past
    /// the cap fails with [`StoreError::ListFull`].
    pub fn modify<T>(
        &self,
        list: &ListId,
        f: impl FnOnce(&mut Vec<Task>) -> Result<T>,
    ) -> Result<T> {
        let _lock = self.lock_list(list)?;
        let mut tasks = self.read_list(list)?;
        let len_before = tasks.len();

        let value = f(&mut tasks)?;

        if tasks.len() > len_before && tasks.len() > self.max_tasks {
            return Err(StoreError::ListFull {
                list: list.clone(),
                max: self.max_tasks,
            }
            .into());
        }
        self.write_tasks(list, &tasks)?;
        Ok(value)
    }

    /// Writes all tasks of a list (full rewrite)
    pub fn write_list(&self, list: &ListId, tasks: &[Task]) -> Result<()> {
        let _lock = self.lock_list(list)?;
        self.write_tasks(list, tasks)
    }

    fn write_tasks(&self, list: &ListId, tasks: &[Task]) -> Result<()> {
        let path = self.path_for(list);
        self.ensure_dir()?;

        // Write to temp file first
        let temp_path = path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on task list")?;

            let mut writer = BufWriter::new(&file);
            for task in tasks {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task list")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Appends a new task, enforcing the per-list cap
    pub fn append(&self, list: &ListId, task: &Task) -> Result<()> {
        self.append_checked(list, task, |_| Ok(()))
    }

    /// Appends a new task once `check` accepts the current list
    ///
    /// The list lock is held from the read `check` sees until the append
    /// lands.
    pub fn append_checked(
        &self,
        list: &ListId,
        task: &Task,
        check: impl FnOnce(&[Task]) -> Result<()>,
    ) -> Result<()> {
        let _lock = self.lock_list(list)?;
        let existing = self.read_list(list)?;
        check(&existing)?;

        if existing.iter().any(|t| t.id == task.id) {
            return Err(StoreError::TaskExists {
                list: list.clone(),
                task: task.id.clone(),
            }
            .into());
        }
        if existing.len() >= self.max_tasks {
            return Err(StoreError::ListFull {
                list: list.clone(),
                max: self.max_tasks,
            }
            .into());
        }

        let path = self.path_for(list);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open task list: {}", path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire write lock on task list")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(task).context("Failed to serialize task")?;
        writeln!(writer, "{}", line).context("Failed to write task")?;

        writer.flush().context("Failed to flush task list")?;

        Ok(())
    }

    /// Replaces an existing task (reads all, updates, writes all)
    pub fn update(&self, list: &ListId, task: &Task) -> Result<()> {
        self.modify(list, |tasks| {
            match tasks.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task.clone(),
                None => anyhow::bail!("Task not found: {}", task.id),
            }
            Ok(())
        })
    }

    /// Removes a task by ID
    pub fn remove(&self, list: &ListId, task_id: &TaskId) -> Result<bool> {
        let _lock = self.lock_list(list)?;
        let mut tasks = self.read_list(list)?;
        let len_before = tasks.len();
        tasks.retain(|t| &t.id != task_id);
        let removed = tasks.len() != len_before;
        if removed {
            self.write_tasks(list, &tasks)?;
        }
        Ok(removed)
    }

    /// Returns the current revision of a list
    pub fn revision(&self, list: &ListId) -> Result<Revision> {
        Ok(self
            .read_bytes(&self.path_for(list))?
            .map(|content| Revision::of(&content))
            .unwrap_or_else(Revision::empty))
    }

    /// Reads a list file under a shared lock, `None` when it does not exist
    fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(path)
            .with_context(|| format!("Failed to open task list: {}", path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on task list")?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .with_context(|| format!("Failed to read task list: {}", path.display()))?;

        // Lock is released when file is dropped
        Ok(Some(content))
    }

    /// Takes the exclusive writer lock of a list
    ///
    /// Released when the returned file is dropped.
    fn lock_list(&self, list: &ListId) -> Result<File> {
        self.ensure_dir()?;
        let path = self.dir.join(format!(".{}.lock", list));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock list '{}'", list))?;
        Ok(file)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))
    }
}

impl TaskRepository for TaskStore {
    fn load_tasks(&self, list: &ListId) -> Result<Vec<Task>> {
        self.read_list(list)
    }

    fn save_task(&self, list: &ListId, task: &Task) -> Result<()> {
        self.modify(list, |tasks| {
            match tasks.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task.clone(),
                None => tasks.push(task.clone()),
            }
            Ok(())
        })
    }
}
