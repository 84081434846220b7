//! Graph cache port
//!
//! The engine never caches; derived graphs are a pure function of the task
//! snapshot. Callers that want to skip recomputation go through
//! [`GraphCache`], keyed by list and [`Revision`]. An entry only hits when
//! the list file still has the revision it was computed from, and writers
//! call [`GraphCache::invalidate`] after every mutation.
//!
//! - [`MemoryGraphCache`] keeps entries in-process with a TTL
//! - [`SqliteGraphCache`] persists entries in `.taskdeps/.cache/graph.db`

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use super::jsonl::Revision;
use crate::domain::{DependencyGraph, ListId};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode cached graph: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage for derived graphs, keyed by list and revision
pub trait GraphCache {
    /// Returns the cached graph if it was computed from `revision`
    fn get(&self, list: &ListId, revision: &Revision) -> Result<Option<DependencyGraph>>;

    /// Stores the graph computed from `revision`
    fn set(&self, list: &ListId, revision: &Revision, graph: &DependencyGraph) -> Result<()>;

    /// Drops any entry for the list
    fn invalidate(&self, list: &ListId) -> Result<()>;
}

struct MemoryEntry {
    revision: Revision,
    graph: DependencyGraph,
    stored_at: Instant,
}

/// In-process cache with a time-to-live
pub struct MemoryGraphCache {
    ttl: Duration,
    entries: Mutex<HashMap<ListId, MemoryEntry>>,
}

impl MemoryGraphCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GraphCache for MemoryGraphCache {
    fn get(&self, list: &ListId, revision: &Revision) -> Result<Option<DependencyGraph>> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;

        let fresh = match entries.get(list) {
            Some(entry) => entry.stored_at.elapsed() < self.ttl && &entry.revision == revision,
            None => return Ok(None),
        };

        if fresh {
            Ok(entries.get(list).map(|e| e.graph.clone()))
        } else {
            entries.remove(list);
            Ok(None)
        }
    }

    fn set(&self, list: &ListId, revision: &Revision, graph: &DependencyGraph) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            list.clone(),
            MemoryEntry {
                revision: revision.clone(),
                graph: graph.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn invalidate(&self, list: &ListId) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(list);
        Ok(())
    }
}

/// SQLite-backed cache shared by CLI invocations
pub struct SqliteGraphCache {
    db_path: PathBuf,
    conn: Connection,
}

impl SqliteGraphCache {
    /// Schema version - bump when schema changes to force rebuild
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the cache database
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open cache database: {}", db_path.display()))?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(CacheError::from)?;

        let cache = Self {
            db_path: db_path.to_path_buf(),
            conn,
        };
        cache.ensure_schema()?;

        Ok(cache)
    }

    /// Opens an in-memory database (for tests and embedding)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(CacheError::from)?;
        let cache = Self {
            db_path: PathBuf::from(":memory:"),
            conn,
        };
        cache.ensure_schema()?;
        Ok(cache)
    }

    fn ensure_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(CacheError::from)?;

        if version != Self::SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!(
                    "
                    DROP TABLE IF EXISTS graphs;
                    CREATE TABLE graphs (
                        list_id TEXT PRIMARY KEY,
                        revision TEXT NOT NULL,
                        graph TEXT NOT NULL,
                        stored_at TEXT NOT NULL
                    );
                    PRAGMA user_version = {};
                    ",
                    Self::SCHEMA_VERSION
                ))
                .map_err(CacheError::from)?;
        }

        Ok(())
    }

    /// Drops every entry, returning how many were removed
    pub fn clear(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM graphs", [])
            .map_err(CacheError::from)?;
        Ok(removed)
    }

    /// Lists the cached list IDs
    pub fn cached_lists(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT list_id FROM graphs ORDER BY list_id")
            .map_err(CacheError::from)?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .map_err(CacheError::from)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(CacheError::from)?;
        Ok(ids)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

impl GraphCache for SqliteGraphCache {
    fn get(&self, list: &ListId, revision: &Revision) -> Result<Option<DependencyGraph>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT revision, graph FROM graphs WHERE list_id = ?1",
                params![list.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(CacheError::from)?;

        match row {
            Some((stored, graph)) if stored == revision.as_str() => {
                debug!(list = %list, "Graph cache hit");
                let graph = serde_json::from_str(&graph).map_err(CacheError::from)?;
                Ok(Some(graph))
            }
            _ => {
                debug!(list = %list, "Graph cache miss");
                Ok(None)
            }
        }
    }

    fn set(&self, list: &ListId, revision: &Revision, graph: &DependencyGraph) -> Result<()> {
        let encoded = serde_json::to_string(graph).map_err(CacheError::from)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO graphs (list_id, revision, graph, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    list.as_str(),
                    revision.as_str(),
                    encoded,
                    chrono::Utc::now().to_rfc3339()
                ],
            )
            .map_err(CacheError::from)?;
        Ok(())
    }

    fn invalidate(&self, list: &ListId) -> Result<()> {
        self.conn
            .execute("DELETE FROM graphs WHERE list_id = ?1", params![list.as_str()])
            .map_err(CacheError::from)?;
        Ok(())
    }
}
