use rusqlite::{Connection, params};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed durable review state.
///
/// Statuses are persisted as approvals only: a row means "this hunk
/// identity in this file is approved", absence means pending. The undo
/// journal lives alongside so `undo` keeps working across processes; a
/// reject row carries the exact patch needed to re-apply the change.
pub struct ReviewStore {
    conn: Connection,
}

/// One persisted undo record, ordered by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRow {
    pub id: i64,
    pub kind: String,
    pub file_path: String,
    pub hunk_id: String,
    pub patch: Option<String>,
}

impl ReviewStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_conn(Connection::open(path)?)
    }

    /// In-memory store, used by tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS approvals (
                file_path TEXT NOT NULL,
                hunk_id TEXT NOT NULL,
                approved_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(file_path, hunk_id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS undo_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                file_path TEXT NOT NULL,
                hunk_id TEXT NOT NULL,
                patch TEXT
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Record an approval. Idempotent.
    pub fn insert(&mut self, file_path: &str, hunk_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO approvals (file_path, hunk_id) VALUES (?1, ?2)",
            params![file_path, hunk_id],
        )?;
        Ok(())
    }

    /// Drop one approval if present.
    pub fn remove(&mut self, file_path: &str, hunk_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM approvals WHERE file_path = ?1 AND hunk_id = ?2",
            params![file_path, hunk_id],
        )?;
        Ok(())
    }

    /// Drop every approval recorded for a file.
    pub fn remove_file(&mut self, file_path: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM approvals WHERE file_path = ?1",
            params![file_path],
        )?;
        Ok(())
    }

    /// Approved hunk identities for one file.
    pub fn approved_for(&self, file_path: &str) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hunk_id FROM approvals WHERE file_path = ?1")?;
        let ids = stmt
            .query_map(params![file_path], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    /// Append an undo record, returning its journal id.
    pub fn push_undo(
        &mut self,
        kind: &str,
        file_path: &str,
        hunk_id: &str,
        patch: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO undo_log (kind, file_path, hunk_id, patch) VALUES (?1, ?2, ?3, ?4)",
            params![kind, file_path, hunk_id, patch],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Drop one undo record.
    pub fn remove_undo(&mut self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM undo_log WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Drop every undo record for a file.
    pub fn remove_undo_file(&mut self, file_path: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM undo_log WHERE file_path = ?1",
            params![file_path],
        )?;
        Ok(())
    }

    /// The whole undo journal, oldest first.
    pub fn load_undo(&self) -> Result<Vec<UndoRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, kind, file_path, hunk_id, patch FROM undo_log ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(UndoRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                file_path: row.get(2)?,
                hunk_id: row.get(3)?,
                patch: row.get(4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Everything persisted, keyed by file path. Used to seed a fresh
    /// engine at startup.
    pub fn load_all(&self) -> Result<HashMap<String, HashSet<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_path, hunk_id FROM approvals")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut all: HashMap<String, HashSet<String>> = HashMap::new();
        for row in rows {
            let (path, id) = row?;
            all.entry(path).or_default().insert(id);
        }
        Ok(all)
    }
}
