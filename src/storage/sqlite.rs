//! SQLite progress index
//!
//! This module provides a SQLite-based implementation of the ProgressStore trait.

use crate::model::{CalendarDate, TaskKey};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SweepError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// SQLite progress backend
pub struct SqliteProgress {
    conn: Connection,
}

impl SqliteProgress {
    /// Opens or creates the progress index
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteProgress)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        task_space: row.get(3)?,
        total_tasks: row.get::<_, i64>(4)? as usize,
        status: RunStatus::parse(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, task_space, total_tasks, status";

impl ProgressStore for SqliteProgress {
    // ===== Run Management =====

    fn create_run(&mut self, task_space: &str, total_tasks: usize) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, task_space, total_tasks, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                task_space,
                total_tasks as i64,
                RunStatus::Running.as_str()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Completed Tasks =====

    fn mark_completed(&mut self, keys: &[TaskKey]) -> StorageResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO completed_tasks (court_id, search_date, completed_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            for key in keys {
                stmt.execute(params![key.court_id, key.date.to_string(), now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn is_completed(&self, key: &TaskKey) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM completed_tasks WHERE court_id = ?1 AND search_date = ?2",
                params![key.court_id, key.date.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn completed_keys(&self) -> StorageResult<HashSet<TaskKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT court_id, search_date FROM completed_tasks")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut keys = HashSet::new();
        for row in rows {
            let (court_id, date) = row?;
            let date: CalendarDate = date
                .parse()
                .map_err(|_| StorageError::Corrupt(format!("{}@{}", court_id, date)))?;
            keys.insert(TaskKey { court_id, date });
        }
        Ok(keys)
    }

    fn count_completed(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM completed_tasks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Checkpoints =====

    fn record_checkpoint(&mut self, number: u32, path: &str, records: usize) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO checkpoints (number, path, records, written_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![number, path, records as i64, now],
        )?;
        Ok(())
    }

    fn count_checkpoints(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM checkpoints", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Maintenance =====

    fn reset(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM completed_tasks;
            DELETE FROM checkpoints;
            DELETE FROM runs;
        ",
        )?;
        Ok(())
    }
}
