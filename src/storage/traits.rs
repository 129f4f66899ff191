//! Storage traits and error types
//!
//! This module defines the trait interface for the progress index and
//! the error type shared by all storage operations.

use crate::model::TaskKey;
use crate::storage::{RunRecord, RunStatus};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Malformed checkpoint file name: {0}")]
    CheckpointName(PathBuf),

    #[error("Checkpoint {path} could not be read: {source}")]
    CheckpointRead { path: PathBuf, source: csv::Error },

    #[error("Corrupt progress entry: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of which tasks have completed
///
/// A task key is only marked completed once everything the task produced
/// is durable, so skipping a marked key on resume never loses decisions.
pub trait ProgressStore {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `task_space` - Fingerprint of the ordered task space
    /// * `total_tasks` - Size of the task space
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, task_space: &str, total_tasks: usize) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Completed Tasks =====

    /// Marks tasks as completed; already-marked keys are left untouched
    fn mark_completed(&mut self, keys: &[TaskKey]) -> StorageResult<()>;

    /// Returns true if the task has been marked completed
    fn is_completed(&self, key: &TaskKey) -> StorageResult<bool>;

    /// Loads every completed task key
    fn completed_keys(&self) -> StorageResult<HashSet<TaskKey>>;

    /// Counts completed task keys
    fn count_completed(&self) -> StorageResult<u64>;

    // ===== Checkpoints =====

    /// Records that a checkpoint file was written
    fn record_checkpoint(&mut self, number: u32, path: &str, records: usize) -> StorageResult<()>;

    /// Counts checkpoints recorded across all runs
    fn count_checkpoints(&self) -> StorageResult<u64>;

    // ===== Maintenance =====

    /// Forgets all completed tasks, runs, and checkpoint entries
    fn reset(&mut self) -> StorageResult<()>;
}
