//! Storage module for persisting crawl progress
//!
//! This module handles everything a run leaves on disk:
//! - Checkpoint CSV files and the shared sink that writes them
//! - The SQLite progress index of completed tasks, runs and checkpoints
//! - Resume planning from the index, the run log or the checkpoints

mod checkpoint;
mod resume;
mod schema;
mod sqlite;
mod traits;

pub use checkpoint::{
    checkpoint_file_name, list_checkpoints, parse_checkpoint_number, read_checkpoint,
    CheckpointFile, CheckpointSink, CheckpointWriter, SinkStats,
};
pub(crate) use checkpoint::write_records_atomic;
pub use resume::{
    compute_resume_offset, offset_from_checkpoints, offset_from_log, plan_resume, OffsetSource,
    ResumeOffset, ResumePlan,
};
pub use sqlite::SqliteProgress;
pub use traits::{ProgressStore, StorageError, StorageResult};

use crate::SweepError;
use std::fmt;
use std::path::Path;

/// Opens the progress index, creating its parent directory if needed
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteProgress)` - Successfully opened index
/// * `Err(SweepError)` - Failed to open the database
pub fn open_progress(path: &Path) -> Result<SqliteProgress, SweepError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteProgress::new(path)
}

/// One row of the run history
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    /// Fingerprint of the ordered task space the run covered
    pub task_space: String,
    pub total_tasks: usize,
    pub status: RunStatus,
}

/// How a run ended; `Running` until it is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        Self::Running,
        Self::Completed,
        Self::Interrupted,
        Self::Failed,
    ];

    /// Name stored in the `runs.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == name)
    }

    /// A run left `Running` was killed without recording its end
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
