//! Deciding where a run picks up
//!
//! Once a run has been recorded, the progress index gives the exact answer.
//! Output directories without one fall back to two count-based heuristics
//! that estimate how many tasks from the front of the task space are
//! already done: the last progress line in the run log, then the number of
//! distinct task keys found in checkpoints.

use crate::model::TaskKey;
use crate::state::parse_progress_line;
use crate::storage::checkpoint::{list_checkpoints, read_checkpoint};
use crate::storage::traits::{ProgressStore, StorageResult};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Where a resume offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSource {
    /// Last matching progress line of the run log
    Log,
    /// Distinct task keys across checkpoint files
    Checkpoints,
    /// Nothing to resume from
    None,
}

impl fmt::Display for OffsetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "run log",
            Self::Checkpoints => "checkpoints",
            Self::None => "none",
        })
    }
}

/// Number of leading tasks to skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeOffset {
    pub offset: usize,
    pub source: OffsetSource,
}

impl ResumeOffset {
    pub fn none() -> Self {
        Self {
            offset: 0,
            source: OffsetSource::None,
        }
    }
}

/// How the next run treats already-done work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePlan {
    /// Run the whole task space
    Fresh,
    /// Skip exactly these keys
    SkipKnown(HashSet<TaskKey>),
    /// Skip the first `offset` tasks of the ordered task space
    SkipFirst(ResumeOffset),
}

/// Completed count from the last progress line whose total is `total`
///
/// Lines reporting a different total were written for a different task
/// space and are ignored. A missing log yields `None`. The log is read a
/// line at a time since it grows across runs.
pub fn offset_from_log(log_path: &Path, total: usize) -> StorageResult<Option<usize>> {
    if !log_path.exists() {
        return Ok(None);
    }

    let mut reader = BufReader::new(File::open(log_path)?);
    let mut line = Vec::new();
    let mut offset = None;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        // Log lines may carry non-UTF-8 court names from older runs
        if let Some((completed, line_total)) = parse_progress_line(&String::from_utf8_lossy(&line)) {
            if line_total == total {
                offset = Some(completed);
            }
        }
    }
    Ok(offset)
}

/// Distinct `(court_id, search_date)` pairs across all checkpoints
pub fn offset_from_checkpoints(dir: &Path) -> StorageResult<usize> {
    let mut keys = HashSet::new();
    for file in list_checkpoints(dir)? {
        for record in read_checkpoint(&file.path)? {
            keys.insert(record.task_key());
        }
    }
    Ok(keys.len())
}

/// Estimates how many leading tasks a previous run completed
///
/// The result never exceeds `total`.
pub fn compute_resume_offset(
    log_path: &Path,
    checkpoint_dir: &Path,
    total: usize,
) -> StorageResult<ResumeOffset> {
    if let Some(offset) = offset_from_log(log_path, total)? {
        if offset > 0 {
            return Ok(ResumeOffset {
                offset: offset.min(total),
                source: OffsetSource::Log,
            });
        }
    }

    let offset = offset_from_checkpoints(checkpoint_dir)?;
    if offset > 0 {
        return Ok(ResumeOffset {
            offset: offset.min(total),
            source: OffsetSource::Checkpoints,
        });
    }

    Ok(ResumeOffset::none())
}

/// Chooses how to resume
///
/// # Arguments
///
/// * `progress` - The progress index
/// * `log_path` - Run log to scan for progress lines
/// * `checkpoint_dir` - Directory of checkpoint files
/// * `total` - Size of the current task space
/// * `fingerprint` - Fingerprint of the current task space
///
/// # Returns
///
/// `SkipKnown` when the index holds completed keys. Once any run has been
/// recorded the index is authoritative, so an empty index means `Fresh`:
/// progress counts include tasks that failed or were never checkpointed.
/// Only an output directory with no recorded run (one written before the
/// index existed) falls back to a count-based `SkipFirst`.
pub fn plan_resume<P: ProgressStore>(
    progress: &P,
    log_path: &Path,
    checkpoint_dir: &Path,
    total: usize,
    fingerprint: &str,
) -> StorageResult<ResumePlan> {
    let known = progress.completed_keys()?;
    if !known.is_empty() {
        tracing::info!("Progress index lists {} completed tasks", known.len());
        return Ok(ResumePlan::SkipKnown(known));
    }

    if let Some(run) = progress.get_latest_run()? {
        if run.task_space != fingerprint {
            tracing::warn!(
                "Task space changed since run {} ({} tasks then, {} now)",
                run.id,
                run.total_tasks,
                total
            );
        }
        tracing::info!(
            "Progress index from run {} lists no completed tasks; starting from the first task",
            run.id
        );
        return Ok(ResumePlan::Fresh);
    }

    let offset = compute_resume_offset(log_path, checkpoint_dir, total)?;
    if offset.offset == 0 {
        return Ok(ResumePlan::Fresh);
    }

    tracing::info!(
        "No recorded runs; resuming after {} tasks (from {})",
        offset.offset,
        offset.source
    );
    Ok(ResumePlan::SkipFirst(offset))
}
