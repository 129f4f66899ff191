use crate::model::Task;
use crate::state::outcome::TaskOutcome;
use crate::state::progress::progress_line;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cooperative stop request shared between the signal handler and workers
///
/// Workers check the flag between tasks, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Tasks finished this run, successfully or not
    pub tasks_processed: u64,

    /// Decision rows parsed
    pub decisions_found: u64,

    /// Tasks that ended in an error after all attempts
    pub errors: u64,

    /// Tasks that completed with zero decisions
    pub empty_results: u64,

    /// Extra attempts made for transient failures
    pub retries: u64,

    /// Decisions per court id
    pub decisions_by_court: BTreeMap<String, u64>,

    /// Decisions per search date
    pub decisions_by_date: BTreeMap<String, u64>,

    /// Tasks processed per court type code
    pub tasks_by_court_type: BTreeMap<String, u64>,
}

impl RunTotals {
    /// Errors as a fraction of processed tasks (0.0 when nothing ran)
    pub fn error_rate(&self) -> f64 {
        if self.tasks_processed == 0 {
            return 0.0;
        }
        self.errors as f64 / self.tasks_processed as f64
    }
}

/// Shared, lock-protected state of one crawl run
///
/// All mutation goes through methods that take the counter lock, so
/// concurrent workers never lose updates.
#[derive(Debug)]
pub struct RunState {
    totals: Mutex<RunTotals>,
    shutdown: ShutdownFlag,

    /// Tasks skipped by resumption; added to progress counts so log lines
    /// report position in the full task space
    resume_offset: usize,

    /// Size of the full task space
    total_tasks: usize,

    progress_interval: u64,
}

impl RunState {
    pub fn new(
        total_tasks: usize,
        resume_offset: usize,
        progress_interval: usize,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            totals: Mutex::new(RunTotals::default()),
            shutdown,
            resume_offset,
            total_tasks,
            progress_interval: progress_interval.max(1) as u64,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunTotals> {
        // A panicking worker must not wedge the others; the counters stay usable.
        self.totals.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the final outcome of one task and logs progress at the
    /// configured interval
    pub fn record_outcome(&self, task: &Task, outcome: &TaskOutcome) {
        let mut totals = self.lock();
        totals.tasks_processed += 1;
        *totals
            .tasks_by_court_type
            .entry(task.court.type_code().to_string())
            .or_default() += 1;

        match outcome {
            TaskOutcome::Success(records) => {
                let found = records.len() as u64;
                totals.decisions_found += found;
                *totals
                    .decisions_by_court
                    .entry(task.court.id.clone())
                    .or_default() += found;
                *totals
                    .decisions_by_date
                    .entry(task.date.to_string())
                    .or_default() += found;
            }
            TaskOutcome::EmptyResult => totals.empty_results += 1,
            TaskOutcome::TransientError(_) | TaskOutcome::FatalError(_) => totals.errors += 1,
        }

        if totals.tasks_processed % self.progress_interval == 0 {
            self.log_line(&totals);
        }
    }

    /// Logs the current progress line regardless of the interval
    pub fn log_progress(&self) {
        let totals = self.lock();
        self.log_line(&totals);
    }

    /// Resume offset plus tasks processed this run
    pub fn completed(&self) -> usize {
        self.resume_offset + self.lock().tasks_processed as usize
    }

    fn log_line(&self, totals: &RunTotals) {
        let completed = self.resume_offset + totals.tasks_processed as usize;
        tracing::info!(
            "{}",
            progress_line(completed, self.total_tasks, totals.decisions_found)
        );
    }

    /// Counts one extra attempt of a task
    pub fn record_retry(&self) {
        self.lock().retries += 1;
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> RunTotals {
        self.lock().clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    pub fn resume_offset(&self) -> usize {
        self.resume_offset
    }
}
