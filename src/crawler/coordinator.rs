//! Crawler coordinator - the worker pool
//!
//! This module runs a list of tasks on a fixed pool of OS threads:
//! - One search session per worker, opened before any thread starts
//! - Tasks claimed in submission order through a shared cursor
//! - Retry with exponential backoff for transient failures
//! - A randomized pause after every request
//! - Cooperative shutdown between tasks

use crate::config::CrawlConfig;
use crate::crawler::fetcher::{SearchClient, SessionFactory};
use crate::crawler::parser::{parse_search_page, ParsedPage, SearchContext};
use crate::model::Task;
use crate::state::{RunState, RunTotals, TaskOutcome};
use crate::storage::{CheckpointSink, ProgressStore};
use crate::{Result, SweepError};
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use url::Url;

/// Pool size, pacing and retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub workers: usize,
    pub delay_min: Duration,
    pub delay_max: Duration,
    /// Attempts per task, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles for each one after
    pub retry_backoff: Duration,
}

impl CrawlSettings {
    pub fn from_config(crawl: &CrawlConfig) -> Self {
        Self {
            workers: crawl.workers,
            delay_min: Duration::from_millis(crawl.delay_min_ms),
            delay_max: Duration::from_millis(crawl.delay_max_ms),
            max_attempts: crawl.max_attempts,
            retry_backoff: crawl.retry_backoff(),
        }
    }

    /// Backoff before attempt `attempt + 1`
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(1u32 << exponent)
    }

    fn request_delay(&self) -> Duration {
        if self.delay_max <= self.delay_min {
            return self.delay_min;
        }
        let min = self.delay_min.as_millis() as u64;
        let max = self.delay_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<F> {
    factory: F,
    base_url: Url,
    settings: CrawlSettings,
}

impl<F: SessionFactory> Coordinator<F> {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `factory` - Opens one search session per worker
    /// * `base_url` - Base for resolving download links
    /// * `settings` - Pool size, pacing and retry policy
    pub fn new(factory: F, base_url: Url, settings: CrawlSettings) -> Self {
        Self {
            factory,
            base_url,
            settings,
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs `tasks` to completion or until shutdown is requested
    ///
    /// Every finished task is handed to `sink` and counted in `state`.
    /// Failed tasks never stop the run. Whatever the sink still buffers is
    /// flushed before returning.
    ///
    /// # Returns
    ///
    /// * `Ok(RunTotals)` - Counters after the last worker stopped
    /// * `Err(SweepError)` - A session could not be opened or a worker panicked
    pub fn run<P>(&self, tasks: &[Task], state: &RunState, sink: &CheckpointSink<P>) -> Result<RunTotals>
    where
        P: ProgressStore + Send,
    {
        if tasks.is_empty() {
            tracing::info!("No tasks to run");
            return Ok(state.snapshot());
        }

        let workers = self.settings.workers.clamp(1, tasks.len());
        let sessions = (0..workers)
            .map(|_| self.factory.open_session())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::info!(
            "Starting {} workers for {} tasks",
            workers,
            tasks.len()
        );

        let cursor = AtomicUsize::new(0);
        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = sessions
                .into_iter()
                .enumerate()
                .map(|(worker_id, session)| {
                    let cursor = &cursor;
                    scope.spawn(move || self.worker_loop(worker_id, session, tasks, cursor, state, sink))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count()
        });

        sink.flush();

        if panicked > 0 {
            tracing::error!("{} worker threads panicked", panicked);
            return Err(SweepError::WorkerPanic);
        }
        if state.is_shutdown_requested() {
            tracing::info!("Shutdown requested, workers stopped");
        }
        Ok(state.snapshot())
    }

    fn worker_loop<P: ProgressStore>(
        &self,
        worker_id: usize,
        mut session: F::Client,
        tasks: &[Task],
        cursor: &AtomicUsize,
        state: &RunState,
        sink: &CheckpointSink<P>,
    ) {
        tracing::debug!("Worker {} started", worker_id);
        loop {
            if state.is_shutdown_requested() {
                break;
            }
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(task) = tasks.get(index) else {
                break;
            };

            let outcome = self.execute(&mut session, task, state);
            match &outcome {
                TaskOutcome::TransientError(reason) | TaskOutcome::FatalError(reason) => {
                    tracing::error!(
                        "Error scraping {} on {}: {}",
                        task.court.name,
                        task.date,
                        reason
                    );
                }
                TaskOutcome::Success(records) => {
                    tracing::debug!(
                        "Found {} decisions for {} on {}",
                        records.len(),
                        task.court.name,
                        task.date
                    );
                }
                TaskOutcome::EmptyResult => {}
            }

            sink.accept(task, &outcome);
            state.record_outcome(task, &outcome);
        }
        tracing::debug!("Worker {} stopped", worker_id);
    }

    /// Runs one task, retrying transient failures
    fn execute(&self, session: &mut F::Client, task: &Task, state: &RunState) -> TaskOutcome {
        let mut attempt = 1;
        loop {
            let outcome = self.attempt(session, task);
            self.pause();

            let retry = outcome.is_retryable()
                && attempt < self.settings.max_attempts
                && !state.is_shutdown_requested();
            if !retry {
                return outcome;
            }

            let backoff = self.settings.backoff_after(attempt);
            tracing::warn!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.settings.max_attempts,
                task.key(),
                outcome,
                backoff
            );
            state.record_retry();
            thread::sleep(backoff);
            attempt += 1;
        }
    }

    fn attempt(&self, session: &mut F::Client, task: &Task) -> TaskOutcome {
        let scraped_at = Utc::now().to_rfc3339();
        let html = match session.search(&task.court, task.date) {
            Ok(html) => html,
            Err(e) if e.is_transient() => return TaskOutcome::TransientError(e.to_string()),
            Err(e) => return TaskOutcome::FatalError(e.to_string()),
        };

        let context = SearchContext {
            base_url: &self.base_url,
            court: &task.court,
            date: task.date,
            scraped_at: &scraped_at,
        };
        match parse_search_page(&html, &context) {
            ParsedPage::Decisions(records) => TaskOutcome::from_records(records),
            ParsedPage::NotFound => TaskOutcome::EmptyResult,
            ParsedPage::Unrecognized => {
                tracing::warn!(
                    "Could not find results table for {} on {}",
                    task.court.name,
                    task.date
                );
                TaskOutcome::EmptyResult
            }
        }
    }

    fn pause(&self) {
        let delay = self.settings.request_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
