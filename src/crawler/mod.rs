//! Crawler module for court-decision searches
//!
//! This module contains the core crawling logic, including:
//! - Court discovery and task-space generation
//! - HTTP search sessions and error classification
//! - Result-page parsing
//! - The worker pool and overall run orchestration

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{Coordinator, CrawlSettings};
pub use fetcher::{
    build_http_client, discover_courts, fetch_court_list, HttpSearchClient, HttpSessionFactory,
    SearchClient, SearchError, SessionFactory, SUBMIT_LABEL,
};
pub use parser::{
    parse_court_options, parse_search_page, ParsedPage, SearchContext, MIN_ROW_CELLS,
    NOT_FOUND_MARKER,
};
pub use scheduler::TaskSpace;

use crate::config::Config;
use crate::model::CourtDescriptor;
use crate::output::{finalize_dataset, DatasetSummary, MergeReport};
use crate::state::{RunState, RunTotals, ShutdownFlag};
use crate::storage::{
    open_progress, plan_resume, CheckpointSink, CheckpointWriter, ProgressStore, ResumePlan,
    RunStatus, SinkStats,
};
use crate::Result;
use url::Url;

/// Everything a finished (or interrupted) crawl reports
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,
    /// Size of the full task space
    pub total_tasks: usize,
    /// Tasks skipped because an earlier run completed them
    pub skipped_tasks: usize,
    pub totals: RunTotals,
    pub checkpoints: SinkStats,
    pub interrupted: bool,
    /// Set when checkpoints were merged at the end of the run
    pub merge: Option<(MergeReport, DatasetSummary)>,
}

/// Builds the task space for `courts` from the configured years and order
pub fn build_task_space(config: &Config, courts: &[CourtDescriptor]) -> Result<TaskSpace> {
    let dates = config
        .calendar
        .month_table()?
        .date_range(config.crawl.start_year, config.crawl.end_year);
    Ok(TaskSpace::build(courts, &dates, config.crawl.task_order))
}

/// Runs a complete crawl against the configured site
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Discover courts for every configured court type
/// 2. Build the task space and decide what to resume
/// 3. Run the remaining searches on the worker pool
/// 4. Record the run outcome in the progress index
/// 5. Merge checkpoints and write summaries if the run was not interrupted
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Forget earlier progress and start from the first task
/// * `shutdown` - Flag that stops the workers between tasks
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished or stopped cleanly
/// * `Err(SweepError)` - Crawl could not start or its bookkeeping failed
pub fn crawl(config: &Config, fresh: bool, shutdown: ShutdownFlag) -> Result<CrawlReport> {
    let factory = HttpSessionFactory::new(&config.site)?;
    let courts = discover_courts(config)?;
    crawl_with(config, factory, &courts, fresh, shutdown)
}

/// Runs a crawl over `courts` with sessions from `factory`
pub fn crawl_with<F: SessionFactory>(
    config: &Config,
    factory: F,
    courts: &[CourtDescriptor],
    fresh: bool,
    shutdown: ShutdownFlag,
) -> Result<CrawlReport> {
    let base_url = Url::parse(&config.site.base_url)?;
    let space = build_task_space(config, courts)?;
    tracing::info!(
        "Task space: {} courts x {} years = {} tasks ({})",
        courts.len(),
        config.crawl.end_year - config.crawl.start_year + 1,
        space.len(),
        space.order().as_str()
    );

    let output = &config.output;
    std::fs::create_dir_all(&output.directory)?;
    let mut progress = open_progress(&output.progress_db_path())?;

    let plan = if fresh {
        tracing::info!("Fresh run requested, forgetting earlier progress");
        progress.reset()?;
        ResumePlan::Fresh
    } else {
        plan_resume(
            &progress,
            &output.log_path(),
            &output.checkpoint_dir(),
            space.len(),
            space.fingerprint(),
        )?
    };

    let remaining = space.remaining(&plan);
    let skipped_tasks = space.len() - remaining.len();
    if skipped_tasks > 0 {
        tracing::info!(
            "Skipping {} completed tasks, {} remaining",
            skipped_tasks,
            remaining.len()
        );
    }

    let run_id = progress.create_run(space.fingerprint(), space.len())?;
    tracing::info!("Starting crawl run {}", run_id);

    let writer = CheckpointWriter::open(&output.checkpoint_dir())?;
    let sink = CheckpointSink::new(writer, progress, config.crawl.batch_size);
    let state = RunState::new(
        space.len(),
        skipped_tasks,
        config.crawl.progress_interval,
        shutdown.clone(),
    );

    let coordinator = Coordinator::new(factory, base_url, CrawlSettings::from_config(&config.crawl));
    let result = coordinator.run(&remaining, &state, &sink);
    state.log_progress();

    let (mut progress, checkpoints) = sink.finish();
    let interrupted = shutdown.is_requested();
    let status = match (&result, interrupted) {
        (Err(_), _) => RunStatus::Failed,
        (Ok(_), true) => RunStatus::Interrupted,
        (Ok(_), false) => RunStatus::Completed,
    };
    progress.finish_run(run_id, status)?;
    let totals = result?;

    tracing::info!(
        "Run {} {}: processed {}, found {}, errors {} ({:.2}% error rate)",
        run_id,
        status,
        totals.tasks_processed,
        totals.decisions_found,
        totals.errors,
        totals.error_rate() * 100.0
    );
    if checkpoints.write_failures > 0 {
        tracing::error!(
            "{} checkpoint writes failed; their tasks will be redone on resume",
            checkpoints.write_failures
        );
    }

    let merge = if interrupted {
        tracing::info!(
            "Run interrupted after {} of {} tasks; rerun to resume",
            state.completed(),
            space.len()
        );
        None
    } else if output.merge_on_complete {
        Some(finalize_dataset(output, Some(&totals))?)
    } else {
        None
    };

    Ok(CrawlReport {
        run_id,
        total_tasks: space.len(),
        skipped_tasks,
        totals,
        checkpoints,
        interrupted,
        merge,
    })
}
