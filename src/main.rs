//! Court-Sweep main entry point
//!
//! This is the command-line interface for the Court-Sweep crawler.

use anyhow::Context;
use clap::Parser;
use court_sweep::config::{apply_overrides, load_config_with_hash, Config, ConfigOverrides, OutputConfig};
use court_sweep::crawler::{build_task_space, crawl, discover_courts, CrawlReport};
use court_sweep::model::CourtType;
use court_sweep::output::{finalize_dataset, print_summary};
use court_sweep::state::{format_count, ShutdownFlag};
use court_sweep::storage::{list_checkpoints, open_progress, ProgressStore};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Court-Sweep: a resumable court-decision crawler
///
/// Court-Sweep searches a court-decision site for every court on every
/// date in a year range, checkpoints the results, resumes interrupted
/// runs, and merges everything into one deduplicated dataset.
#[derive(Parser, Debug)]
#[command(name = "court-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable court-decision crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error console output (the run log is unaffected)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from the first task, ignoring earlier progress
    #[arg(long)]
    fresh: bool,

    /// Discover courts and show the task space without crawling
    #[arg(long, conflicts_with_all = ["status", "merge_only"])]
    dry_run: bool,

    /// Show progress of earlier runs and exit
    #[arg(long, conflicts_with_all = ["dry_run", "merge_only"])]
    status: bool,

    /// Merge existing checkpoints into the dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "status"])]
    merge_only: bool,

    /// First year to search (overrides crawl.start-year)
    #[arg(long)]
    start_year: Option<u16>,

    /// Last year to search (overrides crawl.end-year)
    #[arg(long)]
    end_year: Option<u16>,

    /// Number of worker threads (overrides crawl.workers)
    #[arg(long)]
    workers: Option<usize>,

    /// Comma-separated court type codes, e.g. S,A,D (overrides crawl.court-types)
    #[arg(long, value_delimiter = ',', value_parser = parse_court_type)]
    court_types: Vec<CourtType>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            start_year: self.start_year,
            end_year: self.end_year,
            workers: self.workers,
            court_types: (!self.court_types.is_empty()).then(|| self.court_types.clone()),
        }
    }
}

fn parse_court_type(code: &str) -> Result<CourtType, String> {
    CourtType::from_code(code).ok_or_else(|| format!("unknown court type code '{}'", code))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration before logging, which writes into
    // the configured output directory
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let config = apply_overrides(config, &cli.overrides()).context("Invalid command-line override")?;

    setup_logging(cli.verbose, cli.quiet, &config.output)?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(config).await
    } else if cli.status {
        handle_status(&config)
    } else if cli.merge_only {
        handle_merge_only(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up console and run-log output based on verbosity level
///
/// The run log always records progress lines, since resumption reads
/// them back.
fn setup_logging(verbose: u8, quiet: bool, output: &OutputConfig) -> anyhow::Result<()> {
    let console_filter = if quiet {
        EnvFilter::new("error")
    } else {
        verbosity_filter(verbose)
    };

    std::fs::create_dir_all(&output.directory)
        .with_context(|| format!("Failed to create {}", output.directory.display()))?;
    let log_path = output.log_path();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(log_file))
                .with_filter(verbosity_filter(verbose)),
        )
        .init();

    Ok(())
}

fn verbosity_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::new("court_sweep=info,warn"),
        1 => EnvFilter::new("court_sweep=debug,info"),
        2 => EnvFilter::new("court_sweep=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Handles the --dry-run mode: discovers courts and shows the task space
async fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    println!("=== Court-Sweep Dry Run ===\n");

    println!("Site:");
    println!("  Search URL: {}", config.site.base_url);
    println!("  Court list: {}", config.site.court_list_path);

    println!("\nCrawl:");
    println!(
        "  Years: {} to {}",
        config.crawl.start_year, config.crawl.end_year
    );
    println!("  Workers: {}", config.crawl.workers);
    println!(
        "  Delay: {}-{}ms, attempts: {}",
        config.crawl.delay_min_ms, config.crawl.delay_max_ms, config.crawl.max_attempts
    );
    println!(
        "  Court types: {}",
        config
            .crawl
            .court_types
            .iter()
            .map(|t| format!("{} ({})", t.code(), t.name()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Dataset: {}", config.output.dataset_path().display());

    let (courts, space) = tokio::task::spawn_blocking(move || {
        let courts = discover_courts(&config)?;
        let space = build_task_space(&config, &courts)?;
        Ok::<_, court_sweep::SweepError>((courts, space))
    })
    .await
    .context("Court discovery task panicked")??;

    println!("\nCourts ({}):", courts.len());
    for court in &courts {
        println!("  - [{}] {} ({})", court.type_code(), court.name, court.id);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} searches ({})",
        format_count(space.len()),
        space.order().as_str()
    );

    Ok(())
}

/// Handles the --status mode: shows progress from earlier runs
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let output = &config.output;
    let progress = open_progress(&output.progress_db_path())?;

    println!("=== Court-Sweep Status ===\n");
    println!("Progress index: {}", output.progress_db_path().display());

    match progress.get_latest_run()? {
        Some(run) => {
            println!("\nLatest run: {}", run.id);
            println!("  Status: {}", run.status);
            println!("  Started: {}", run.started_at);
            match &run.finished_at {
                Some(finished) => println!("  Finished: {}", finished),
                None if !run.status.is_finished() => {
                    println!("  Finished: never recorded (still running or killed)")
                }
                None => {}
            }
            println!("  Task space: {} tasks", format_count(run.total_tasks));
        }
        None => println!("\nNo runs recorded"),
    }

    println!(
        "\nCompleted tasks: {}",
        format_count(progress.count_completed()? as usize)
    );
    println!(
        "Checkpoints written: {}",
        format_count(progress.count_checkpoints()? as usize)
    );
    println!(
        "Checkpoints awaiting merge: {}",
        list_checkpoints(&output.checkpoint_dir())?.len()
    );

    let dataset = output.dataset_path();
    if dataset.exists() {
        println!("Dataset: {}", dataset.display());
    } else {
        println!("Dataset: not written yet");
    }

    Ok(())
}

/// Handles the --merge-only mode: merges checkpoints and writes summaries
fn handle_merge_only(config: &Config) -> anyhow::Result<()> {
    println!("=== Merging Checkpoints ===\n");

    let (report, summary) = finalize_dataset(&config.output, None)?;
    println!(
        "Merged {} checkpoints ({} duplicates removed)",
        report.checkpoints_merged, report.duplicates_removed
    );
    println!("✓ Dataset written to: {}\n", report.dataset_path.display());
    print_summary(&summary);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (will resume earlier progress if any)");
    }

    let shutdown = ShutdownFlag::new();
    let signal_flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown requested. Finishing current tasks and saving progress...");
            signal_flag.request();
        }
    });

    let result = tokio::task::spawn_blocking(move || crawl(&config, fresh, shutdown))
        .await
        .context("Crawl task panicked")?;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &CrawlReport) {
    let totals = &report.totals;
    println!("\n=== Crawl Report ===\n");
    println!("Run: {}", report.run_id);
    println!(
        "Tasks: {} processed, {} skipped, {} total",
        format_count(totals.tasks_processed as usize),
        format_count(report.skipped_tasks),
        format_count(report.total_tasks)
    );
    println!(
        "Decisions found: {}",
        format_count(totals.decisions_found as usize)
    );
    println!(
        "Errors: {} ({:.2}% of processed)",
        totals.errors,
        totals.error_rate() * 100.0
    );
    println!("Checkpoints written: {}", report.checkpoints.checkpoints.len());

    if report.interrupted {
        println!("\nInterrupted. Run again to resume.");
    }
    if let Some((merge, summary)) = &report.merge {
        println!("\n✓ Dataset written to: {}\n", merge.dataset_path.display());
        print_summary(summary);
    }
}
