//! End-to-end crawl tests
//!
//! These drive complete runs through `crawl_with` with scripted sessions,
//! so they exercise scheduling, checkpointing, resumption and merging
//! without a network.

use crate::common::{
    create_test_config, not_found_page, result_row, results_page, supreme_court, ScriptedFactory,
};
use court_sweep::config::TaskOrder;
use court_sweep::crawler::{crawl_with, Coordinator, CrawlSettings, SearchError, TaskSpace};
use court_sweep::output::{merge_into_dataset, read_dataset};
use court_sweep::state::{progress_line, RunState, ShutdownFlag};
use court_sweep::storage::{
    list_checkpoints, open_progress, CheckpointSink, CheckpointWriter, ProgressStore, RunStatus,
};
use court_sweep::{CalendarDate, Config, CourtDescriptor, CourtType};
use tempfile::TempDir;
use url::Url;

const BASE_URL: &str = "https://courts.example.org/cp/";

fn registrations(config: &Config) -> Vec<String> {
    read_dataset(&config.output.dataset_path())
        .unwrap()
        .into_iter()
        .map(|r| r.registration_no)
        .collect()
}

#[test]
fn test_full_crawl_with_malformed_row() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let courts = vec![supreme_court()];

    let factory = ScriptedFactory::new(|_, date| {
        if date.month == 1 {
            let mut rows = vec![result_row("R-1"), result_row("R-2"), result_row("R-3")];
            rows.push("<tr><td>4</td><td>R-4</td><td>too short</td></tr>".to_string());
            Ok(results_page(&rows))
        } else {
            Ok(not_found_page())
        }
    });

    let report = crawl_with(&config, factory.clone(), &courts, false, ShutdownFlag::new()).unwrap();

    assert_eq!(report.total_tasks, 12);
    assert_eq!(report.skipped_tasks, 0);
    assert_eq!(report.totals.tasks_processed, 12);
    assert_eq!(report.totals.decisions_found, 3);
    assert_eq!(report.totals.errors, 0);
    assert!(!report.interrupted);
    assert_eq!(factory.searches(), 12);

    // Checkpoints are folded into the dataset and removed
    let (merge, summary) = report.merge.expect("uninterrupted run merges");
    assert_eq!(merge.total_records, 3);
    assert_eq!(summary.total_records, 3);
    assert_eq!(registrations(&config), vec!["R-1", "R-2", "R-3"]);
    assert!(list_checkpoints(&config.output.checkpoint_dir()).unwrap().is_empty());
    assert!(config.output.summary_path().exists());
    assert!(config.output.summary_json_path().exists());

    let progress = open_progress(&config.output.progress_db_path()).unwrap();
    assert_eq!(progress.count_completed().unwrap(), 12);
    let run = progress.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
}

#[test]
fn test_single_search_with_malformed_row() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let court = CourtDescriptor::new("264", "Supreme Court", CourtType::Supreme);
    let date: CalendarDate = "2075-06-01".parse().unwrap();
    let space = TaskSpace::build(&[court], &[date], TaskOrder::CourtMajor);

    let progress = open_progress(&config.output.progress_db_path()).unwrap();
    let writer = CheckpointWriter::open(&config.output.checkpoint_dir()).unwrap();
    let sink = CheckpointSink::new(writer, progress, config.crawl.batch_size);
    let state = RunState::new(space.len(), 0, config.crawl.progress_interval, ShutdownFlag::new());
    let mut settings = CrawlSettings::from_config(&config.crawl);
    settings.workers = 1;

    let factory = ScriptedFactory::new(|_, _| {
        let mut rows = vec![result_row("R-1"), result_row("R-2"), result_row("R-3")];
        rows.push("<tr><td>4</td><td>R-4</td></tr>".to_string());
        Ok(results_page(&rows))
    });
    let coordinator = Coordinator::new(factory, Url::parse(BASE_URL).unwrap(), settings);

    let totals = coordinator.run(space.tasks(), &state, &sink).unwrap();
    assert_eq!(totals.tasks_processed, 1);
    assert_eq!(totals.decisions_found, 3);
    assert_eq!(totals.errors, 0);

    let (progress, stats) = sink.finish();
    assert_eq!(stats.records_written, 3);
    assert_eq!(progress.count_completed().unwrap(), 1);
}

#[test]
fn test_timeouts_produce_empty_dataset() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());

    let factory = ScriptedFactory::new(|_, _| Err(SearchError::Timeout));
    let report =
        crawl_with(&config, factory, &[supreme_court()], false, ShutdownFlag::new()).unwrap();

    assert_eq!(report.totals.tasks_processed, 12);
    assert_eq!(report.totals.errors, 12);
    assert_eq!(report.totals.decisions_found, 0);

    // A header-only dataset is still written
    assert!(config.output.dataset_path().exists());
    assert!(registrations(&config).is_empty());

    // Failed searches are never marked complete
    let progress = open_progress(&config.output.progress_db_path()).unwrap();
    assert_eq!(progress.count_completed().unwrap(), 0);
}

#[test]
fn test_always_timeout_over_five_tasks() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let dates: Vec<CalendarDate> = (1..=5)
        .map(|month| CalendarDate::new(2075, month, 1).unwrap())
        .collect();
    let space = TaskSpace::build(&[supreme_court()], &dates, TaskOrder::CourtMajor);
    assert_eq!(space.len(), 5);

    let progress = open_progress(&config.output.progress_db_path()).unwrap();
    let writer = CheckpointWriter::open(&config.output.checkpoint_dir()).unwrap();
    let sink = CheckpointSink::new(writer, progress, config.crawl.batch_size);
    let state = RunState::new(space.len(), 0, config.crawl.progress_interval, ShutdownFlag::new());
    let coordinator = Coordinator::new(
        ScriptedFactory::new(|_, _| Err(SearchError::Timeout)),
        Url::parse(BASE_URL).unwrap(),
        CrawlSettings::from_config(&config.crawl),
    );

    let totals = coordinator.run(space.tasks(), &state, &sink).unwrap();
    assert_eq!(totals.tasks_processed, 5);
    assert_eq!(totals.errors, 5);
    assert_eq!(totals.decisions_found, 0);

    let (progress, stats) = sink.finish();
    assert!(stats.checkpoints.is_empty());
    assert_eq!(stats.keys_marked, 0);
    assert_eq!(progress.count_completed().unwrap(), 0);

    let (report, records) = merge_into_dataset(
        &config.output.checkpoint_dir(),
        &config.output.dataset_path(),
    )
    .unwrap();
    assert!(records.is_empty());
    assert_eq!(report.total_records, 0);
}

#[test]
fn test_merge_accumulates_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let courts = vec![supreme_court()];

    let first = ScriptedFactory::new(|_, date| {
        if date.month == 1 {
            Ok(results_page(&[result_row("A"), result_row("B")]))
        } else {
            Ok(not_found_page())
        }
    });
    crawl_with(&config, first, &courts, false, ShutdownFlag::new()).unwrap();
    assert_eq!(registrations(&config), vec!["A", "B"]);

    let second = ScriptedFactory::new(|_, date| {
        if date.month == 1 {
            Ok(results_page(&[result_row("B"), result_row("C")]))
        } else {
            Ok(not_found_page())
        }
    });
    let report = crawl_with(&config, second, &courts, true, ShutdownFlag::new()).unwrap();

    let (merge, _) = report.merge.unwrap();
    assert_eq!(merge.existing_records, 2);
    assert_eq!(merge.checkpoint_records, 2);
    assert_eq!(merge.duplicates_removed, 1);
    assert_eq!(registrations(&config), vec!["A", "B", "C"]);
}

#[test]
fn test_second_run_skips_completed_tasks() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let courts = vec![supreme_court()];

    let respond = |_: &CourtDescriptor, date: CalendarDate| -> Result<String, SearchError> {
        if date.month == 6 {
            Ok(results_page(&[result_row("X-1")]))
        } else {
            Ok(not_found_page())
        }
    };

    crawl_with(&config, ScriptedFactory::new(respond), &courts, false, ShutdownFlag::new())
        .unwrap();
    let before = registrations(&config);

    let factory = ScriptedFactory::new(respond);
    let report = crawl_with(&config, factory.clone(), &courts, false, ShutdownFlag::new()).unwrap();

    assert_eq!(factory.searches(), 0);
    assert_eq!(report.skipped_tasks, 12);
    assert_eq!(report.totals.tasks_processed, 0);
    assert_eq!(registrations(&config), before);
}

#[test]
fn test_resume_from_log_progress() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    std::fs::write(
        config.output.log_path(),
        format!(
            "2024-01-01T10:00:00Z  INFO {}\n",
            progress_line(5, 12, 0)
        ),
    )
    .unwrap();

    let factory = ScriptedFactory::new(|_, _| Ok(not_found_page()));
    let report =
        crawl_with(&config, factory.clone(), &[supreme_court()], false, ShutdownFlag::new())
            .unwrap();

    assert_eq!(report.skipped_tasks, 5);
    assert_eq!(report.totals.tasks_processed, 7);
    assert_eq!(factory.searches(), 7);
}

#[test]
fn test_failed_tasks_are_retried_after_recorded_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let courts = vec![supreme_court()];

    let failing = ScriptedFactory::new(|_, _| Err(SearchError::Timeout));
    let first = crawl_with(&config, failing, &courts, false, ShutdownFlag::new()).unwrap();
    assert_eq!(first.totals.errors, 12);

    // The run log counts every attempted task, including the failures
    std::fs::write(
        config.output.log_path(),
        format!("2024-01-01T10:00:00Z  INFO {}\n", progress_line(12, 12, 0)),
    )
    .unwrap();

    let factory = ScriptedFactory::new(|_, date| {
        if date.month == 3 {
            Ok(results_page(&[result_row("R-3")]))
        } else {
            Ok(not_found_page())
        }
    });
    let second =
        crawl_with(&config, factory.clone(), &courts, false, ShutdownFlag::new()).unwrap();

    assert_eq!(second.skipped_tasks, 0);
    assert_eq!(factory.searches(), 12);
    assert_eq!(registrations(&config), vec!["R-3"]);
}

#[test]
fn test_resumed_run_matches_uninterrupted_run() {
    let respond = |_: &CourtDescriptor, date: CalendarDate| -> Result<String, SearchError> {
        Ok(results_page(&[
            result_row(&format!("R-{}", date.month)),
            result_row(&format!("S-{}", date.month)),
        ]))
    };
    let courts = vec![supreme_court()];

    let baseline_dir = TempDir::new().unwrap();
    let baseline = create_test_config(BASE_URL, baseline_dir.path());
    crawl_with(&baseline, ScriptedFactory::new(respond), &courts, false, ShutdownFlag::new())
        .unwrap();
    let expected = registrations(&baseline);
    assert_eq!(expected.len(), 24);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    let shutdown = ShutdownFlag::new();
    let stopper = shutdown.clone();
    let interrupted = ScriptedFactory::new(move |court, date| {
        if date.month == 6 {
            stopper.request();
        }
        respond(court, date)
    });
    let first = crawl_with(&config, interrupted, &courts, false, shutdown).unwrap();
    assert!(first.interrupted);
    assert!(first.merge.is_none());
    let done = first.totals.tasks_processed as usize;
    assert!(done >= 6 && done < 12);

    let factory = ScriptedFactory::new(respond);
    let second =
        crawl_with(&config, factory.clone(), &courts, false, ShutdownFlag::new()).unwrap();

    assert_eq!(second.skipped_tasks, done);
    assert_eq!(factory.searches(), 12 - done);
    let (merge, _) = second.merge.unwrap();
    assert_eq!(merge.duplicates_removed, 0);
    assert_eq!(registrations(&config), expected);
}

#[test]
fn test_log_progress_for_other_task_space_is_ignored() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());
    std::fs::write(
        config.output.log_path(),
        format!("2024-01-01T10:00:00Z  INFO {}\n", progress_line(5, 99, 0)),
    )
    .unwrap();

    let factory = ScriptedFactory::new(|_, _| Ok(not_found_page()));
    let report =
        crawl_with(&config, factory.clone(), &[supreme_court()], false, ShutdownFlag::new())
            .unwrap();

    assert_eq!(report.skipped_tasks, 0);
    assert_eq!(factory.searches(), 12);
}

#[test]
fn test_interrupted_run_does_not_merge() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE_URL, dir.path());

    let shutdown = ShutdownFlag::new();
    shutdown.request();
    let factory = ScriptedFactory::new(|_, _| Ok(not_found_page()));
    let report =
        crawl_with(&config, factory.clone(), &[supreme_court()], false, shutdown).unwrap();

    assert!(report.interrupted);
    assert!(report.merge.is_none());
    assert_eq!(factory.searches(), 0);
    assert!(!config.output.dataset_path().exists());

    let progress = open_progress(&config.output.progress_db_path()).unwrap();
    let run = progress.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}
