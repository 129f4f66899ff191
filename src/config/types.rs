use crate::model::{CourtType, MonthTable, DEFAULT_MONTH_LENGTHS};
use crate::CalendarError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser identification sent with every request
///
/// The court site has rejected requests carrying default HTTP-library
/// user agents, so the crawler presents itself as a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for Court-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote search site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Search form endpoint; relative links in results resolve against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Court-list endpoint, relative to `base-url`
    #[serde(rename = "court-list-path", default = "default_court_list_path")]
    pub court_list_path: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl SiteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Order in which the (court x date) task space is enumerated
///
/// Changing the order between runs of the same dataset invalidates
/// count-based resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOrder {
    /// Outer loop over courts, inner loop over dates
    #[default]
    CourtMajor,
    /// Outer loop over dates, inner loop over courts
    DateMajor,
}

impl TaskOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourtMajor => "court-major",
            Self::DateMajor => "date-major",
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First calendar year to search (inclusive)
    #[serde(rename = "start-year", default = "default_start_year")]
    pub start_year: u16,

    /// Last calendar year to search (inclusive)
    #[serde(rename = "end-year", default = "default_end_year")]
    pub end_year: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Lower bound of the pause after each request (milliseconds)
    #[serde(rename = "delay-min-ms", default = "default_delay_ms")]
    pub delay_min_ms: u64,

    /// Upper bound of the pause after each request (milliseconds)
    #[serde(rename = "delay-max-ms", default = "default_delay_ms")]
    pub delay_max_ms: u64,

    /// Attempts per task; 1 disables retries
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles on each further retry (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Records buffered before a checkpoint is written
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Tasks between progress log lines
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Court type codes to search; redirecting types are excluded by default
    #[serde(rename = "court-types", default = "CourtType::default_set")]
    pub court_types: Vec<CourtType>,

    #[serde(rename = "task-order", default)]
    pub task_order: TaskOrder,
}

impl CrawlConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            workers: default_workers(),
            delay_min_ms: default_delay_ms(),
            delay_max_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            court_types: CourtType::default_set(),
            task_order: TaskOrder::default(),
        }
    }
}

/// Calendar used to enumerate search dates
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Days in each of the 12 months
    #[serde(rename = "month-lengths", default = "default_month_lengths")]
    pub month_lengths: Vec<u8>,
}

impl CalendarConfig {
    pub fn month_table(&self) -> Result<MonthTable, CalendarError> {
        MonthTable::from_slice(&self.month_lengths)
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            month_lengths: default_month_lengths(),
        }
    }
}

/// Output configuration
///
/// Relative file names are resolved inside `directory`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Run log; progress lines in it are read back when resuming
    #[serde(rename = "log-file", default = "default_log_file")]
    pub log_file: PathBuf,

    /// Merged, deduplicated CSV dataset
    #[serde(rename = "dataset-file", default = "default_dataset_file")]
    pub dataset_file: PathBuf,

    /// Markdown report written after a merge
    #[serde(rename = "summary-file", default = "default_summary_file")]
    pub summary_file: PathBuf,

    /// SQLite index of completed tasks
    #[serde(rename = "progress-db", default = "default_progress_db")]
    pub progress_db: PathBuf,

    /// Merge checkpoints automatically when a run finishes uninterrupted
    #[serde(rename = "merge-on-complete", default = "default_true")]
    pub merge_on_complete: bool,
}

impl OutputConfig {
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.directory.join("checkpoints")
    }

    pub fn log_path(&self) -> PathBuf {
        self.directory.join(&self.log_file)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.directory.join(&self.dataset_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory.join(&self.summary_file)
    }

    /// JSON statistics, next to the markdown report
    pub fn summary_json_path(&self) -> PathBuf {
        self.summary_path().with_extension("json")
    }

    pub fn progress_db_path(&self) -> PathBuf {
        self.directory.join(&self.progress_db)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            log_file: default_log_file(),
            dataset_file: default_dataset_file(),
            summary_file: default_summary_file(),
            progress_db: default_progress_db(),
            merge_on_complete: true,
        }
    }
}

fn default_court_list_path() -> String {
    "welcome/get_courts".to_string()
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_start_year() -> u16 {
    2069
}

fn default_end_year() -> u16 {
    2081
}

fn default_workers() -> usize {
    12
}

fn default_delay_ms() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_batch_size() -> usize {
    1000
}

fn default_progress_interval() -> usize {
    50
}

fn default_month_lengths() -> Vec<u8> {
    DEFAULT_MONTH_LENGTHS.to_vec()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./output")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("court_sweep.log")
}

fn default_dataset_file() -> PathBuf {
    PathBuf::from("court_decisions.csv")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("court_decisions_summary.md")
}

fn default_progress_db() -> PathBuf {
    PathBuf::from("progress.db")
}

fn default_true() -> bool {
    true
}
