//! Court-Sweep: a resumable court-decision crawler
//!
//! This crate enumerates every (court, date) search against a court-decision
//! search form, runs the searches on a bounded pool of worker threads,
//! checkpoints parsed decisions to disk, resumes interrupted runs, and merges
//! the checkpoints into one deduplicated dataset with summary statistics.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Court-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Search error: {0}")]
    Search(#[from] crawler::SearchError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No courts discovered for court types {0:?}")]
    NoCourts(Vec<String>),

    #[error("Worker thread panicked")]
    WorkerPanic,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown court type code: {0}")]
    InvalidCourtType(String),
}

/// Calendar date and month-table errors
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Malformed date '{0}', expected YYYY-MM-DD")]
    Malformed(String),

    #[error("Month {0} is outside 1-12")]
    InvalidMonth(u8),

    #[error("Day {day} is invalid for month {month}")]
    InvalidDay { month: u8, day: u8 },

    #[error("Month table must have 12 entries, got {0}")]
    TableSize(usize),
}

/// Result type alias for Court-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CalendarDate, CourtDescriptor, CourtType, DecisionRecord, Task, TaskKey};
pub use state::{RunState, ShutdownFlag, TaskOutcome};
