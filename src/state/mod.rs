//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskOutcome`: how a single (court, date) search ended
//! - `RunState`: lock-protected counters shared by all workers
//! - `ShutdownFlag`: cooperative stop request set by the signal handler
//! - progress lines: the log format read back when resuming

mod outcome;
pub mod progress;
mod run_state;

// Re-export main types
pub use outcome::TaskOutcome;
pub use progress::{format_count, parse_progress_line, progress_line};
pub use run_state::{RunState, RunTotals, ShutdownFlag};
