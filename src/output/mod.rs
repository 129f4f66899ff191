//! Output module for the final dataset and its reports
//!
//! This module handles:
//! - Merging checkpoints into one deduplicated, sorted dataset
//! - Summarizing the dataset (JSON, markdown and console)

mod markdown;
mod merge;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use merge::{merge_checkpoints, merge_into_dataset, merge_records, read_dataset, MergeReport};
pub use stats::{print_summary, summarize, write_json_summary, DatasetSummary};

use crate::config::OutputConfig;
use crate::state::RunTotals;
use crate::Result;

/// Merges checkpoints into the dataset and writes the summary reports
///
/// # Arguments
///
/// * `output` - Output locations
/// * `run` - Counters of the run that just finished, if any
///
/// # Returns
///
/// * `Ok((MergeReport, DatasetSummary))` - Dataset and reports written
/// * `Err(SweepError)` - Merging or writing failed
pub fn finalize_dataset(
    output: &OutputConfig,
    run: Option<&RunTotals>,
) -> Result<(MergeReport, DatasetSummary)> {
    let (report, records) = merge_into_dataset(&output.checkpoint_dir(), &output.dataset_path())?;
    let summary = summarize(&records);

    let json_path = output.summary_json_path();
    write_json_summary(&summary, &json_path)?;
    generate_markdown_summary(&summary, &report, run, &output.summary_path())?;
    tracing::info!(
        "Summaries written to {} and {}",
        json_path.display(),
        output.summary_path().display()
    );

    Ok((report, summary))
}
