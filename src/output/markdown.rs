//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of the merged
//! dataset and, when available, the run that produced it.

use crate::output::merge::MergeReport;
use crate::output::stats::DatasetSummary;
use crate::state::{format_count, RunTotals};
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary file
///
/// # Arguments
///
/// * `summary` - The dataset summary
/// * `merge` - The merge that produced the dataset
/// * `run` - Counters of the run, if one just finished
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(SweepError)` - Failed to write summary
pub fn generate_markdown_summary(
    summary: &DatasetSummary,
    merge: &MergeReport,
    run: Option<&RunTotals>,
    output_path: &Path,
) -> Result<()> {
    let markdown = format_markdown_summary(summary, merge, run);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a dataset summary as markdown
pub fn format_markdown_summary(
    summary: &DatasetSummary,
    merge: &MergeReport,
    run: Option<&RunTotals>,
) -> String {
    let mut md = String::new();

    md.push_str("# Court Decisions Dataset Summary\n\n");
    md.push_str(&format!("- **Generated**: {}\n", summary.generated_at));
    md.push_str(&format!(
        "- **Dataset**: {}\n\n",
        merge.dataset_path.display()
    ));

    if let Some(run) = run {
        md.push_str("## Run\n\n");
        md.push_str(&format!(
            "- **Tasks Processed**: {}\n",
            format_count(run.tasks_processed as usize)
        ));
        md.push_str(&format!(
            "- **Decisions Found**: {}\n",
            format_count(run.decisions_found as usize)
        ));
        md.push_str(&format!("- **Empty Results**: {}\n", run.empty_results));
        md.push_str(&format!("- **Errors**: {}\n", run.errors));
        md.push_str(&format!("- **Retries**: {}\n", run.retries));
        md.push_str(&format!(
            "- **Error Rate**: {:.2}%\n\n",
            run.error_rate() * 100.0
        ));
    }

    md.push_str("## Merge\n\n");
    md.push_str(&format!(
        "- **Checkpoints Merged**: {}\n",
        merge.checkpoints_merged
    ));
    md.push_str(&format!(
        "- **Records Already In Dataset**: {}\n",
        merge.existing_records
    ));
    md.push_str(&format!(
        "- **Records From Checkpoints**: {}\n",
        merge.checkpoint_records
    ));
    md.push_str(&format!(
        "- **Duplicates Removed**: {}\n\n",
        merge.duplicates_removed
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Total Decisions**: {}\n",
        format_count(summary.total_records)
    ));
    md.push_str(&format!("- **Unique Courts**: {}\n", summary.unique_courts));
    if let (Some(earliest), Some(latest)) = (&summary.earliest_date, &summary.latest_date) {
        md.push_str(&format!("- **Search Dates**: {} to {}\n", earliest, latest));
    }
    md.push_str(&format!(
        "- **Distinct Case Types**: {}\n\n",
        summary.case_type_count
    ));

    if !summary.by_court_type.is_empty() {
        md.push_str("## Decisions by Court Type\n\n");
        md.push_str("| Court Type | Decisions |\n");
        md.push_str("|------------|-----------|\n");
        for (court_type, count) in &summary.by_court_type {
            md.push_str(&format!("| {} | {} |\n", court_type, count));
        }
        md.push('\n');
    }

    if !summary.top_courts.is_empty() {
        md.push_str(&format!(
            "## Top {} Courts\n\n",
            summary.top_courts.len()
        ));
        md.push_str("| Court | Decisions |\n");
        md.push_str("|-------|-----------|\n");
        for entry in &summary.top_courts {
            md.push_str(&format!("| {} | {} |\n", entry.name, entry.count));
        }
        md.push('\n');
    }

    if !summary.by_year.is_empty() {
        md.push_str("## Decisions by Year\n\n");
        md.push_str("| Year | Decisions |\n");
        md.push_str("|------|-----------|\n");
        for (year, count) in &summary.by_year {
            md.push_str(&format!("| {} | {} |\n", year, count));
        }
        md.push('\n');
    }

    if !summary.top_case_types.is_empty() {
        md.push_str("## Top Case Types\n\n");
        md.push_str("| Case Type | Decisions |\n");
        md.push_str("|-----------|-----------|\n");
        for entry in &summary.top_case_types {
            md.push_str(&format!("| {} | {} |\n", entry.name, entry.count));
        }
        md.push('\n');
    }

    md.push_str("## Download Availability\n\n");
    md.push_str("| Status | Decisions |\n");
    md.push_str("|--------|-----------|\n");
    md.push_str(&format!(
        "| Link | {} |\n",
        summary.downloads.with_link
    ));
    md.push_str(&format!(
        "| Upload Pending | {} |\n",
        summary.downloads.upload_pending
    ));
    md.push_str(&format!(
        "| N/A | {} |\n\n",
        summary.downloads.unavailable
    ));
    md.push_str(&format!(
        "Availability: {:.2}%\n",
        summary.downloads.availability_percentage()
    ));

    md
}
