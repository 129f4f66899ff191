//! Statistics generation from the merged dataset
//!
//! This module provides functionality for summarizing the final dataset
//! and displaying or exporting the summary.

use crate::model::{DecisionRecord, DownloadLink};
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Courts listed individually in the summary
pub const TOP_COURTS: usize = 20;

/// Case types listed individually in the summary
pub const TOP_CASE_TYPES: usize = 10;

/// A label and how many records carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub name: String,
    pub count: usize,
}

/// Download column breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadAvailability {
    pub with_link: usize,
    pub upload_pending: usize,
    pub unavailable: usize,
}

impl DownloadAvailability {
    /// Share of records with a document link, in percent
    pub fn availability_percentage(&self) -> f64 {
        let total = self.with_link + self.upload_pending + self.unavailable;
        if total == 0 {
            return 0.0;
        }
        self.with_link as f64 / total as f64 * 100.0
    }
}

/// Dataset summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub generated_at: String,

    /// Total number of records
    pub total_records: usize,

    /// Number of distinct courts with at least one record
    pub unique_courts: usize,

    /// Earliest and latest search date
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,

    /// Records per court type name
    pub by_court_type: BTreeMap<String, usize>,

    /// Busiest courts, most records first
    pub top_courts: Vec<RankedCount>,

    /// Records per search year
    pub by_year: BTreeMap<String, usize>,

    /// Most common case types, most records first
    pub top_case_types: Vec<RankedCount>,

    /// Number of distinct case types
    pub case_type_count: usize,

    pub downloads: DownloadAvailability,
}

/// Sorts counts descending, ties by name, and keeps the first `limit`
fn ranked(counts: HashMap<&str, usize>, limit: usize) -> Vec<RankedCount> {
    let mut entries: Vec<RankedCount> = counts
        .into_iter()
        .map(|(name, count)| RankedCount {
            name: name.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(limit);
    entries
}

/// Builds the summary of a set of records
///
/// # Arguments
///
/// * `records` - The merged dataset
///
/// # Returns
///
/// The summary; an empty dataset yields zero counts and no date range.
pub fn summarize(records: &[DecisionRecord]) -> DatasetSummary {
    let mut by_court_type = BTreeMap::new();
    let mut by_year = BTreeMap::new();
    let mut courts: HashMap<&str, usize> = HashMap::new();
    let mut case_types: HashMap<&str, usize> = HashMap::new();
    let mut court_ids = BTreeSet::new();
    let mut downloads = DownloadAvailability::default();

    for record in records {
        *by_court_type
            .entry(record.court_type_name.clone())
            .or_insert(0) += 1;
        *by_year
            .entry(format!("{:04}", record.search_date.year))
            .or_insert(0) += 1;
        *courts.entry(record.court_name.as_str()).or_insert(0) += 1;
        court_ids.insert(record.court_id.as_str());

        let case_type = record.case_type.trim();
        if !case_type.is_empty() {
            *case_types.entry(case_type).or_insert(0) += 1;
        }

        match record.download_url {
            DownloadLink::Url(_) => downloads.with_link += 1,
            DownloadLink::UploadPending => downloads.upload_pending += 1,
            DownloadLink::Unavailable => downloads.unavailable += 1,
        }
    }

    let earliest_date = records.iter().map(|r| r.search_date).min();
    let latest_date = records.iter().map(|r| r.search_date).max();
    let case_type_count = case_types.len();

    DatasetSummary {
        generated_at: Utc::now().to_rfc3339(),
        total_records: records.len(),
        unique_courts: court_ids.len(),
        earliest_date: earliest_date.map(|d| d.to_string()),
        latest_date: latest_date.map(|d| d.to_string()),
        by_court_type,
        top_courts: ranked(courts, TOP_COURTS),
        by_year,
        top_case_types: ranked(case_types, TOP_CASE_TYPES),
        case_type_count,
        downloads,
    }
}

/// Writes the summary as pretty-printed JSON
pub fn write_json_summary(summary: &DatasetSummary, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &DatasetSummary) {
    println!("=== Dataset Summary ===\n");

    println!("Overview:");
    println!("  Total decisions: {}", summary.total_records);
    println!("  Unique courts: {}", summary.unique_courts);
    if let (Some(earliest), Some(latest)) = (&summary.earliest_date, &summary.latest_date) {
        println!("  Search dates: {} to {}", earliest, latest);
    }
    println!();

    if !summary.by_court_type.is_empty() {
        println!("By Court Type:");
        for (court_type, count) in &summary.by_court_type {
            println!("  {}: {}", court_type, count);
        }
        println!();
    }

    if !summary.by_year.is_empty() {
        println!("By Year:");
        for (year, count) in &summary.by_year {
            println!("  {}: {}", year, count);
        }
        println!();
    }

    println!("Download Availability:");
    println!(
        "  With links: {} ({:.1}%)",
        summary.downloads.with_link,
        summary.downloads.availability_percentage()
    );
    println!("  Upload pending: {}", summary.downloads.upload_pending);
    println!("  Unavailable: {}", summary.downloads.unavailable);
}
