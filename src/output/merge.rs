//! Checkpoint merging
//!
//! Folds every checkpoint into the final dataset. An existing dataset is
//! read first, so merges after a resumed run accumulate instead of
//! replacing earlier results.

use crate::model::{DecisionRecord, NaturalKey};
use crate::storage::{list_checkpoints, read_checkpoint, write_records_atomic, StorageError};
use crate::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub dataset_path: PathBuf,
    /// Records already in the dataset before merging
    pub existing_records: usize,
    pub checkpoints_merged: usize,
    /// Records read from checkpoints
    pub checkpoint_records: usize,
    pub duplicates_removed: usize,
    /// Records in the dataset after merging
    pub total_records: usize,
}

/// Deduplicates and sorts records
///
/// Duplicates share a natural key (registration number, court, search
/// date); the first occurrence wins. The result is ordered by court type
/// name, court name, then search date, keeping input order for ties.
///
/// # Returns
///
/// The merged records and the number of duplicates dropped
pub fn merge_records(records: impl IntoIterator<Item = DecisionRecord>) -> (Vec<DecisionRecord>, usize) {
    let mut seen: HashSet<NaturalKey> = HashSet::new();
    let mut merged = Vec::new();
    let mut duplicates = 0;

    for record in records {
        if seen.insert(record.natural_key()) {
            merged.push(record);
        } else {
            duplicates += 1;
        }
    }

    merged.sort_by(|a, b| {
        a.court_type_name
            .cmp(&b.court_type_name)
            .then_with(|| a.court_name.cmp(&b.court_name))
            .then_with(|| a.search_date.cmp(&b.search_date))
    });
    (merged, duplicates)
}

/// Reads the dataset file; a missing file is an empty dataset
pub fn read_dataset(path: &Path) -> Result<Vec<DecisionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(read_checkpoint(path)?)
}

/// Merges all checkpoints in `checkpoint_dir` into `dataset_path`
///
/// The dataset is replaced atomically. Checkpoints are deleted only after
/// the new dataset is in place; one that cannot be deleted is logged and
/// left behind, which is harmless because a later merge deduplicates it.
///
/// # Arguments
///
/// * `checkpoint_dir` - Directory holding `checkpoint_NNNN.csv` files
/// * `dataset_path` - The final dataset CSV
///
/// # Returns
///
/// * `Ok((MergeReport, records))` - The merge report and the merged records
/// * `Err(SweepError)` - A file could not be read or the dataset not written
pub fn merge_into_dataset(
    checkpoint_dir: &Path,
    dataset_path: &Path,
) -> Result<(MergeReport, Vec<DecisionRecord>)> {
    let existing = read_dataset(dataset_path)?;
    let existing_records = existing.len();

    let checkpoints = list_checkpoints(checkpoint_dir)?;
    tracing::info!(
        "Merging {} checkpoint files into {}",
        checkpoints.len(),
        dataset_path.display()
    );

    let mut all = existing;
    let mut checkpoint_records = 0;
    for file in &checkpoints {
        let records = read_checkpoint(&file.path)?;
        checkpoint_records += records.len();
        all.extend(records);
    }

    let (merged, duplicates_removed) = merge_records(all);
    if duplicates_removed > 0 {
        tracing::info!("Removed {} duplicate records", duplicates_removed);
    }

    if let Some(parent) = dataset_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_records_atomic(dataset_path, &merged)?;

    for file in &checkpoints {
        if let Err(e) = fs::remove_file(&file.path) {
            tracing::warn!(
                "Could not delete merged checkpoint {}: {}",
                file.path.display(),
                StorageError::from(e)
            );
        }
    }

    let report = MergeReport {
        dataset_path: dataset_path.to_path_buf(),
        existing_records,
        checkpoints_merged: checkpoints.len(),
        checkpoint_records,
        duplicates_removed,
        total_records: merged.len(),
    };
    tracing::info!(
        "Dataset {} now holds {} records",
        dataset_path.display(),
        report.total_records
    );
    Ok((report, merged))
}

/// Merges all checkpoints into the dataset and reports what happened
pub fn merge_checkpoints(checkpoint_dir: &Path, dataset_path: &Path) -> Result<MergeReport> {
    merge_into_dataset(checkpoint_dir, dataset_path).map(|(report, _)| report)
}
