//! Checkpoint files and the shared sink that fills them
//!
//! A checkpoint is a CSV file named `checkpoint_NNNN.csv` holding one batch
//! of decision records. Files are written once under a temporary name and
//! renamed into place, so a checkpoint that exists is always complete.

use crate::model::{DecisionRecord, Task, TaskKey, COLUMNS};
use crate::state::TaskOutcome;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_SUFFIX: &str = ".csv";

/// A checkpoint file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointFile {
    pub number: u32,
    pub path: PathBuf,
}

/// File name for checkpoint `number`
pub fn checkpoint_file_name(number: u32) -> String {
    format!("{}{:04}{}", CHECKPOINT_PREFIX, number, CHECKPOINT_SUFFIX)
}

/// Extracts the number from a checkpoint file name
///
/// Returns `None` for any name that is not `checkpoint_<digits>.csv`.
pub fn parse_checkpoint_number(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lists checkpoint files in numeric order
///
/// A missing directory has no checkpoints. Files that do not follow the
/// checkpoint naming scheme are ignored.
pub fn list_checkpoints(dir: &Path) -> StorageResult<Vec<CheckpointFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(number) = name.to_str().and_then(parse_checkpoint_number) {
            files.push(CheckpointFile {
                number,
                path: entry.path(),
            });
        }
    }
    files.sort_by_key(|f| f.number);
    Ok(files)
}

/// Reads every record of one checkpoint file
pub fn read_checkpoint(path: &Path) -> StorageResult<Vec<DecisionRecord>> {
    let read_error = |source: csv::Error| StorageError::CheckpointRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<DecisionRecord>, _>>()
        .map_err(read_error)
}

/// Writes records as CSV with a header row, through a temporary file
///
/// An empty slice still produces the header row.
pub(crate) fn write_records_atomic(path: &Path, records: &[DecisionRecord]) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        if records.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Writes numbered checkpoint files into one directory
#[derive(Debug)]
pub struct CheckpointWriter {
    dir: PathBuf,
    next_number: u32,
}

impl CheckpointWriter {
    /// Opens the checkpoint directory, creating it if needed
    ///
    /// Numbering continues after the highest existing checkpoint.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        let next_number = list_checkpoints(dir)?
            .last()
            .map(|f| f.number + 1)
            .unwrap_or(1);
        Ok(Self {
            dir: dir.to_path_buf(),
            next_number,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_number(&self) -> u32 {
        self.next_number
    }

    /// Writes `batch` to the next checkpoint file
    ///
    /// # Returns
    ///
    /// * `Ok(Some(file))` - Checkpoint written
    /// * `Ok(None)` - Nothing to write for an empty batch
    /// * `Err(StorageError)` - The file could not be written
    pub fn flush(&mut self, batch: &[DecisionRecord]) -> StorageResult<Option<CheckpointFile>> {
        if batch.is_empty() {
            return Ok(None);
        }

        let number = self.next_number;
        // A failed write may leave debris behind; never reuse its number.
        self.next_number += 1;

        let path = self.dir.join(checkpoint_file_name(number));
        write_records_atomic(&path, batch)?;
        tracing::info!(
            "Checkpoint saved: {} ({} records)",
            path.display(),
            batch.len()
        );
        Ok(Some(CheckpointFile { number, path }))
    }
}

/// Totals reported by a sink once it is finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub checkpoints: Vec<PathBuf>,
    pub records_written: u64,
    pub write_failures: u64,
    pub keys_marked: u64,
}

struct SinkInner<P> {
    writer: CheckpointWriter,
    progress: P,
    buffer: Vec<DecisionRecord>,
    /// Keys of the tasks whose records sit in `buffer`
    buffered_keys: Vec<TaskKey>,
    /// Keys of completed tasks that produced no records
    empty_keys: Vec<TaskKey>,
    stats: SinkStats,
}

impl<P: ProgressStore> SinkInner<P> {
    fn flush_records(&mut self) {
        let records = std::mem::take(&mut self.buffer);
        let keys = std::mem::take(&mut self.buffered_keys);
        if records.is_empty() {
            self.mark(&keys);
            return;
        }

        match self.writer.flush(&records) {
            Ok(Some(file)) => {
                self.stats.records_written += records.len() as u64;
                if let Err(e) = self.progress.record_checkpoint(
                    file.number,
                    &file.path.to_string_lossy(),
                    records.len(),
                ) {
                    tracing::error!("Failed to record checkpoint {}: {}", file.number, e);
                }
                self.stats.checkpoints.push(file.path);
                self.mark(&keys);
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.write_failures += 1;
                tracing::error!(
                    "Failed to write checkpoint ({} records, {} tasks will be redone on resume): {}",
                    records.len(),
                    keys.len(),
                    e
                );
            }
        }
    }

    fn flush_empty(&mut self) {
        let keys = std::mem::take(&mut self.empty_keys);
        self.mark(&keys);
    }

    fn mark(&mut self, keys: &[TaskKey]) {
        if keys.is_empty() {
            return;
        }
        match self.progress.mark_completed(keys) {
            Ok(()) => self.stats.keys_marked += keys.len() as u64,
            Err(e) => tracing::error!("Failed to mark {} tasks completed: {}", keys.len(), e),
        }
    }
}

/// Record buffer shared by all workers
///
/// Records accumulate under one lock; once `batch_size` records are
/// buffered they are written to a new checkpoint while the lock is held.
/// Task keys reach the progress index only after their records are on disk.
pub struct CheckpointSink<P> {
    inner: Mutex<SinkInner<P>>,
    batch_size: usize,
}

impl<P: ProgressStore> CheckpointSink<P> {
    pub fn new(writer: CheckpointWriter, progress: P, batch_size: usize) -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                writer,
                progress,
                buffer: Vec::new(),
                buffered_keys: Vec::new(),
                empty_keys: Vec::new(),
                stats: SinkStats::default(),
            }),
            batch_size: batch_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkInner<P>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Takes the result of one finished task
    ///
    /// Errored tasks leave no trace, so a resumed run tries them again.
    pub fn accept(&self, task: &Task, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Success(records) => {
                let mut inner = self.lock();
                inner.buffer.extend(records.iter().cloned());
                inner.buffered_keys.push(task.key());
                if inner.buffer.len() >= self.batch_size {
                    inner.flush_records();
                }
            }
            TaskOutcome::EmptyResult => {
                let mut inner = self.lock();
                inner.empty_keys.push(task.key());
                if inner.empty_keys.len() >= self.batch_size {
                    inner.flush_empty();
                }
            }
            TaskOutcome::TransientError(_) | TaskOutcome::FatalError(_) => {}
        }
    }

    /// Number of records waiting for the next checkpoint
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Writes whatever is still buffered
    pub fn flush(&self) {
        let mut inner = self.lock();
        inner.flush_records();
        inner.flush_empty();
    }

    /// Flushes the buffer and hands back the progress store
    pub fn finish(self) -> (P, SinkStats) {
        let mut inner = self
            .inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.flush_records();
        inner.flush_empty();
        (inner.progress, inner.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourtDescriptor, CourtType, DownloadLink};
    use crate::storage::SqliteProgress;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(reg: &str, court_id: &str, date: &str) -> DecisionRecord {
        DecisionRecord {
            search_date: date.parse().unwrap(),
            court_type_code: "S".into(),
            court_type_name: "सर्वोच्च अदालत".into(),
            court_id: court_id.into(),
            court_name: "Supreme Court".into(),
            serial_no: "1".into(),
            registration_no: reg.into(),
            case_no: "075-CR-0001".into(),
            registration_date: "2075-01-02".into(),
            case_type: "Criminal".into(),
            case_name: "Theft, with a comma".into(),
            plaintiff: "नेपाल सरकार".into(),
            defendant: "Someone".into(),
            decision_date: "2076-03-04".into(),
            download_url: DownloadLink::UploadPending,
            scraped_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    fn task(court_id: &str, date: &str) -> Task {
        Task {
            court: Arc::new(CourtDescriptor::new(court_id, "Court", CourtType::Supreme)),
            date: date.parse().unwrap(),
            sequence_index: 0,
        }
    }

    #[test]
    fn test_parse_checkpoint_number() {
        assert_eq!(parse_checkpoint_number("checkpoint_0001.csv"), Some(1));
        assert_eq!(parse_checkpoint_number("checkpoint_12345.csv"), Some(12345));
        assert_eq!(parse_checkpoint_number("checkpoint_.csv"), None);
        assert_eq!(parse_checkpoint_number("checkpoint_0001.csv.tmp"), None);
        assert_eq!(parse_checkpoint_number("notes.csv"), None);
        assert_eq!(checkpoint_file_name(7), "checkpoint_0007.csv");
    }

    #[test]
    fn test_write_and_read_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut writer = CheckpointWriter::open(dir.path()).unwrap();
        let records = vec![
            record("A", "1", "2070-01-01"),
            record("B", "1", "2070-01-01"),
        ];

        let file = writer.flush(&records).unwrap().unwrap();
        assert_eq!(file.number, 1);
        assert!(file.path.ends_with("checkpoint_0001.csv"));
        assert_eq!(read_checkpoint(&file.path).unwrap(), records);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut writer = CheckpointWriter::open(dir.path()).unwrap();
        assert!(writer.flush(&[]).unwrap().is_none());
        assert!(list_checkpoints(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_numbering_continues_after_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("checkpoint_0003.csv"), "").unwrap();
        fs::write(dir.path().join("checkpoint_0010.csv"), "").unwrap();
        fs::write(dir.path().join("summary.json"), "{}").unwrap();

        let mut writer = CheckpointWriter::open(dir.path()).unwrap();
        assert_eq!(writer.next_number(), 11);
        let file = writer
            .flush(&[record("A", "1", "2070-01-01")])
            .unwrap()
            .unwrap();
        assert_eq!(file.number, 11);

        let numbers: Vec<u32> = list_checkpoints(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.number)
            .collect();
        assert_eq!(numbers, vec![3, 10, 11]);
    }

    #[test]
    fn test_missing_dir_has_no_checkpoints() {
        let dir = TempDir::new().unwrap();
        assert!(list_checkpoints(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_sink_flushes_at_batch_size_and_marks_keys() {
        let dir = TempDir::new().unwrap();
        let writer = CheckpointWriter::open(&dir.path().join("checkpoints")).unwrap();
        let progress = SqliteProgress::new_in_memory().unwrap();
        let sink = CheckpointSink::new(writer, progress, 2);

        let t1 = task("1", "2070-01-01");
        let t2 = task("1", "2070-01-02");
        let t3 = task("1", "2070-01-03");
        let t4 = task("1", "2070-01-04");

        sink.accept(&t1, &TaskOutcome::Success(vec![record("A", "1", "2070-01-01")]));
        assert_eq!(sink.buffered(), 1);
        sink.accept(&t2, &TaskOutcome::Success(vec![record("B", "1", "2070-01-02")]));
        assert_eq!(sink.buffered(), 0);
        sink.accept(&t3, &TaskOutcome::EmptyResult);
        sink.accept(&t4, &TaskOutcome::TransientError("timeout".into()));

        let (progress, stats) = sink.finish();
        assert_eq!(stats.checkpoints.len(), 1);
        assert_eq!(stats.records_written, 2);
        assert_eq!(stats.write_failures, 0);
        assert!(progress.is_completed(&t1.key()).unwrap());
        assert!(progress.is_completed(&t2.key()).unwrap());
        assert!(progress.is_completed(&t3.key()).unwrap());
        assert!(!progress.is_completed(&t4.key()).unwrap());
        assert_eq!(progress.count_checkpoints().unwrap(), 1);
    }

    #[test]
    fn test_sink_failed_write_leaves_keys_unmarked() {
        let dir = TempDir::new().unwrap();
        let checkpoint_dir = dir.path().join("checkpoints");
        let writer = CheckpointWriter::open(&checkpoint_dir).unwrap();
        let sink = CheckpointSink::new(writer, SqliteProgress::new_in_memory().unwrap(), 10);

        let t1 = task("1", "2070-01-01");
        sink.accept(&t1, &TaskOutcome::Success(vec![record("A", "1", "2070-01-01")]));

        fs::remove_dir_all(&checkpoint_dir).unwrap();
        let (progress, stats) = sink.finish();

        assert_eq!(stats.write_failures, 1);
        assert!(stats.checkpoints.is_empty());
        assert!(!progress.is_completed(&t1.key()).unwrap());
    }
}
