//! CSV export of store contents.
//!
//! Every report is one file in the output directory with a header row named
//! after the fields of its row type. Empty reports are not written.
//!
//! # Reports
//!
//! | File             | Rows                                  |
//! |------------------|---------------------------------------|
//! | `runlog.csv`     | [`RunLogRow`], one per logged run      |
//! | `all_files.csv`  | [`RecordRow`], every tracked file      |
//! | `failures.csv`   | [`RecordRow`], drifted files only      |
//! | `duplicates.csv` | [`DuplicateRow`], grouped members      |
//! | `missing.csv`    | [`RecordRow`], files gone from disk    |
//!
//! Timestamps are written in local time as `YYYY-MM-DD HH:MM:SS`.
//!
//! # Example
//!
//! ```no_run
//! use fixity::output::csv::{CsvReport, RecordRow, FAILURES_REPORT};
//! use fixity::store::IntegrityStore;
//! use std::path::Path;
//!
//! let store = IntegrityStore::open(Path::new("checksums.db")).unwrap();
//! let rows: Vec<RecordRow> = store.drifted_records().unwrap().iter().map(RecordRow::from).collect();
//!
//! match CsvReport::new(Path::new(".")).write_file(FAILURES_REPORT, &rows).unwrap() {
//!     Some(path) => println!("Report written to file: {}", path.display()),
//!     None => println!("No failures detected."),
//! }
//! ```
//!
//! [`DuplicateRow`]: crate::integrity::DuplicateRow

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::store::{FileRecord, RunLogEntry};

/// Run history export.
pub const RUNLOG_REPORT: &str = "runlog.csv";
/// Every tracked record.
pub const ALL_FILES_REPORT: &str = "all_files.csv";
/// Drifted records.
pub const FAILURES_REPORT: &str = "failures.csv";
/// Duplicate group members.
pub const DUPLICATES_REPORT: &str = "duplicates.csv";
/// Records whose file is gone.
pub const MISSING_REPORT: &str = "missing.csv";

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// Report file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One tracked file, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRow {
    /// Row id in the store
    pub id: i64,
    /// Containing directory
    pub path: String,
    /// File name
    pub filename: String,
    /// Upper-cased extension
    pub extension: String,
    /// Strong digest at first sight
    pub base_hash_strong: String,
    /// Strong digest at last scan
    pub latest_hash_strong: String,
    /// Fast checksum at first sight
    pub base_hash_fast: String,
    /// Fast checksum at last scan
    pub latest_hash_fast: String,
    /// First seen (local time)
    pub date_added: String,
    /// Last scanned (local time)
    pub date_updated: String,
}

impl From<&FileRecord> for RecordRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            path: record.path.clone(),
            filename: record.filename.clone(),
            extension: record.extension.clone(),
            base_hash_strong: record.base_hash_strong.clone(),
            latest_hash_strong: record.latest_hash_strong.clone(),
            base_hash_fast: record.base_hash_fast.clone(),
            latest_hash_fast: record.latest_hash_fast.clone(),
            date_added: local_timestamp(record.date_added),
            date_updated: local_timestamp(record.date_updated),
        }
    }
}

/// One logged run, as exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogRow {
    /// Row id in the store
    pub id: i64,
    /// Monitored root directory
    pub monitor_dir: String,
    /// Store file
    pub db_path: String,
    /// Ignored extensions
    pub ignore_ext: String,
    /// Duration in seconds
    pub run_seconds: f64,
    /// When the run was logged (local time)
    pub run_date: String,
    /// Invocation parameters as JSON
    pub prg_args: String,
    /// Files hashed and upserted
    pub files_processed: u64,
    /// Files skipped because of an error
    pub files_errored: u64,
}

impl From<&RunLogEntry> for RunLogRow {
    fn from(entry: &RunLogEntry) -> Self {
        Self {
            id: entry.id,
            monitor_dir: entry.monitor_dir.clone(),
            db_path: entry.db_path.clone(),
            ignore_ext: entry.ignore_ext.clone(),
            run_seconds: entry.run_seconds,
            run_date: local_timestamp(entry.run_date),
            prg_args: entry.prg_args.clone(),
            files_processed: entry.files_processed,
            files_errored: entry.files_errored,
        }
    }
}

/// Writes CSV reports into one directory.
#[derive(Debug, Clone)]
pub struct CsvReport {
    dir: PathBuf,
}

impl CsvReport {
    /// Create a writer for reports in `dir`.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Write `rows` to `<dir>/<name>`, replacing any previous report.
    ///
    /// Returns `Ok(None)` when `rows` is empty. A report of the same name
    /// left by an earlier run is removed so it cannot contradict the result.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if the file cannot be created or a row
    /// cannot be serialized.
    pub fn write_file<R: Serialize>(
        &self,
        name: &str,
        rows: &[R],
    ) -> Result<Option<PathBuf>, CsvOutputError> {
        let path = self.dir.join(name);

        if rows.is_empty() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed stale report {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CsvOutputError::Io { path, source }),
            }
            return Ok(None);
        }

        let file = std::fs::File::create(&path).map_err(|source| CsvOutputError::Io {
            path: path.clone(),
            source,
        })?;
        write_rows(file, rows).map_err(|e| match e {
            CsvOutputError::Io { source, .. } => CsvOutputError::Io {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        log::debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(Some(path))
    }
}

/// Serialize `rows` with a header line to any writer.
///
/// # Errors
///
/// Returns `CsvOutputError` if writing or serialization fails.
pub fn write_rows<W: io::Write, R: Serialize>(writer: W, rows: &[R]) -> Result<(), CsvOutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(|source| CsvOutputError::Io {
        path: PathBuf::new(),
        source,
    })?;
    Ok(())
}

fn local_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
