//! Row types persisted by the integrity store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::{FileDescriptor, FileDigest};

/// One tracked file, keyed by `(path, filename)`.
///
/// The `base_*` hashes are written once, when the file is first seen, and
/// are the trusted reference. The `latest_*` hashes are overwritten by every
/// scan that observes the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Row id
    pub id: i64,
    /// Containing directory
    pub path: String,
    /// File name
    pub filename: String,
    /// Upper-cased extension without the dot
    pub extension: String,
    /// First observation
    pub date_added: DateTime<Utc>,
    /// Most recent observation
    pub date_updated: DateTime<Utc>,
    /// Strong digest at first observation
    pub base_hash_strong: String,
    /// Fast checksum at first observation
    pub base_hash_fast: String,
    /// Strong digest at most recent observation
    pub latest_hash_strong: String,
    /// Fast checksum at most recent observation
    pub latest_hash_fast: String,
}

impl FileRecord {
    /// Whether the latest observation differs from the baseline.
    ///
    /// A mismatch on either hash is enough.
    #[must_use]
    pub fn is_drifted(&self) -> bool {
        self.base_hash_strong != self.latest_hash_strong
            || self.base_hash_fast != self.latest_hash_fast
    }

    /// Full path of the tracked file.
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        PathBuf::from(&self.path).join(&self.filename)
    }

    /// The duplicate-grouping key: the baseline hash pair.
    #[must_use]
    pub fn base_key(&self) -> (&str, &str) {
        (&self.base_hash_strong, &self.base_hash_fast)
    }
}

/// A single observation of a file, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Containing directory
    pub path: String,
    /// File name
    pub filename: String,
    /// Upper-cased extension without the dot
    pub extension: String,
    /// Freshly computed digests
    pub digest: FileDigest,
}

impl Observation {
    /// Pair a walker descriptor with the digests computed for it.
    #[must_use]
    pub fn new(descriptor: &FileDescriptor, digest: FileDigest) -> Self {
        Self {
            path: descriptor.directory.clone(),
            filename: descriptor.filename.clone(),
            extension: descriptor.extension.clone(),
            digest,
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was created with base = latest.
    Inserted,
    /// An existing record had its latest hashes replaced.
    Updated,
}

/// One row of the append-only run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Row id
    pub id: i64,
    /// Monitored root directory
    pub monitor_dir: String,
    /// Full path of the store file
    pub db_path: String,
    /// Ignored extensions, comma separated
    pub ignore_ext: String,
    /// Wall-clock duration of the invocation
    pub run_seconds: f64,
    /// When the run was logged
    pub run_date: DateTime<Utc>,
    /// Invocation parameters as JSON
    pub prg_args: String,
    /// Files hashed and upserted
    pub files_processed: u64,
    /// Files skipped because of an error
    pub files_errored: u64,
}

/// Values for a new run-log row; id and date are assigned by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewRunLog {
    /// Monitored root directory
    pub monitor_dir: String,
    /// Full path of the store file
    pub db_path: String,
    /// Ignored extensions, comma separated
    pub ignore_ext: String,
    /// Wall-clock duration of the invocation
    pub run_seconds: f64,
    /// Invocation parameters as JSON
    pub prg_args: String,
    /// Files hashed and upserted
    pub files_processed: u64,
    /// Files skipped because of an error
    pub files_errored: u64,
}
