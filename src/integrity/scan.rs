//! Scan orchestration: walk the monitored tree, hash every file and upsert
//! the observations.
//!
//! # Overview
//!
//! A scan makes two passes over the tree:
//! 1. **Counting**: enumerate accepted files to size the progress bar
//! 2. **Processing**: hash each file and record it in the store
//!
//! Files that cannot be read are logged, counted in
//! [`ScanSummary::errors`] and skipped. Store failures abort the scan.
//!
//! # Example
//!
//! ```no_run
//! use fixity::integrity::{IntegrityScanner, ScanConfig};
//! use fixity::store::IntegrityStore;
//! use std::path::Path;
//!
//! let store = IntegrityStore::open(Path::new("checksums.db")).unwrap();
//! let scanner = IntegrityScanner::new(ScanConfig::default());
//! let summary = scanner.scan(Path::new("/srv/photos"), &store).unwrap();
//!
//! println!("{} new, {} rechecked", summary.inserted, summary.updated);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use rayon::prelude::*;

use crate::progress::{EtaEstimate, ProgressCallback, PHASE_COUNTING, PHASE_HASHING};
use crate::scanner::{FileDescriptor, FileDigest, HashError, Hasher, ScanError, Walker, WalkerConfig};
use crate::store::{IntegrityStore, Observation, StoreError, UpsertOutcome};

/// Files hashed per parallel batch before their upserts are committed.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Configuration for a scan.
#[derive(Clone)]
pub struct ScanConfig {
    /// Walker settings (ignored extensions, symlink handling).
    pub walker_config: WalkerConfig,
    /// Number of hashing threads. 1 hashes sequentially on the caller's thread.
    pub io_threads: usize,
    /// Files per batch when `io_threads > 1`.
    pub batch_size: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("walker_config", &self.walker_config)
            .field("io_threads", &self.io_threads)
            .field("batch_size", &self.batch_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            walker_config: WalkerConfig::default(),
            io_threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ScanConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the number of hashing threads (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the parallel batch size (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Outcome of one scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Files found by the counting pass
    pub total_files: usize,
    /// Files hashed and recorded
    pub processed: usize,
    /// Files seen for the first time
    pub inserted: usize,
    /// Files already tracked, latest hashes refreshed
    pub updated: usize,
    /// Files (or directories) skipped because of an error
    pub errors: Vec<ScanError>,
    /// Wall-clock duration of both passes
    pub duration: Duration,
    /// Whether the scan stopped early on a shutdown request
    pub interrupted: bool,
}

impl ScanSummary {
    /// Number of skipped entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether any entry was skipped.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        self.processed += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }
}

/// Errors that abort a scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanRunError {
    /// The monitored root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The monitored root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The hashing thread pool could not be created.
    #[error("Failed to create hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The store rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives a scan of one monitored tree into an [`IntegrityStore`].
#[derive(Debug)]
pub struct IntegrityScanner {
    config: ScanConfig,
    hasher: Hasher,
}

impl IntegrityScanner {
    /// Create a scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            hasher: Hasher::new(),
        }
    }

    /// Scan `root`, recording one observation per accepted file.
    ///
    /// Records are created for new files and have their latest hashes
    /// replaced for known files. Nothing is ever deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ScanRunError`] if the root is not a readable directory, the
    /// thread pool cannot be built, or the store fails. Per-file problems
    /// are reported in [`ScanSummary::errors`] instead.
    pub fn scan(&self, root: &Path, store: &IntegrityStore) -> Result<ScanSummary, ScanRunError> {
        let start = Instant::now();
        let mut summary = ScanSummary::default();

        if !root.exists() {
            return Err(ScanRunError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanRunError::NotADirectory(root.to_path_buf()));
        }

        log::info!("Scanning {}", root.display());

        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let callback = self.config.progress_callback.as_ref();

        if let Some(cb) = callback {
            cb.on_phase_start(PHASE_COUNTING, 0);
        }
        summary.total_files = walker.count();
        if let Some(cb) = callback {
            cb.on_phase_end(PHASE_COUNTING);
        }
        log::info!("{} files to check", summary.total_files);

        if self.config.is_shutdown_requested() {
            summary.interrupted = true;
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        if let Some(cb) = callback {
            cb.on_phase_start(PHASE_HASHING, summary.total_files);
        }

        let mut tracker = ProgressTracker::new(start, summary.total_files, callback);
        if self.config.io_threads > 1 {
            self.process_parallel(&walker, store, &mut summary, &mut tracker)?;
        } else {
            self.process_sequential(&walker, store, &mut summary, &mut tracker)?;
        }

        if let Some(cb) = callback {
            cb.on_phase_end(PHASE_HASHING);
        }

        if self.config.is_shutdown_requested() {
            summary.interrupted = true;
            log::warn!(
                "Scan interrupted after {} of {} files",
                summary.processed,
                summary.total_files
            );
        }

        summary.duration = start.elapsed();
        log::info!(
            "Scan finished: {} processed ({} new, {} updated), {} skipped in {:.2}s",
            summary.processed,
            summary.inserted,
            summary.updated,
            summary.error_count(),
            summary.duration.as_secs_f64()
        );

        Ok(summary)
    }

    fn process_sequential(
        &self,
        walker: &Walker,
        store: &IntegrityStore,
        summary: &mut ScanSummary,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<(), ScanRunError> {
        for result in walker.walk() {
            if self.config.is_shutdown_requested() {
                break;
            }

            let descriptor = match result {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    summary.errors.push(e);
                    continue;
                }
            };

            tracker.advance(&descriptor);
            match self.hasher.hash_file(&descriptor.path) {
                Ok(digest) => {
                    let outcome = store.upsert_observation(&Observation::new(&descriptor, digest))?;
                    summary.record(outcome);
                }
                Err(e) => skip_file(summary, e),
            }
        }
        Ok(())
    }

    fn process_parallel(
        &self,
        walker: &Walker,
        store: &IntegrityStore,
        summary: &mut ScanSummary,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<(), ScanRunError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()?;
        log::debug!("Hashing with {} threads", self.config.io_threads);

        let mut batch = Vec::with_capacity(self.config.batch_size);
        for result in walker.walk() {
            if self.config.is_shutdown_requested() {
                return Ok(());
            }

            match result {
                Ok(descriptor) => {
                    batch.push(descriptor);
                    if batch.len() >= self.config.batch_size {
                        self.process_batch(&pool, std::mem::take(&mut batch), store, summary, tracker)?;
                    }
                }
                Err(e) => summary.errors.push(e),
            }
        }

        if !batch.is_empty() && !self.config.is_shutdown_requested() {
            self.process_batch(&pool, batch, store, summary, tracker)?;
        }
        Ok(())
    }

    fn process_batch(
        &self,
        pool: &rayon::ThreadPool,
        batch: Vec<FileDescriptor>,
        store: &IntegrityStore,
        summary: &mut ScanSummary,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<(), ScanRunError> {
        let hasher = &self.hasher;
        let hashed: Vec<(FileDescriptor, Result<FileDigest, HashError>)> = pool.install(|| {
            batch
                .into_par_iter()
                .map(|descriptor| {
                    let result = hasher.hash_file(&descriptor.path);
                    (descriptor, result)
                })
                .collect()
        });

        let mut observations = Vec::with_capacity(hashed.len());
        for (descriptor, result) in hashed {
            tracker.advance(&descriptor);
            match result {
                Ok(digest) => observations.push(Observation::new(&descriptor, digest)),
                Err(e) => skip_file(summary, e),
            }
        }

        for outcome in store.upsert_batch(&observations)? {
            summary.record(outcome);
        }
        Ok(())
    }
}

fn skip_file(summary: &mut ScanSummary, error: HashError) {
    log::warn!("Skipping {}: {}", error.path().display(), error);
    summary.errors.push(ScanError::from(error));
}

/// Per-file progress reporting with a message on every directory change.
struct ProgressTracker<'a> {
    start: Instant,
    total: usize,
    count: usize,
    current_dir: Option<String>,
    callback: Option<&'a Arc<dyn ProgressCallback>>,
}

impl<'a> ProgressTracker<'a> {
    fn new(start: Instant, total: usize, callback: Option<&'a Arc<dyn ProgressCallback>>) -> Self {
        Self {
            start,
            total,
            count: 0,
            current_dir: None,
            callback,
        }
    }

    fn advance(&mut self, descriptor: &FileDescriptor) {
        self.count += 1;
        log::trace!("Checking {}", descriptor.path.display());

        if self.current_dir.as_deref() != Some(descriptor.directory.as_str()) {
            self.current_dir = Some(descriptor.directory.clone());
            let message = match EtaEstimate::compute(self.start.elapsed(), self.count, self.total)
            {
                Some(eta) => format!(
                    "{} | {}",
                    descriptor.directory,
                    eta.describe(self.count, self.total, Local::now())
                ),
                None => descriptor.directory.clone(),
            };
            log::debug!("Processing: {}", message);
            if let Some(cb) = self.callback {
                cb.on_message(&message);
            }
        }

        if let Some(cb) = self.callback {
            cb.on_progress(self.count, &descriptor.path.to_string_lossy());
        }
    }
}
