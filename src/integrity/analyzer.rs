//! Read-only questions asked of the store: drift, duplicates, missing files
//! and summary statistics.

use serde::Serialize;

use super::groups::{group_records, DuplicateGroup};
use crate::store::{FileRecord, IntegrityStore, StoreResult};

/// Aggregate figures for `--db-stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Rows in the checksum table
    pub tracked_files: u64,
    /// Rows in the run log
    pub run_count: u64,
    /// Files belonging to some duplicate group
    pub duplicate_members: u64,
    /// Number of duplicate groups
    pub duplicate_groups: u64,
    /// Files whose latest hashes differ from the baseline
    pub drifted_files: u64,
    /// Tracked file count per extension, ordered by extension
    pub by_extension: Vec<(String, u64)>,
}

/// Analyzer over an open store.
#[derive(Debug)]
pub struct Analyzer<'a> {
    store: &'a IntegrityStore,
}

impl<'a> Analyzer<'a> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: &'a IntegrityStore) -> Self {
        Self { store }
    }

    /// Records whose latest observation no longer matches the baseline.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error.
    pub fn drifted(&self) -> StoreResult<Vec<FileRecord>> {
        self.store.drifted_records()
    }

    /// Records sharing a baseline hash pair with at least one other record.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error.
    pub fn duplicates(&self) -> StoreResult<Vec<DuplicateGroup>> {
        Ok(group_records(self.store.duplicate_members()?))
    }

    /// Records whose file is no longer present at its stored location.
    ///
    /// A location that cannot be checked (permission denied on a parent,
    /// for instance) counts as present; only a definite "not found" flags it.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error.
    pub fn missing(&self) -> StoreResult<Vec<FileRecord>> {
        let records = self.store.all_records()?;
        Ok(records
            .into_iter()
            .filter(|record| {
                let path = record.full_path();
                match path.try_exists() {
                    Ok(exists) => !exists,
                    Err(e) => {
                        log::debug!("Cannot check {}: {}", path.display(), e);
                        false
                    }
                }
            })
            .collect())
    }

    /// Compute summary statistics.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let groups = self.duplicates()?;
        let duplicate_members: usize = groups.iter().map(DuplicateGroup::member_count).sum();

        Ok(StoreStats {
            tracked_files: self.store.total_rows()?,
            run_count: self.store.run_count()?,
            duplicate_members: duplicate_members as u64,
            duplicate_groups: groups.len() as u64,
            drifted_files: self.store.drifted_records()?.len() as u64,
            by_extension: self.store.extension_counts()?,
        })
    }
}

/// Delete the given records from the store, returning how many were removed.
///
/// Only the explicit `--purge-missing` action calls this; scans never delete.
///
/// # Errors
///
/// Returns the first store error; records deleted before it stay deleted.
pub fn purge_records(store: &IntegrityStore, records: &[FileRecord]) -> StoreResult<usize> {
    let mut removed = 0;
    for record in records {
        if store.delete_record(record.id)? {
            log::info!("Purged {}", record.full_path().display());
            removed += 1;
        }
    }
    Ok(removed)
}
