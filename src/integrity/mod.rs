//! Integrity checking: populating the store from a tree and analyzing it.
//!
//! - [`scan`]: two-pass walk, hash and upsert of a monitored tree
//! - [`analyzer`]: drift, duplicate, missing-file and statistics queries
//! - [`groups`]: grouping of records by baseline hash pair
//!
//! # Example
//!
//! ```no_run
//! use fixity::integrity::{Analyzer, IntegrityScanner, ScanConfig};
//! use fixity::store::IntegrityStore;
//! use std::path::Path;
//!
//! let store = IntegrityStore::open(Path::new("checksums.db")).unwrap();
//! IntegrityScanner::new(ScanConfig::default())
//!     .scan(Path::new("/srv/photos"), &store)
//!     .unwrap();
//!
//! for record in Analyzer::new(&store).drifted().unwrap() {
//!     println!("changed: {}", record.full_path().display());
//! }
//! ```

pub mod analyzer;
pub mod groups;
pub mod scan;

pub use analyzer::{purge_records, Analyzer, StoreStats};
pub use groups::{duplicate_rows, group_records, DuplicateGroup, DuplicateRow};
pub use scan::{IntegrityScanner, ScanConfig, ScanRunError, ScanSummary, DEFAULT_BATCH_SIZE};
