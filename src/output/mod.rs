//! Report output.
//!
//! - CSV files for runs, records, drift, duplicates and missing files
//! - Console text for status lines and store statistics
//!
//! # Example
//!
//! ```no_run
//! use fixity::integrity::{duplicate_rows, Analyzer};
//! use fixity::output::csv::{CsvReport, DUPLICATES_REPORT};
//! use fixity::store::IntegrityStore;
//! use std::path::Path;
//!
//! let store = IntegrityStore::open(Path::new("checksums.db")).unwrap();
//! let groups = Analyzer::new(&store).duplicates().unwrap();
//!
//! CsvReport::new(Path::new("."))
//!     .write_file(DUPLICATES_REPORT, &duplicate_rows(&groups))
//!     .unwrap();
//! ```

pub mod csv;
pub mod text;

pub use csv::{CsvOutputError, CsvReport, RecordRow, RunLogRow};
