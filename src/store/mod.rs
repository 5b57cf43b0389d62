//! Persistent integrity store.
//!
//! This module owns everything that is written to disk between runs: the
//! per-file baselines and the run history.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence, schema creation, upserts and queries.
//! * [`record`]: Row types ([`FileRecord`], [`RunLogEntry`]) and write inputs.
//!
//! # Upsert semantics
//!
//! Records are keyed by `(path, filename)`:
//! * first observation: base = latest = computed hashes, `date_added` stamped
//! * later observations: latest hashes and `date_updated` replaced, base kept
//!
//! Records are never removed by a scan. Files that disappeared from disk stay
//! tracked until an explicit purge.

pub mod database;
pub mod record;

pub use database::{IntegrityStore, StoreError, StoreResult};
pub use record::{FileRecord, NewRunLog, Observation, RunLogEntry, UpsertOutcome};
