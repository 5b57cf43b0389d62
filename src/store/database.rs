//! SQLite-backed integrity store.
//!
//! Two tables:
//!
//! - `checksum`: one row per `(path, filename)` with baseline and latest
//!   hashes. Written only through [`IntegrityStore::upsert_observation`] and
//!   [`IntegrityStore::upsert_batch`].
//! - `runlog`: one row per invocation, insert only.
//!
//! The connection is owned by a single [`IntegrityStore`] for the duration of
//! an invocation. Concurrent processes writing the same file are not guarded
//! against.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::record::{FileRecord, NewRunLog, Observation, RunLogEntry, UpsertOutcome};

/// Errors raised by the integrity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store file could not be opened or created.
    #[error("Cannot open store at {path}: {source}")]
    Open {
        /// Store location
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS runlog (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        monitor_dir TEXT NOT NULL,
        db_path TEXT NOT NULL,
        ignore_ext TEXT NOT NULL,
        run_seconds REAL NOT NULL,
        run_date TEXT NOT NULL,
        prg_args TEXT NOT NULL,
        files_processed INTEGER NOT NULL DEFAULT 0,
        files_errored INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS checksum (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL,
        filename TEXT NOT NULL,
        extension TEXT NOT NULL,
        date_added TEXT NOT NULL,
        date_updated TEXT NOT NULL,
        base_hash_strong TEXT NOT NULL,
        base_hash_fast TEXT NOT NULL,
        latest_hash_strong TEXT NOT NULL,
        latest_hash_fast TEXT NOT NULL,
        UNIQUE (path, filename)
    );

    CREATE INDEX IF NOT EXISTS idx_checksum_base
        ON checksum (base_hash_strong, base_hash_fast);
";

const RECORD_COLUMNS: &str = "id, path, filename, extension, date_added, date_updated, \
     base_hash_strong, base_hash_fast, latest_hash_strong, latest_hash_fast";

// base_* are only written by the INSERT arm; the conflict arm never touches them.
const UPSERT_SQL: &str = "
    INSERT INTO checksum (path, filename, extension, date_added, date_updated,
        base_hash_strong, base_hash_fast, latest_hash_strong, latest_hash_fast)
    VALUES (?1, ?2, ?3, ?6, ?6, ?4, ?5, ?4, ?5)
    ON CONFLICT (path, filename) DO UPDATE SET
        latest_hash_strong = excluded.latest_hash_strong,
        latest_hash_fast = excluded.latest_hash_fast,
        date_updated = excluded.date_updated";

/// Persistent store of file baselines and run history.
pub struct IntegrityStore {
    conn: Connection,
    location: Option<PathBuf>,
}

impl std::fmt::Debug for IntegrityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl IntegrityStore {
    /// Open or create a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the file cannot be opened, or
    /// [`StoreError::Sqlite`] if the schema cannot be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        log::debug!("Opened integrity store at {}", path.display());
        Self::initialize(conn, Some(path.to_path_buf()))
    }

    /// Open a transient in-memory store (for testing and dry runs).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema cannot be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, None)
    }

    fn initialize(conn: Connection, location: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, location })
    }

    /// Path of the backing file, `None` for in-memory stores.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Record one observation of a file.
    ///
    /// Creates the record with base = latest if the `(path, filename)` key is
    /// new, otherwise replaces only the latest hashes and `date_updated`.
    /// Repeating the call for the same key is an overwrite, never additive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails; nothing is committed then.
    pub fn upsert_observation(&self, observation: &Observation) -> StoreResult<UpsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let outcome = Self::upsert_in(&tx, observation, Utc::now())?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Record several observations in a single transaction.
    ///
    /// Semantics per key are identical to [`upsert_observation`]; a later
    /// entry for the same key wins.
    ///
    /// [`upsert_observation`]: Self::upsert_observation
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any write fails; the whole batch is rolled
    /// back.
    pub fn upsert_batch(&self, observations: &[Observation]) -> StoreResult<Vec<UpsertOutcome>> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now();
        let outcomes = observations
            .iter()
            .map(|obs| Self::upsert_in(&tx, obs, now))
            .collect::<StoreResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(outcomes)
    }

    fn upsert_in(
        conn: &Connection,
        obs: &Observation,
        now: DateTime<Utc>,
    ) -> StoreResult<UpsertOutcome> {
        let exists = conn
            .prepare_cached("SELECT 1 FROM checksum WHERE path = ?1 AND filename = ?2")?
            .exists(params![obs.path, obs.filename])?;

        conn.prepare_cached(UPSERT_SQL)?.execute(params![
            obs.path,
            obs.filename,
            obs.extension,
            obs.digest.strong,
            obs.digest.fast,
            now,
        ])?;

        log::trace!(
            "{} {}/{}",
            if exists { "Updated" } else { "Inserted" },
            obs.path,
            obs.filename
        );

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Append one run-log row and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn append_run_log(&self, entry: &NewRunLog) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO runlog (monitor_dir, db_path, ignore_ext, run_seconds, run_date,
                prg_args, files_processed, files_errored)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.monitor_dir,
                entry.db_path,
                entry.ignore_ext,
                entry.run_seconds,
                Utc::now(),
                entry.prg_args,
                entry.files_processed as i64,
                entry.files_errored as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up a single record by its key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn get(&self, path: &str, filename: &str) -> StoreResult<Option<FileRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM checksum WHERE path = ?1 AND filename = ?2");
        let record = self
            .conn
            .query_row(&sql, params![path, filename], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// Every tracked record, ordered by location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn all_records(&self) -> StoreResult<Vec<FileRecord>> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS} FROM checksum ORDER BY path, filename"
        ))
    }

    /// Records whose latest hashes differ from the baseline on either hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn drifted_records(&self) -> StoreResult<Vec<FileRecord>> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS} FROM checksum
             WHERE base_hash_strong != latest_hash_strong
                OR base_hash_fast != latest_hash_fast
             ORDER BY path, filename"
        ))
    }

    /// Records sharing their baseline hash pair with at least one other
    /// record, ordered so that members of a group are contiguous.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn duplicate_members(&self) -> StoreResult<Vec<FileRecord>> {
        let columns = RECORD_COLUMNS
            .split(", ")
            .map(|c| format!("c.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.query_records(&format!(
            "SELECT {columns} FROM checksum c
             JOIN (SELECT base_hash_strong, base_hash_fast
                   FROM checksum
                   GROUP BY base_hash_strong, base_hash_fast
                   HAVING COUNT(*) > 1) d
               ON c.base_hash_strong = d.base_hash_strong
              AND c.base_hash_fast = d.base_hash_fast
             ORDER BY c.base_hash_strong, c.base_hash_fast, c.path, c.filename"
        ))
    }

    /// Number of tracked records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn total_rows(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM checksum")
    }

    /// Number of logged runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn run_count(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM runlog")
    }

    /// Tracked file count per extension, ordered by extension.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn extension_counts(&self) -> StoreResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT extension, COUNT(*) FROM checksum GROUP BY extension ORDER BY extension",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The full run history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn run_logs(&self) -> StoreResult<Vec<RunLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, monitor_dir, db_path, ignore_ext, run_seconds, run_date, prg_args,
                    files_processed, files_errored
             FROM runlog ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RunLogEntry {
                    id: row.get(0)?,
                    monitor_dir: row.get(1)?,
                    db_path: row.get(2)?,
                    ignore_ext: row.get(3)?,
                    run_seconds: row.get(4)?,
                    run_date: row.get(5)?,
                    prg_args: row.get(6)?,
                    files_processed: row.get::<_, i64>(7)? as u64,
                    files_errored: row.get::<_, i64>(8)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete one record by id. Only used for explicit operator purges.
    ///
    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    pub fn delete_record(&self, id: i64) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM checksum WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn count(&self, sql: &str) -> StoreResult<u64> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn query_records(&self, sql: &str) -> StoreResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        filename: row.get(2)?,
        extension: row.get(3)?,
        date_added: row.get(4)?,
        date_updated: row.get(5)?,
        base_hash_strong: row.get(6)?,
        base_hash_fast: row.get(7)?,
        latest_hash_strong: row.get(8)?,
        latest_hash_fast: row.get(9)?,
    })
}
