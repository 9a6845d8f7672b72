// crates/bench-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Submission History Store
// Description: Durable SubmissionHistoryStore backed by SQLite WAL.
// Purpose: Persist accepted submissions with atomic duplicate rejection.
// Dependencies: bench-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`SubmissionHistoryStore`] using `SQLite`.
//! Admission runs as one immediate transaction: the manifest-hash lookup, the
//! run-id lookup, and the insert happen under a single write lock, so two
//! concurrent admissions of the same bundle can never both land. Unique
//! indexes on both columns back the in-transaction checks. Database contents
//! are untrusted; loads fail closed on malformed rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use bench_gate_core::HistoryRecord;
use bench_gate_core::LeaderboardEntry;
use bench_gate_core::RunId;
use bench_gate_core::Timestamp;
use bench_gate_core::interfaces::AdmitOutcome;
use bench_gate_core::interfaces::HistoryStoreError;
use bench_gate_core::interfaces::SubmissionHistoryStore;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` submission history store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteHistoryConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` history store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw submission payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteHistoryError {
    /// Store I/O error.
    #[error("sqlite history io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite history db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite history version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite history invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteHistoryError> for HistoryStoreError {
    fn from(error: SqliteHistoryError) -> Self {
        match error {
            SqliteHistoryError::Io(message) => Self::Io(message),
            SqliteHistoryError::Db(message) => Self::Store(message),
            SqliteHistoryError::VersionMismatch(message) | SqliteHistoryError::Invalid(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed submission history store with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Admission checks and inserts share one immediate transaction.
pub struct SqliteHistoryStore {
    /// Shared connection guarded by a mutex.
    connection: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHistoryStore").finish_non_exhaustive()
    }
}

impl SqliteHistoryStore {
    /// Opens an `SQLite`-backed submission history store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteHistoryError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteHistoryConfig) -> Result<Self, SqliteHistoryError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Replaces the leaderboard standings in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteHistoryError`] when the write fails.
    pub fn replace_leaderboard(
        &self,
        standings: &[LeaderboardEntry],
    ) -> Result<(), SqliteHistoryError> {
        let mut guard = self.lock_connection()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        tx.execute("DELETE FROM leaderboard", [])
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        for entry in standings {
            tx.execute(
                "INSERT INTO leaderboard (agent_id, cup) VALUES (?1, ?2)",
                params![entry.agent_id, entry.cup],
            )
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        }
        tx.commit().map_err(|err| SqliteHistoryError::Db(err.to_string()))
    }

    /// Acquires the connection mutex, failing closed on poison.
    fn lock_connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteHistoryError> {
        self.connection
            .lock()
            .map_err(|_| SqliteHistoryError::Db("sqlite history mutex poisoned".to_string()))
    }

    /// Loads every accepted submission, oldest first.
    fn load_history(&self) -> Result<Vec<HistoryRecord>, SqliteHistoryError> {
        let guard = self.lock_connection()?;
        let mut stmt = guard
            .prepare(
                "SELECT contact_email, submitted_at, manifest_hash, run_id, organization
                 FROM submission_history ORDER BY submitted_at ASC, rowid ASC",
            )
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let contact_email: String = row.get(0)?;
                let submitted_at: i64 = row.get(1)?;
                let manifest_hash: String = row.get(2)?;
                let run_id: String = row.get(3)?;
                let organization: String = row.get(4)?;
                Ok(HistoryRecord {
                    contact_email,
                    submitted_at: Timestamp::from_unix_millis(submitted_at),
                    manifest_hash,
                    run_id: RunId::new(run_id),
                    organization,
                })
            })
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|err| SqliteHistoryError::Db(err.to_string()))?);
        }
        Ok(records)
    }

    /// Loads leaderboard standings, best first.
    fn load_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, SqliteHistoryError> {
        let guard = self.lock_connection()?;
        let mut stmt = guard
            .prepare("SELECT agent_id, cup FROM leaderboard ORDER BY cup DESC, agent_id ASC")
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let agent_id: String = row.get(0)?;
                let cup: f64 = row.get(1)?;
                Ok(LeaderboardEntry {
                    agent_id,
                    cup,
                })
            })
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        let mut standings = Vec::new();
        for row in rows {
            standings.push(row.map_err(|err| SqliteHistoryError::Db(err.to_string()))?);
        }
        Ok(standings)
    }

    /// Checks duplicates and inserts a record in one immediate transaction.
    fn admit_record(&self, record: &HistoryRecord) -> Result<AdmitOutcome, SqliteHistoryError> {
        let mut guard = self.lock_connection()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        let manifest_match: Option<i64> = tx
            .query_row(
                "SELECT rowid FROM submission_history WHERE manifest_hash = ?1",
                params![record.manifest_hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        if manifest_match.is_some() {
            return Ok(AdmitOutcome::DuplicateManifest);
        }
        let run_match: Option<i64> = tx
            .query_row(
                "SELECT rowid FROM submission_history WHERE run_id = ?1",
                params![record.run_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        if run_match.is_some() {
            return Ok(AdmitOutcome::DuplicateRunId);
        }
        tx.execute(
            "INSERT INTO submission_history
                 (contact_email, submitted_at, manifest_hash, run_id, organization)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.contact_email,
                record.submitted_at.as_unix_millis(),
                record.manifest_hash,
                record.run_id.as_str(),
                record.organization,
            ],
        )
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        Ok(AdmitOutcome::Admitted)
    }
}

impl SubmissionHistoryStore for SqliteHistoryStore {
    fn snapshot(&self) -> Result<Vec<HistoryRecord>, HistoryStoreError> {
        self.load_history().map_err(HistoryStoreError::from)
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, HistoryStoreError> {
        self.load_leaderboard().map_err(HistoryStoreError::from)
    }

    fn admit(&self, record: &HistoryRecord) -> Result<AdmitOutcome, HistoryStoreError> {
        self.admit_record(record).map_err(HistoryStoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteHistoryError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteHistoryError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteHistoryError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteHistoryError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteHistoryError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteHistoryError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteHistoryError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteHistoryError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteHistoryConfig) -> Result<Connection, SqliteHistoryError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteHistoryConfig,
) -> Result<(), SqliteHistoryError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteHistoryError> {
    let tx = connection.transaction().map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS submission_history (
                    contact_email TEXT NOT NULL,
                    submitted_at INTEGER NOT NULL,
                    manifest_hash TEXT NOT NULL,
                    run_id TEXT NOT NULL,
                    organization TEXT NOT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_submission_history_manifest
                    ON submission_history (manifest_hash);
                CREATE UNIQUE INDEX IF NOT EXISTS idx_submission_history_run
                    ON submission_history (run_id);
                CREATE INDEX IF NOT EXISTS idx_submission_history_email
                    ON submission_history (contact_email, submitted_at);
                CREATE TABLE IF NOT EXISTS leaderboard (
                    agent_id TEXT NOT NULL PRIMARY KEY,
                    cup REAL NOT NULL
                );",
            )
            .map_err(|err| SqliteHistoryError::Db(err.to_string()))?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SqliteHistoryError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {found}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteHistoryError::Db(err.to_string()))
}
