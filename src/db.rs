//! Database connection setup, migrations, and error types.
//!
//! This module handles SQLite connection setup with the settings the wiki
//! relies on (WAL mode, deferred foreign keys enforced at commit, busy
//! timeout), schema versioning via embedded migrations, and the error type
//! shared by the whole crate.

use rusqlite::{Connection, ErrorCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Central error type for the wiki.
///
/// Every variant maps onto one transport-facing [`ErrorKind`]; callers that
/// only care about the tag should match on [`WikiError::kind`].
#[derive(Debug, Error)]
pub enum WikiError {
    /// Requested page, revision, or text does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A page with the same title (compared case-insensitively) already exists.
    #[error("Title conflict: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// I/O operation failed (creating the data directory, reading stdin, etc).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No pooled connection became free in time.
    #[error("Timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),

    /// The pool has been shut down.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The caller's deadline passed before the operation finished.
    #[error("Deadline exceeded; the operation was rolled back")]
    DeadlineExceeded,

    /// Invalid input provided by the user or caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error classification preserved end-to-end to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    StorageFailure,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::StorageFailure => "storage_failure",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WikiError {
    /// The tag this error carries to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidInput(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Db(_)
            | Self::Io(_)
            | Self::PoolTimeout(_)
            | Self::PoolClosed
            | Self::DeadlineExceeded => ErrorKind::StorageFailure,
        }
    }

    /// True when retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PoolTimeout(_) | Self::DeadlineExceeded => true,
            Self::Db(e) => matches!(
                e.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

/// Applies the wiki's settings to a freshly opened connection.
///
/// - **WAL mode**: concurrent readers with serialized writers
/// - **Foreign keys**: enabled; the schema declares them deferred, so they
///   are checked when a transaction commits
/// - **Busy timeout**: how long a writer waits on another writer's lock
///
/// # Errors
///
/// Returns the `rusqlite::Error` of the first pragma that fails.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(busy_timeout)
}

/// Runs all pending database migrations.
///
/// Reads the current version from `schema_meta` (0 when the table does not
/// exist yet) and applies every embedded migration with a higher version,
/// each in its own transaction. Each migration sets `schema_meta.version`
/// to its own number.
///
/// # Errors
///
/// Returns `WikiError::Db` if a migration fails; that migration is rolled back.
pub fn run_migrations(conn: &mut Connection) -> Result<(), WikiError> {
    let current_version = schema_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(1, include_str!("../migrations/001_initial.sql"))];

    for (target_version, sql) in migrations {
        if target_version > current_version {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.commit()?;
        }
    }

    Ok(())
}

/// Current schema version, or 0 for an empty database.
fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0)
}
