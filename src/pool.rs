//! SQLite connection pool on `r2d2`.
//!
//! The pool is constructed explicitly with [`Pool::open`] (which creates the
//! database file, runs migrations and pings it), handed out by reference, and
//! shut down with [`Pool::close`]. Connections are opened lazily up to
//! `max_open_conns` and closed after `idle_timeout_secs` unused, down to
//! `min_idle_conns`.

use crate::db::{configure_connection, run_migrations, WikiError};
use crate::deadline::Deadline;
use parking_lot::RwLock;
use r2d2::ManageConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::{Duration, Instant};

/// VM instructions between deadline checks while a statement runs.
const PROGRESS_OPS: i32 = 1_000;

/// Limits for the connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on connections checked out plus idle.
    pub max_open_conns: u32,
    /// Idle connections kept open past the idle timeout.
    pub min_idle_conns: u32,
    /// Idle connections above `min_idle_conns` older than this are closed.
    /// 0 keeps them forever.
    pub idle_timeout_secs: u64,
    /// How long `get` waits for a free connection.
    pub acquire_timeout_ms: u64,
    /// SQLite busy timeout applied to every connection.
    pub busy_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_conns: 30,
            min_idle_conns: 0,
            idle_timeout_secs: 15 * 60,
            acquire_timeout_ms: 5_000,
            busy_timeout_ms: 3_000,
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> Result<(), WikiError> {
        if self.max_open_conns == 0 {
            return Err(WikiError::Config("max_open_conns must be at least 1".to_string()));
        }
        if self.min_idle_conns > self.max_open_conns {
            return Err(WikiError::Config(format!(
                "min_idle_conns ({}) exceeds max_open_conns ({})",
                self.min_idle_conns, self.max_open_conns
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(WikiError::Config("acquire_timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// `SqliteConnectionManager` that refuses to take back a connection still
/// inside a transaction.
struct WikiConnectionManager(SqliteConnectionManager);

impl ManageConnection for WikiConnectionManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        self.0.connect()
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        self.0.is_valid(conn)
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        !conn.is_autocommit()
    }
}

pub struct Pool {
    inner: RwLock<Option<r2d2::Pool<WikiConnectionManager>>>,
    acquire_timeout: Duration,
}

impl Pool {
    /// Opens the database at `path`, applies migrations and verifies it
    /// answers a query.
    ///
    /// # Errors
    ///
    /// Returns `WikiError::Config` for unusable limits, `WikiError::Io` if
    /// the parent directory cannot be created, and `WikiError::Db` if the
    /// database cannot be opened or migrated.
    pub fn open(path: &Path, config: PoolConfig) -> Result<Self, WikiError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = config.busy_timeout();
        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));

        let inner = r2d2::Pool::builder()
            .max_size(config.max_open_conns)
            .min_idle(Some(config.min_idle_conns))
            .idle_timeout(config.idle_timeout())
            .connection_timeout(config.acquire_timeout())
            .build(WikiConnectionManager(manager))
            .map_err(|e| WikiError::Config(format!("Failed to build connection pool: {}", e)))?;

        let pool = Self {
            inner: RwLock::new(Some(inner)),
            acquire_timeout: config.acquire_timeout(),
        };

        let mut conn = pool.get(Deadline::none())?;
        run_migrations(&mut conn)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(pool)
    }

    /// Checks out a connection, waiting until one is free, the acquire
    /// timeout elapses, or `deadline` passes.
    ///
    /// # Errors
    ///
    /// - `WikiError::PoolTimeout` when the pool stayed exhausted
    /// - `WikiError::DeadlineExceeded` when the caller's deadline passed first
    /// - `WikiError::PoolClosed` after [`Pool::close`]
    pub fn get(&self, deadline: Deadline) -> Result<PooledConnection, WikiError> {
        deadline.check()?;
        let pool = self.inner.read().clone().ok_or(WikiError::PoolClosed)?;

        let now = Instant::now();
        let wait = deadline
            .cap(now + self.acquire_timeout)
            .saturating_duration_since(now)
            .max(Duration::from_millis(1));

        match pool.get_timeout(wait) {
            Ok(conn) => Ok(PooledConnection { conn }),
            Err(_) if deadline.is_expired() => Err(WikiError::DeadlineExceeded),
            Err(_) => Err(WikiError::PoolTimeout(self.acquire_timeout)),
        }
    }

    /// Refuses further checkouts. Idle connections close now; connections
    /// still checked out close when they are returned.
    pub fn close(&self) {
        self.inner.write().take();
    }
}

/// A connection checked out of a [`Pool`]; returned to it on drop.
pub struct PooledConnection {
    conn: r2d2::PooledConnection<WikiConnectionManager>,
}

impl PooledConnection {
    /// Interrupts any statement still running on this connection once
    /// `deadline` passes. The handler is removed when the connection goes
    /// back to the pool.
    pub fn interrupt_at(&self, deadline: Deadline) {
        if let Some(at) = deadline.instant() {
            self.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= at));
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}
