//! Database handle for modules.
//!
//! A [`DbHandle`] owns one sqlx SQLite pool and a SeaORM connection built on
//! top of the same pool. Connection tuning comes from typed options and a
//! small whitelist of PRAGMAs that may be given in the DSN query string.
//!
//! ```rust,no_run
//! # async fn demo() -> modkit_db::Result<()> {
//! use modkit_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite:///var/lib/app/app.db?synchronous=FULL", ConnectOpts::default()).await?;
//! let conn = db.sea();
//! # drop(conn);
//! db.close().await;
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use std::time::Duration;

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

mod sqlite;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("{0:?} is not supported by this build; only SQLite is available")]
    UnsupportedEngine(DbEngine),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("SQLite pragma error: {0}")]
    SqlitePragma(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Pool options. In-memory databases override the connection counts and
/// lifetimes so the single backing connection is never recycled.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// Used when the DSN carries no `busy_timeout`.
    pub sqlite_busy_timeout: Option<Duration>,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            sqlite_busy_timeout: None,
            create_sqlite_dirs: true,
        }
    }
}

const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: SqlitePool,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_string()))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        match Self::detect(dsn)? {
            DbEngine::Sqlite => Self::connect_sqlite(dsn.trim(), opts).await,
            other => Err(DbError::UnsupportedEngine(other)),
        }
    }

    async fn connect_sqlite(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let (clean_dsn, pairs) = sqlite::extract_sqlite_pragmas(dsn);
        let pragmas = sqlite::Pragmas::from_pairs(&pairs)?;
        let in_memory = sqlite::is_memory_dsn(&clean_dsn);

        if !in_memory && opts.create_sqlite_dirs {
            sqlite::prepare_sqlite_path(&clean_dsn)?;
        }

        let default_journal = if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        };
        let connect_opts = SqliteConnectOptions::from_str(&clean_dsn)?
            .create_if_missing(true)
            .journal_mode(pragmas.journal_mode.unwrap_or(default_journal))
            .synchronous(pragmas.synchronous.unwrap_or(SqliteSynchronous::Normal))
            .busy_timeout(
                pragmas
                    .busy_timeout
                    .or(opts.sqlite_busy_timeout)
                    .unwrap_or(DEFAULT_SQLITE_BUSY_TIMEOUT),
            );

        let mut o = SqlitePoolOptions::new();
        if let Some(t) = opts.acquire_timeout {
            o = o.acquire_timeout(t);
        }
        if in_memory {
            // every new connection would open a fresh, empty database
            o = o
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            if let Some(n) = opts.max_conns {
                o = o.max_connections(n);
            }
            if let Some(n) = opts.min_conns {
                o = o.min_connections(n);
            }
            o = o.idle_timeout(opts.idle_timeout).max_lifetime(opts.max_lifetime);
        }

        let pool = o.connect_with(connect_opts).await?;
        let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
        tracing::debug!(dsn = %clean_dsn, in_memory, "SQLite pool ready");

        Ok(Self {
            engine: DbEngine::Sqlite,
            pool,
            dsn: clean_dsn,
            sea,
        })
    }

    /// Graceful pool close. Waits for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN used for this connection, without PRAGMA parameters.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn sqlx_sqlite(&self) -> &SqlitePool {
        &self.pool
    }

    /// SeaORM connection over the same pool (clone; cheap handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }
}
