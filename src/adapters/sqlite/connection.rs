//! SQLite pool construction.
//!
//! Several agent processes may share one database file, so file pools run
//! in WAL mode with a busy timeout. Lock contention that outlasts the
//! timeout surfaces as `StorageBusy` and is retried by the services.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::DatabaseConfig;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Failed to create database directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

/// File path behind a `sqlite:` URL, or `None` for in-memory databases.
fn database_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

fn prepare_directory(database_url: &str) -> Result<(), ConnectionError> {
    let Some(parent) = database_file(database_url).and_then(Path::parent) else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|source| ConnectionError::DirectoryCreationFailed {
        path: parent.to_path_buf(),
        source,
    })
}

/// Open a pool on a database file, creating the file and its directory.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    prepare_directory(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::InvalidDatabaseUrl(database_url.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)?;

    debug!(url = %database_url, max_connections = config.max_connections, "sqlite pool opened");
    Ok(pool)
}

/// In-memory pool for tests. Pinned to one connection that never idles
/// out, since the database disappears with its connection.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str(MEMORY_URL)
        .map_err(|_| ConnectionError::InvalidDatabaseUrl(MEMORY_URL.to_string()))?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

/// Round-trip a trivial query and report the journal mode in use.
pub async fn verify_connection(pool: &SqlitePool) -> Result<String, ConnectionError> {
    let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::ConnectionFailed)?;
    Ok(mode.to_lowercase())
}
