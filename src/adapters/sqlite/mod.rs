//! SQLite database adapters for the Convoy coordination core.

pub mod connection;
pub mod coordination_repository;
pub mod migrations;
pub mod molecule_repository;
pub mod work_item_repository;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use coordination_repository::SqliteCoordinationRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator, CONVOY_TABLES};
pub use molecule_repository::SqliteMoleculeRepository;
pub use work_item_repository::SqliteWorkItemRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Fixed-width RFC3339 so stored timestamps compare correctly as text.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a JSON string from a SQLite row field.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> DomainResult<T> {
    serde_json::from_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an optional JSON string from a SQLite row field.
pub fn parse_optional_json<T: serde::de::DeserializeOwned>(s: Option<String>) -> DomainResult<Option<T>> {
    s.map(|s| parse_json(&s)).transpose()
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Open the configured database and bring its schema up to date.
pub async fn open_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = initialize_database(&config.url(), Some(PoolConfig::from(config))).await?;
    let journal_mode = verify_connection(&pool).await?;
    tracing::debug!(path = %config.path, journal_mode = %journal_mode, "database ready");
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = parse_datetime("2026-01-01T00:00:00.5Z").unwrap();
        let later = parse_datetime("2026-01-01T00:00:01Z").unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(parse_datetime(&format_timestamp(later)).unwrap(), later);
    }

    #[test]
    fn test_parse_helpers_reject_garbage() {
        assert!(parse_uuid("not-a-uuid").is_err());
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_json::<Vec<String>>("{").is_err());
        assert_eq!(parse_optional_json::<Vec<String>>(None).unwrap(), None);
    }
}
