//! Embedded schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`. Each migration runs
//! in its own transaction together with its bookkeeping row, so a crash
//! mid-upgrade leaves the previous version intact.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

/// Tables the services read and write. A database missing any of them was
/// not created by these migrations.
pub const CONVOY_TABLES: [&str; 9] = [
    "molecules",
    "molecule_snapshots",
    "owner_heartbeats",
    "hook_queues",
    "work_items",
    "agent_profiles",
    "teams",
    "distribution_plans",
    "conflicts",
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to read schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
    #[error("Duplicate migration version {0}")]
    DuplicateVersion(i64),
    #[error("Schema is missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    pub sql: String,
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded version, then check
    /// that the coordination tables exist. Returns how many were applied.
    pub async fn run_embedded_migrations(&self, mut migrations: Vec<Migration>) -> Result<usize, MigrationError> {
        migrations.sort_by_key(|m| m.version);
        if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
            return Err(MigrationError::DuplicateVersion(pair[0].version));
        }

        self.ensure_bookkeeping().await?;
        let current = self.current_version().await?;

        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            info!(version = migration.version, description = %migration.description, "schema migration applied");
            applied += 1;
        }

        self.verify_schema().await?;
        Ok(applied)
    }

    pub async fn current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
        Ok(version)
    }

    /// Fail with the names of any coordination tables that do not exist.
    pub async fn verify_schema(&self) -> Result<(), MigrationError> {
        let present: Vec<(String,)> = sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;

        let missing: Vec<String> = CONVOY_TABLES
            .iter()
            .filter(|t| !present.iter().any(|(name,)| name == *t))
            .map(|t| (*t).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::MissingTables(missing))
        }
    }

    async fn ensure_bookkeeping(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|source| MigrationError::ExecutionError { version: 0, source })?;
        Ok(())
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let failed = |source: sqlx::Error| MigrationError::ExecutionError {
            version: migration.version,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(&migration.sql).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)
    }
}

pub fn all_embedded_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Molecule ledger, hook queues, coordinator registries".to_string(),
        sql: include_str!("../../../migrations/001_initial_schema.sql").to_string(),
    }]
}
