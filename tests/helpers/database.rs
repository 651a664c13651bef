use std::sync::Arc;

use convoy::adapters::sqlite::{
    create_migrated_test_pool, initialize_database, PoolConfig, SqliteCoordinationRepository,
    SqliteMoleculeRepository, SqliteWorkItemRepository,
};
use convoy::domain::models::{CoordinatorConfig, StateStoreConfig, WorkQueueConfig};
use convoy::services::{Coordinator, RetryPolicy, StateStore, WorkQueue};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create an in-memory SQLite database with migrations applied.
///
/// Each call creates a completely isolated database instance.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// File-backed database in a temp directory, for tests that need several
/// connections to contend for the same rows.
///
/// Keep the returned `TempDir` alive for the duration of the test.
#[allow(dead_code)]
pub async fn setup_file_db(max_connections: u32) -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("convoy.db").display());
    let config = PoolConfig {
        max_connections,
        ..PoolConfig::default()
    };
    let pool = initialize_database(&url, Some(config))
        .await
        .expect("failed to create file database");
    (dir, pool)
}

/// Close the pool at the end of a test.
#[allow(dead_code)]
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}

#[allow(dead_code)]
pub fn state_store(pool: &SqlitePool, config: StateStoreConfig) -> StateStore<SqliteMoleculeRepository> {
    StateStore::new(
        Arc::new(SqliteMoleculeRepository::new(pool.clone())),
        config,
        RetryPolicy::immediate(3),
    )
}

#[allow(dead_code)]
pub fn work_queue(pool: &SqlitePool) -> WorkQueue<SqliteWorkItemRepository> {
    WorkQueue::new(
        Arc::new(SqliteWorkItemRepository::new(pool.clone())),
        WorkQueueConfig::default(),
        RetryPolicy::immediate(3),
    )
}

#[allow(dead_code)]
pub fn coordinator(pool: &SqlitePool) -> Coordinator<SqliteCoordinationRepository> {
    Coordinator::new(
        Arc::new(SqliteCoordinationRepository::new(pool.clone())),
        CoordinatorConfig::default(),
        RetryPolicy::immediate(3),
    )
}
