//! Wiring shared by every command: configuration, the database pool and
//! the three services built on top of it.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{
    open_database, SqliteCoordinationRepository, SqliteMoleculeRepository, SqliteWorkItemRepository,
};
use crate::domain::models::Config;
use crate::services::{BroadcastEventSink, Coordinator, RetryPolicy, StateStore, WorkQueue};

pub type CliStateStore = StateStore<SqliteMoleculeRepository>;
pub type CliWorkQueue = WorkQueue<SqliteWorkItemRepository>;
pub type CliCoordinator = Coordinator<SqliteCoordinationRepository>;

pub struct AppContext {
    pub config: Config,
    pool: SqlitePool,
    events: Arc<BroadcastEventSink>,
}

impl AppContext {
    /// Open (and migrate) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = open_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        Ok(Self {
            config,
            pool,
            events: Arc::new(BroadcastEventSink::default()),
        })
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    pub fn events(&self) -> Arc<BroadcastEventSink> {
        Arc::clone(&self.events)
    }

    pub fn state_store(&self) -> CliStateStore {
        StateStore::new(
            Arc::new(SqliteMoleculeRepository::new(self.pool.clone())),
            self.config.state_store.clone(),
            self.retry(),
        )
        .with_event_sink(self.events())
    }

    pub fn work_queue(&self) -> CliWorkQueue {
        WorkQueue::new(
            Arc::new(SqliteWorkItemRepository::new(self.pool.clone())),
            self.config.work_queue.clone(),
            self.retry(),
        )
        .with_event_sink(self.events())
    }

    /// Coordinator rehydrated from the database, with the state store wired
    /// in for crash recovery.
    pub async fn coordinator(&self) -> Result<CliCoordinator> {
        let coordinator = Coordinator::load(
            Arc::new(SqliteCoordinationRepository::new(self.pool.clone())),
            self.config.coordinator.clone(),
            self.retry(),
        )
        .await
        .context("Failed to load coordinator state")?;

        Ok(coordinator
            .with_owner_recovery(Arc::new(self.state_store()))
            .with_event_sink(self.events()))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
