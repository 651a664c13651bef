//! Convoy - worker-pool coordination core
//!
//! Convoy keeps a fleet of autonomous agents working without losing
//! progress:
//!
//! - **State Store**: versioned, checkpointed "molecules" with rollback
//!   points, owner heartbeats and crash recovery
//! - **Work Queue**: one priority-ordered hook per agent, with race-safe
//!   claim/execute/complete transitions
//! - **Coordinator**: agent registry, typed team formation, round-robin work
//!   distribution and pluggable conflict handling
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Adapters** (`adapters`): SQLite persistence behind the ports
//! - **Service Layer** (`services`): the three subsystems and their daemon
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line issuer/inspector
//!
//! # Example
//!
//! ```ignore
//! use convoy::adapters::sqlite::{open_database, SqliteWorkItemRepository};
//! use convoy::services::{RetryPolicy, SlingRequest, WorkQueue};
//!
//! let pool = open_database(&config.database).await?;
//! let queue = WorkQueue::new(Arc::new(SqliteWorkItemRepository::new(pool)), config.work_queue, RetryPolicy::default());
//! let id = queue.sling(SlingRequest::new("agent-a", "build", "123")).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AgentProfile, Config, HealthLevel, Molecule, MoleculeState, Snapshot, Team, TeamType, WorkItem,
    WorkItemState, WorkPriority,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Coordinator, CoordinatorDaemon, RetryPolicy, SlingRequest, StateStore, WorkQueue};
