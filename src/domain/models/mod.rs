//! Domain models for the Convoy coordination core.

pub mod agent;
pub mod config;
pub mod conflict;
pub mod event;
pub mod molecule;
pub mod team;
pub mod work_item;

pub use agent::{AgentMetricsUpdate, AgentProfile, HealthLevel};
pub use config::{
    Config, CoordinatorConfig, DaemonConfig, DatabaseConfig, LoggingConfig, RetryConfig,
    StateStoreConfig, WorkQueueConfig,
};
pub use conflict::{Conflict, ConflictKind, DetectedConflict, ResolutionStrategy};
pub use event::{CoreEvent, EventEnvelope};
pub use molecule::{
    merge_error_info, Molecule, MoleculeState, OwnerHeartbeat, RecoveryReport, Snapshot,
    StalledOwner,
};
pub use team::{Team, TeamStatus, TeamType, WorkDistributionPlan};
pub use work_item::{QueueStatus, TransitionPatch, WorkItem, WorkItemState, WorkPriority};
