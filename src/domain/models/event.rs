//! Events exposed to the messaging and audit layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conflict::{ConflictKind, ResolutionStrategy};
use super::molecule::MoleculeState;
use super::team::TeamType;
use super::work_item::WorkPriority;

/// Something observable happened inside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    Checkpointed {
        molecule_id: String,
        state: MoleculeState,
        sequence: u64,
        rollback_point: bool,
    },
    MoleculeCompleted {
        molecule_id: String,
        sequence: u64,
    },
    MoleculeFailed {
        molecule_id: String,
        sequence: u64,
    },
    MoleculeRolledBack {
        molecule_id: String,
        sequence: u64,
        restored_from: u64,
    },
    OwnerRecovered {
        owner: String,
        rolled_back: usize,
        failed: usize,
    },
    WorkSlung {
        agent: String,
        item_id: Uuid,
        work_type: String,
        work_ref: String,
        priority: WorkPriority,
    },
    WorkClaimed {
        agent: String,
        item_id: Uuid,
    },
    WorkStarted {
        agent: String,
        item_id: Uuid,
    },
    WorkCompleted {
        agent: String,
        item_id: Uuid,
    },
    WorkFailed {
        agent: String,
        item_id: Uuid,
        retry_count: u32,
    },
    TeamFormed {
        team_id: Uuid,
        team_type: TeamType,
        members: Vec<String>,
    },
    WorkDistributed {
        batch_id: Uuid,
        teams: usize,
        items: usize,
    },
    ConflictDetected {
        conflict_id: Uuid,
        kind: ConflictKind,
    },
    ConflictResolved {
        conflict_id: Uuid,
        strategy: ResolutionStrategy,
    },
}

/// Event with the time it was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: CoreEvent,
}

impl EventEnvelope {
    pub fn now(event: CoreEvent) -> Self {
        Self { at: Utc::now(), event }
    }
}
