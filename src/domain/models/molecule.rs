//! Molecule domain model.
//!
//! A molecule is a resumable unit of work. Its history is an append-only
//! ledger of snapshots; the most recent snapshot is the molecule's current
//! state, and snapshots flagged as rollback points are safe restore targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle state of a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoleculeState {
    /// Created, no work recorded yet
    Initialized,
    /// Actively being worked on
    Running,
    /// Paused by its owner
    Suspended,
    /// Finished; no further mutation allowed
    Completed,
    /// Failed; still mutable so it can be rolled back
    Failed,
    /// Restored from a rollback point and resumable
    RolledBack,
}

impl MoleculeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "initialized" => Some(Self::Initialized),
            "running" => Some(Self::Running),
            "suspended" => Some(Self::Suspended),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "rolled_back" | "rolledback" => Some(Self::RolledBack),
            _ => None,
        }
    }

    /// Completed is the only terminal state. Failed molecules stay mutable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// States a caller may record through a plain checkpoint.
    pub fn is_checkpointable(&self) -> bool {
        matches!(self, Self::Running | Self::Suspended)
    }

    /// States that mark in-flight work for crash recovery.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Initialized | Self::Running | Self::Suspended)
    }
}

impl fmt::Display for MoleculeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current view of a molecule. Always mirrors its latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub id: String,
    pub owner: String,
    pub dependencies: Vec<String>,
    /// Caller-owned blob, never interpreted by the core
    pub payload: Value,
    /// Caller-owned execution context
    pub context: Value,
    pub state: MoleculeState,
    /// Optimistic concurrency counter; equals the latest snapshot's sequence
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Time of the last persisted (non-throttled) checkpoint
    pub last_checkpoint_at: Option<DateTime<Utc>>,
}

impl Molecule {
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        payload: Value,
        context: Value,
        dependencies: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner: owner.into(),
            dependencies,
            payload,
            context,
            state: MoleculeState::Initialized,
            version: 1,
            created_at: now,
            updated_at: now,
            last_checkpoint_at: None,
        }
    }

    /// Build the snapshot that records this molecule's current view.
    pub fn snapshot(&self, rollback_point: bool) -> Snapshot {
        Snapshot {
            molecule_id: self.id.clone(),
            sequence: self.version,
            state: self.state,
            payload: self.payload.clone(),
            context: self.context.clone(),
            dependencies: self.dependencies.clone(),
            rollback_point,
            created_at: self.updated_at,
        }
    }

    /// Produce the next version of this molecule.
    pub fn advance(&self, state: MoleculeState, payload: Value) -> Self {
        Self {
            state,
            payload,
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Immutable record of one molecule state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub molecule_id: String,
    /// Position in the molecule's ledger, starting at 1
    pub sequence: u64,
    pub state: MoleculeState,
    pub payload: Value,
    pub context: Value,
    pub dependencies: Vec<String>,
    pub rollback_point: bool,
    pub created_at: DateTime<Utc>,
}

/// Last liveness report of a molecule owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerHeartbeat {
    pub owner: String,
    pub active_molecules: Vec<String>,
    pub last_heartbeat: DateTime<Utc>,
}

/// An owner whose heartbeat lapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalledOwner {
    pub owner: String,
    pub active_molecules: Vec<String>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Outcome of recovering a crashed owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub owner: String,
    pub rolled_back: Vec<String>,
    pub failed: Vec<String>,
    /// Molecules that could be neither rolled back nor failed, with the reason
    pub errors: Vec<(String, String)>,
}

/// Merge failure details into a payload.
///
/// Object payloads absorb the fields of an object `error_info`; anything
/// else is recorded under an `error` key.
pub fn merge_error_info(payload: &Value, error_info: &Value) -> Value {
    let mut merged = match payload {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("payload".to_string(), other.clone());
            map
        }
    };

    match error_info {
        Value::Object(info) => {
            for (key, value) in info {
                merged.insert(key.clone(), value.clone());
            }
        }
        other => {
            merged.insert("error".to_string(), other.clone());
        }
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_round_trip_strings() {
        for state in [
            MoleculeState::Initialized,
            MoleculeState::Running,
            MoleculeState::Suspended,
            MoleculeState::Completed,
            MoleculeState::Failed,
            MoleculeState::RolledBack,
        ] {
            assert_eq!(MoleculeState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(MoleculeState::from_str("bogus"), None);
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(MoleculeState::Completed.is_terminal());
        assert!(!MoleculeState::Failed.is_terminal());
        assert!(!MoleculeState::RolledBack.is_terminal());
    }

    #[test]
    fn test_new_molecule_snapshot_is_initialized() {
        let molecule = Molecule::new("m1", "agent-a", json!({"step": 0}), json!({}), vec![]);
        let snapshot = molecule.snapshot(true);
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.state, MoleculeState::Initialized);
        assert!(snapshot.rollback_point);
    }

    #[test]
    fn test_advance_bumps_version() {
        let molecule = Molecule::new("m1", "agent-a", json!({}), json!({}), vec!["m0".into()]);
        let next = molecule.advance(MoleculeState::Running, json!({"step": 1}));
        assert_eq!(next.version, 2);
        assert_eq!(next.state, MoleculeState::Running);
        assert_eq!(next.dependencies, vec!["m0".to_string()]);
    }

    #[test]
    fn test_merge_error_info() {
        let merged = merge_error_info(&json!({"step": 3}), &json!({"reason": "oom"}));
        assert_eq!(merged, json!({"step": 3, "reason": "oom"}));

        let merged = merge_error_info(&json!({"step": 3}), &json!("agent_crash"));
        assert_eq!(merged, json!({"step": 3, "error": "agent_crash"}));

        let merged = merge_error_info(&json!([1, 2]), &json!("boom"));
        assert_eq!(merged, json!({"payload": [1, 2], "error": "boom"}));
    }
}
