//! Work item ("hook" entry) domain model.
//!
//! Work items are slung onto an agent's queue and walk a strict lifecycle:
//! Pending → Claimed → Executing → Completed, with Failed reachable from any
//! non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemState {
    Pending,
    Claimed,
    Executing,
    Completed,
    Failed,
}

impl WorkItemState {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Claimed,
        Self::Executing,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "claimed" => Some(Self::Claimed),
            "executing" => Some(Self::Executing),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States from which a transition into `target` is legal.
    pub fn sources_for(target: Self) -> &'static [Self] {
        match target {
            Self::Pending => &[],
            Self::Claimed => &[Self::Pending],
            Self::Executing => &[Self::Claimed],
            Self::Completed => &[Self::Claimed, Self::Executing],
            Self::Failed => &[Self::Pending, Self::Claimed, Self::Executing],
        }
    }

    pub fn can_transition_to(&self, target: Self) -> bool {
        Self::sources_for(target).contains(self)
    }
}

impl fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a work item. Lower rank is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPriority {
    Urgent = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl Default for WorkPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl WorkPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "urgent" | "critical" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Severity rank used for queue ordering (0 = most urgent).
    pub fn rank(&self) -> i64 {
        *self as i64
    }

    pub fn from_rank(rank: i64) -> Option<Self> {
        match rank {
            0 => Some(Self::Urgent),
            1 => Some(Self::High),
            2 => Some(Self::Normal),
            3 => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for WorkPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work on an agent's hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    /// Agent whose queue holds this item
    pub agent: String,
    pub work_type: String,
    pub work_ref: String,
    pub priority: WorkPriority,
    pub requested_by: String,
    pub state: WorkItemState,
    pub retry_count: u32,
    pub reason: Option<String>,
    /// Execution context supplied when execution began
    pub context: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<Value>,
    /// Store-assigned submission order; 0 until persisted
    pub sequence: i64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(
        agent: impl Into<String>,
        work_type: impl Into<String>,
        work_ref: impl Into<String>,
        requested_by: impl Into<String>,
        priority: WorkPriority,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent: agent.into(),
            work_type: work_type.into(),
            work_ref: work_ref.into(),
            priority,
            requested_by: requested_by.into(),
            state: WorkItemState::Pending,
            retry_count: 0,
            reason,
            context: None,
            result: None,
            error: None,
            sequence: 0,
            submitted_at: now,
            updated_at: now,
        }
    }
}

/// Fields written alongside a conditional state transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub context: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub increment_retry: bool,
}

/// Snapshot of one agent's queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub agent: String,
    pub counts: BTreeMap<WorkItemState, u64>,
    /// Most recently updated items, newest first
    pub recent: Vec<WorkItem>,
}

impl QueueStatus {
    pub fn count(&self, state: WorkItemState) -> u64 {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}
