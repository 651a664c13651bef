//! Conflict registry entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which detector reported a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Resource,
    Coordination,
    Performance,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Coordination => "coordination",
            Self::Performance => "performance",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a caller asks for a conflict to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    Auto,
    Rebalance,
    Reassign,
    Escalate,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Rebalance => "rebalance",
            Self::Reassign => "reassign",
            Self::Escalate => "escalate",
        }
    }

    /// Concrete strategy `auto` dispatches to for a conflict kind.
    pub fn auto_for(kind: ConflictKind) -> Self {
        match kind {
            ConflictKind::Resource => Self::Rebalance,
            ConflictKind::Coordination => Self::Reassign,
            ConflictKind::Performance => Self::Escalate,
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "rebalance" => Ok(Self::Rebalance),
            "reassign" => Ok(Self::Reassign),
            "escalate" => Ok(Self::Escalate),
            _ => Err(anyhow::anyhow!("Invalid resolution strategy: {s}")),
        }
    }
}

/// A conflict reported by a detector, before it enters the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedConflict {
    pub kind: ConflictKind,
    pub description: String,
    pub agents: Vec<String>,
    pub teams: Vec<Uuid>,
    /// Severity in [0, 1]
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: Uuid,
    pub kind: ConflictKind,
    pub description: String,
    pub agents: Vec<String>,
    pub teams: Vec<Uuid>,
    pub severity: f64,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<ResolutionStrategy>,
}

impl Conflict {
    pub fn from_detected(detected: DetectedConflict) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: detected.kind,
            description: detected.description,
            agents: detected.agents,
            teams: detected.teams,
            severity: detected.severity.clamp(0.0, 1.0),
            detected_at: Utc::now(),
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
