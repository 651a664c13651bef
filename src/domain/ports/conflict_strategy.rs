//! Replaceable conflict scoring, detection, and resolution strategies.
//!
//! The coordinator only defines the contract. Each seam ships a trivial
//! default so deployments can swap in real heuristics one at a time.

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentProfile, Conflict, ConflictKind, DetectedConflict, Team};

/// Consistent copy of the coordinator registries taken under its lock.
#[derive(Debug, Clone, Default)]
pub struct CoordinationSnapshot {
    pub agents: Vec<AgentProfile>,
    pub teams: Vec<Team>,
}

impl CoordinationSnapshot {
    pub fn agent(&self, name: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn active_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter().filter(|t| t.is_active())
    }
}

/// Scores the conflict risk of a proposed team → items assignment, in [0, 1].
pub trait ConflictRiskScorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(
        &self,
        assignments: &BTreeMap<Uuid, Vec<String>>,
        snapshot: &CoordinationSnapshot,
    ) -> f64;
}

/// Reports conflicts of one kind.
#[async_trait]
pub trait ConflictDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ConflictKind;

    async fn detect(&self, snapshot: &CoordinationSnapshot) -> DomainResult<Vec<DetectedConflict>>;
}

/// Carries out a concrete resolution. Returning `Ok(false)` leaves the
/// conflict open.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn rebalance(&self, conflict: &Conflict) -> DomainResult<bool>;

    async fn reassign(&self, conflict: &Conflict) -> DomainResult<bool>;

    async fn escalate(&self, conflict: &Conflict) -> DomainResult<bool>;
}

/// Scores every plan as risk-free.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralRiskScorer;

impl ConflictRiskScorer for NeutralRiskScorer {
    fn name(&self) -> &'static str {
        "neutral"
    }

    fn score(&self, _assignments: &BTreeMap<Uuid, Vec<String>>, _snapshot: &CoordinationSnapshot) -> f64 {
        0.0
    }
}

/// Detector that never reports anything.
#[derive(Debug, Clone, Copy)]
pub struct NoopDetector {
    kind: ConflictKind,
}

impl NoopDetector {
    pub fn new(kind: ConflictKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ConflictDetector for NoopDetector {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn kind(&self) -> ConflictKind {
        self.kind
    }

    async fn detect(&self, _snapshot: &CoordinationSnapshot) -> DomainResult<Vec<DetectedConflict>> {
        Ok(Vec::new())
    }
}

/// Resolver that records every resolution as successful.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgingResolver;

#[async_trait]
impl ConflictResolver for AcknowledgingResolver {
    async fn rebalance(&self, conflict: &Conflict) -> DomainResult<bool> {
        tracing::debug!(conflict_id = %conflict.id, "acknowledging rebalance");
        Ok(true)
    }

    async fn reassign(&self, conflict: &Conflict) -> DomainResult<bool> {
        tracing::debug!(conflict_id = %conflict.id, "acknowledging reassign");
        Ok(true)
    }

    async fn escalate(&self, conflict: &Conflict) -> DomainResult<bool> {
        tracing::debug!(conflict_id = %conflict.id, "acknowledging escalation");
        Ok(true)
    }
}
