//! Coordination repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentProfile, Conflict, Team, WorkDistributionPlan};

/// Persistence for the coordinator's registries.
///
/// The coordinator keeps its working set in memory and writes through to
/// this port so a restarted process can rehydrate.
#[async_trait]
pub trait CoordinationRepository: Send + Sync {
    async fn save_agent(&self, profile: &AgentProfile) -> DomainResult<()>;

    async fn delete_agent(&self, name: &str) -> DomainResult<()>;

    async fn list_agents(&self) -> DomainResult<Vec<AgentProfile>>;

    async fn save_team(&self, team: &Team) -> DomainResult<()>;

    async fn list_teams(&self) -> DomainResult<Vec<Team>>;

    async fn save_plan(&self, plan: &WorkDistributionPlan) -> DomainResult<()>;

    /// Save the teams a plan extended together with the plan, all or nothing.
    async fn record_distribution(&self, teams: &[Team], plan: &WorkDistributionPlan) -> DomainResult<()>;

    /// Most recent plans first.
    async fn list_plans(&self, limit: usize) -> DomainResult<Vec<WorkDistributionPlan>>;

    async fn save_conflict(&self, conflict: &Conflict) -> DomainResult<()>;

    async fn list_conflicts(&self) -> DomainResult<Vec<Conflict>>;
}
