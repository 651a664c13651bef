//! Agent coordinator.
//!
//! Owns the agent registry, formed teams, distribution plans and the
//! conflict registry. Every operation takes a short snapshot of the
//! registries under one `RwLock` and computes off-lock. Mutations are
//! serialized by a separate writer mutex: the changed records are persisted
//! to the [`CoordinationRepository`] first and only applied to memory once
//! the write succeeded, so readers never wait on storage and a failed write
//! leaves the registries untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::team::{coordination_complexity, load_balance_score};
use crate::domain::models::{
    AgentMetricsUpdate, AgentProfile, Conflict, ConflictKind, CoordinatorConfig, CoreEvent,
    HealthLevel, RecoveryReport, ResolutionStrategy, Team, TeamStatus, TeamType, WorkDistributionPlan,
};
use crate::domain::ports::{
    AcknowledgingResolver, ConflictDetector, ConflictResolver, ConflictRiskScorer, CoordinationRepository,
    CoordinationSnapshot, EventSink, NeutralRiskScorer, NoopDetector, NullEventSink, OwnerRecovery,
};
use crate::services::storage_retry::RetryPolicy;
use crate::services::team_formation::{self, FormationRequest};

/// Distribution plans kept in memory for status and audit.
const PLAN_HISTORY: usize = 100;

/// Outcome of a performance assessment pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub assessed_at: DateTime<Utc>,
    pub agent_count: usize,
    pub mean_performance: f64,
    pub mean_load: f64,
    /// Agents whose performance fell below the underperformance threshold
    pub underperformers: Vec<String>,
    /// Agents whose load exceeds the team load cap
    pub overloaded: Vec<String>,
}

/// Outcome of a team rebalancing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub teams_checked: usize,
    pub members_removed: usize,
    pub leaders_changed: usize,
    pub teams_disbanded: Vec<Uuid>,
}

/// Aggregate view for dashboards and the health monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorStatus {
    pub total_agents: usize,
    pub available_agents: usize,
    pub health: BTreeMap<HealthLevel, usize>,
    pub active_teams: usize,
    pub team_types: BTreeMap<TeamType, usize>,
    /// Mean current load across registered agents
    pub average_utilization: f64,
    pub active_conflicts: usize,
    pub pending_work: usize,
    pub plans_recorded: usize,
    pub last_performance: Option<PerformanceReport>,
}

#[derive(Default)]
struct Registries {
    agents: BTreeMap<String, AgentProfile>,
    teams: BTreeMap<Uuid, Team>,
    plans: Vec<WorkDistributionPlan>,
    conflicts: BTreeMap<Uuid, Conflict>,
    pending_work: Vec<String>,
    last_performance: Option<PerformanceReport>,
}

impl Registries {
    fn snapshot(&self) -> CoordinationSnapshot {
        let mut teams: Vec<Team> = self.teams.values().cloned().collect();
        teams.sort_by_key(|t| t.formed_at);
        CoordinationSnapshot {
            agents: self.agents.values().cloned().collect(),
            teams,
        }
    }

    fn agent(&self, name: &str) -> DomainResult<&AgentProfile> {
        self.agents.get(name).ok_or_else(|| DomainError::not_found("agent", name))
    }
}

fn check_unit(field: &str, value: f64) -> DomainResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DomainError::ValidationError(format!("{field} must be within [0, 1], got {value}")))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub struct Coordinator<R: CoordinationRepository> {
    repo: Arc<R>,
    config: CoordinatorConfig,
    retry: RetryPolicy,
    registries: RwLock<Registries>,
    /// Held across persist-then-apply so mutations never interleave.
    writes: Mutex<()>,
    risk_scorer: Arc<dyn ConflictRiskScorer>,
    detectors: Vec<Arc<dyn ConflictDetector>>,
    resolver: Arc<dyn ConflictResolver>,
    recovery: Option<Arc<dyn OwnerRecovery>>,
    events: Arc<dyn EventSink>,
}

impl<R: CoordinationRepository> Coordinator<R> {
    /// Create a coordinator with empty registries and default strategies.
    pub fn new(repo: Arc<R>, config: CoordinatorConfig, retry: RetryPolicy) -> Self {
        Self {
            repo,
            config,
            retry,
            registries: RwLock::new(Registries::default()),
            writes: Mutex::new(()),
            risk_scorer: Arc::new(NeutralRiskScorer),
            detectors: [ConflictKind::Resource, ConflictKind::Coordination, ConflictKind::Performance]
                .into_iter()
                .map(|kind| Arc::new(NoopDetector::new(kind)) as Arc<dyn ConflictDetector>)
                .collect(),
            resolver: Arc::new(AcknowledgingResolver),
            recovery: None,
            events: Arc::new(NullEventSink),
        }
    }

    /// Create a coordinator rehydrated from the repository.
    pub async fn load(repo: Arc<R>, config: CoordinatorConfig, retry: RetryPolicy) -> DomainResult<Self> {
        let coordinator = Self::new(repo, config, retry);
        {
            let repo = &coordinator.repo;
            let retry = &coordinator.retry;
            let agents = retry.execute(|| repo.list_agents()).await?;
            let teams = retry.execute(|| repo.list_teams()).await?;
            let conflicts = retry.execute(|| repo.list_conflicts()).await?;
            let mut plans = retry.execute(|| repo.list_plans(PLAN_HISTORY)).await?;
            plans.reverse();

            let mut reg = coordinator.registries.write().await;
            reg.agents = agents.into_iter().map(|a| (a.name.clone(), a)).collect();
            reg.teams = teams.into_iter().map(|t| (t.id, t)).collect();
            reg.conflicts = conflicts.into_iter().map(|c| (c.id, c)).collect();
            reg.plans = plans;
            info!(agents = reg.agents.len(), teams = reg.teams.len(), conflicts = reg.conflicts.len(), "coordinator registries loaded");
        }
        Ok(coordinator)
    }

    pub fn with_risk_scorer(mut self, scorer: Arc<dyn ConflictRiskScorer>) -> Self {
        self.risk_scorer = scorer;
        self
    }

    /// Install a detector, replacing the current detector of the same kind.
    pub fn with_detector(mut self, detector: Arc<dyn ConflictDetector>) -> Self {
        self.detectors.retain(|d| d.kind() != detector.kind());
        self.detectors.push(detector);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_owner_recovery(mut self, recovery: Arc<dyn OwnerRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn risk_scorer_name(&self) -> &'static str {
        self.risk_scorer.name()
    }

    // ----- agent registry -----

    /// Register an agent, or update its declared profile in place.
    #[instrument(skip(self, capabilities, specialization_scores, team_preferences), err)]
    pub async fn register_agent(
        &self,
        name: &str,
        capabilities: BTreeSet<String>,
        specialization_scores: BTreeMap<String, f64>,
        team_preferences: Vec<TeamType>,
    ) -> DomainResult<AgentProfile> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError("agent name cannot be empty".into()));
        }
        for (skill, score) in &specialization_scores {
            check_unit(&format!("specialization score for {skill}"), *score)?;
        }

        let _writer = self.writes.lock().await;
        let existing = self.registries.read().await.agents.get(name).cloned();
        let profile = match existing {
            Some(mut profile) => {
                profile.reregister(capabilities, specialization_scores, team_preferences);
                profile
            }
            None => AgentProfile::new(name, capabilities, specialization_scores, team_preferences),
        };
        self.store_agent(profile.clone()).await?;
        info!(capabilities = profile.capabilities.len(), performance = profile.performance_rating, "agent registered");
        Ok(profile)
    }

    #[instrument(skip(self), err)]
    pub async fn unregister_agent(&self, name: &str) -> DomainResult<AgentProfile> {
        let _writer = self.writes.lock().await;
        self.registries.read().await.agent(name)?;
        self.retry.execute(|| self.repo.delete_agent(name)).await?;
        let profile = self
            .registries
            .write()
            .await
            .agents
            .remove(name)
            .ok_or_else(|| DomainError::not_found("agent", name))?;
        info!("agent unregistered");
        Ok(profile)
    }

    /// Apply runtime metrics reported by the health monitor.
    pub async fn update_agent_metrics(&self, name: &str, update: AgentMetricsUpdate) -> DomainResult<AgentProfile> {
        if let Some(load) = update.current_load {
            check_unit("current load", load)?;
        }
        if let Some(perf) = update.performance_rating {
            check_unit("performance rating", perf)?;
        }
        if let Some(collab) = update.collaboration_rating {
            check_unit("collaboration rating", collab)?;
        }

        let _writer = self.writes.lock().await;
        let mut profile = self.registries.read().await.agent(name)?.clone();
        if let Some(load) = update.current_load {
            profile.current_load = load;
        }
        if let Some(perf) = update.performance_rating {
            profile.performance_rating = perf;
        }
        if let Some(collab) = update.collaboration_rating {
            profile.collaboration_rating = collab;
        }
        profile.updated_at = Utc::now();
        self.store_agent(profile.clone()).await?;
        debug!(agent = %name, load = profile.current_load, "agent metrics updated");
        Ok(profile)
    }

    pub async fn report_health(&self, name: &str, health: HealthLevel) -> DomainResult<AgentProfile> {
        let _writer = self.writes.lock().await;
        let mut profile = self.registries.read().await.agent(name)?.clone();
        let previous = profile.health;
        profile.health = health;
        profile.updated_at = Utc::now();
        self.store_agent(profile.clone()).await?;
        if previous != health {
            info!(agent = %name, from = %previous, to = %health, "agent health changed");
        }
        Ok(profile)
    }

    /// Persist a profile, then publish it to the registry.
    async fn store_agent(&self, profile: AgentProfile) -> DomainResult<()> {
        self.retry.execute(|| self.repo.save_agent(&profile)).await?;
        self.registries.write().await.agents.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Persist a team, then publish it to the registry.
    async fn store_team(&self, team: Team) -> DomainResult<()> {
        self.retry.execute(|| self.repo.save_team(&team)).await?;
        self.registries.write().await.teams.insert(team.id, team);
        Ok(())
    }

    pub async fn agent(&self, name: &str) -> DomainResult<AgentProfile> {
        self.registries.read().await.agent(name).cloned()
    }

    pub async fn agents(&self) -> Vec<AgentProfile> {
        self.registries.read().await.agents.values().cloned().collect()
    }

    // ----- teams and distribution -----

    /// Form a team for `request.workload`, or `None` when too few agents qualify.
    #[instrument(skip(self, request), fields(items = request.workload.len()), err)]
    pub async fn form_team(&self, team_type: TeamType, request: FormationRequest) -> DomainResult<Option<Team>> {
        let agents = self.agents().await;

        let Some(selection) = team_formation::select_members(&agents, team_type, &request, &self.config) else {
            info!(available = agents.len(), "not enough qualifying agents to form team");
            return Ok(None);
        };
        let team = team_formation::assemble_team(team_type, selection, request.workload, &self.config);

        {
            let _writer = self.writes.lock().await;
            self.store_team(team.clone()).await?;
        }

        info!(team_id = %team.id, members = team.members.len(), leader = ?team.leader, "team formed");
        self.events.publish(CoreEvent::TeamFormed {
            team_id: team.id,
            team_type,
            members: team.members.clone(),
        });
        Ok(Some(team))
    }

    pub async fn teams(&self) -> Vec<Team> {
        self.registries.read().await.snapshot().teams
    }

    pub async fn team(&self, id: Uuid) -> DomainResult<Team> {
        self.registries
            .read()
            .await
            .teams
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("team", id.to_string()))
    }

    /// Queue work items for the distribution loop. Returns the backlog size.
    pub async fn submit_work(&self, items: Vec<String>) -> usize {
        let mut reg = self.registries.write().await;
        reg.pending_work.extend(items.into_iter().filter(|i| !i.trim().is_empty()));
        reg.pending_work.len()
    }

    /// Partition `items` round-robin across active, under-loaded teams.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn distribute_work(&self, items: Vec<String>) -> DomainResult<WorkDistributionPlan> {
        let _writer = self.writes.lock().await;
        let snapshot = self.registries.read().await.snapshot();
        let loads: HashMap<&str, f64> = snapshot.agents.iter().map(|a| (a.name.as_str(), a.current_load)).collect();

        let team_load = |team: &Team| mean(team.members.iter().filter_map(|m| loads.get(m.as_str()).copied()));
        let mut eligible: Vec<(&Team, f64)> = snapshot
            .active_teams()
            .map(|t| (t, team_load(t)))
            .filter(|(_, load)| *load < self.config.team_underload_threshold)
            .collect();
        eligible.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.formed_at.cmp(&b.0.formed_at)));

        let mut assignments: BTreeMap<Uuid, Vec<String>> = eligible.iter().map(|(t, _)| (t.id, Vec::new())).collect();
        let unassigned = if eligible.is_empty() {
            items
        } else {
            for (idx, item) in items.into_iter().enumerate() {
                let team_id = eligible[idx % eligible.len()].0.id;
                assignments.entry(team_id).or_default().push(item);
            }
            Vec::new()
        };
        // Idle eligible teams count towards balance.
        let counts: Vec<usize> = assignments.values().map(Vec::len).collect();
        assignments.retain(|_, items| !items.is_empty());

        let now = Utc::now();
        let mut plan = WorkDistributionPlan {
            batch_id: Uuid::new_v4(),
            load_balance_score: load_balance_score(&counts),
            conflict_risk_score: self.risk_scorer.score(&assignments, &snapshot).clamp(0.0, 1.0),
            coordination_complexity: coordination_complexity(assignments.len()),
            estimated_completion: now,
            assignments,
            unassigned,
            created_at: now,
        };
        let rounds = plan.max_items_per_team() as u32;
        plan.estimated_completion = now
            + chrono::Duration::from_std(self.config.per_item_duration() * rounds)
                .map_err(|e| DomainError::ValidationError(format!("completion estimate out of range: {e}")))?;

        let extended: Vec<Team> = snapshot
            .teams
            .iter()
            .filter_map(|team| {
                let items = plan.assignments.get(&team.id)?;
                let mut team = team.clone();
                team.assigned_items.extend(items.iter().cloned());
                Some(team)
            })
            .collect();
        self.retry.execute(|| self.repo.record_distribution(&extended, &plan)).await?;

        {
            let mut reg = self.registries.write().await;
            for team in extended {
                reg.teams.insert(team.id, team);
            }
            reg.plans.push(plan.clone());
            let overflow = reg.plans.len().saturating_sub(PLAN_HISTORY);
            reg.plans.drain(..overflow);
        }

        info!(
            batch_id = %plan.batch_id,
            teams = plan.assignments.len(),
            unassigned = plan.unassigned.len(),
            load_balance = plan.load_balance_score,
            "work distributed"
        );
        self.events.publish(CoreEvent::WorkDistributed {
            batch_id: plan.batch_id,
            teams: plan.assignments.len(),
            items: counts.iter().sum(),
        });
        Ok(plan)
    }

    /// Distribute the submitted backlog. Items no team could take go back on it.
    pub async fn distribute_pending(&self) -> DomainResult<Option<WorkDistributionPlan>> {
        let items = std::mem::take(&mut self.registries.write().await.pending_work);
        if items.is_empty() {
            return Ok(None);
        }

        match self.distribute_work(items.clone()).await {
            Ok(plan) => {
                if !plan.unassigned.is_empty() {
                    let mut reg = self.registries.write().await;
                    let mut requeued = plan.unassigned.clone();
                    requeued.append(&mut reg.pending_work);
                    reg.pending_work = requeued;
                }
                Ok(Some(plan))
            }
            Err(e) => {
                let mut reg = self.registries.write().await;
                let mut requeued = items;
                requeued.append(&mut reg.pending_work);
                reg.pending_work = requeued;
                Err(e)
            }
        }
    }

    pub async fn plans(&self, limit: usize) -> Vec<WorkDistributionPlan> {
        self.registries.read().await.plans.iter().rev().take(limit).cloned().collect()
    }

    /// Drop members that became unavailable, re-elect lost leaders, and
    /// disband teams that fall below their type's minimum.
    pub async fn rebalance_teams(&self) -> DomainResult<RebalanceReport> {
        let _writer = self.writes.lock().await;
        let snapshot = self.registries.read().await.snapshot();
        let mut report = RebalanceReport::default();
        let mut changes: Vec<(Uuid, Vec<String>, Option<String>, TeamStatus)> = Vec::new();

        for team in snapshot.active_teams() {
            report.teams_checked += 1;
            let remaining: Vec<&AgentProfile> = team
                .members
                .iter()
                .filter_map(|m| snapshot.agent(m))
                .filter(|a| team_formation::is_available(a, team.team_type, &self.config))
                .collect();
            let removed = team.members.len() - remaining.len();
            if removed == 0 {
                continue;
            }
            report.members_removed += removed;

            if remaining.len() < team_formation::minimum_size(team.team_type, &self.config) {
                report.teams_disbanded.push(team.id);
                changes.push((team.id, remaining.iter().map(|a| a.name.clone()).collect(), None, TeamStatus::Disbanded));
                continue;
            }

            let leader_left = team
                .leader
                .as_ref()
                .is_some_and(|l| !remaining.iter().any(|a| &a.name == l));
            let leader = if leader_left {
                report.leaders_changed += 1;
                team_formation::elect_leader(team.team_type, &remaining)
            } else {
                team.leader.clone()
            };
            changes.push((team.id, remaining.iter().map(|a| a.name.clone()).collect(), leader, TeamStatus::Active));
        }

        let now = Utc::now();
        for (id, members, leader, status) in changes {
            let Some(mut team) = snapshot.teams.iter().find(|t| t.id == id).cloned() else {
                continue;
            };
            team.coordination_overhead = team.team_type.coordination_overhead(members.len());
            team.estimated_completion = team_formation::estimate_completion(
                team.team_type,
                members.len(),
                team.assigned_items.len(),
                team.coordination_overhead,
                &self.config,
                now,
            );
            team.members = members;
            team.leader = leader;
            team.status = status;
            self.store_team(team).await?;
        }

        if report.members_removed > 0 {
            info!(
                removed = report.members_removed,
                disbanded = report.teams_disbanded.len(),
                leaders_changed = report.leaders_changed,
                "teams rebalanced"
            );
        }
        Ok(report)
    }

    /// Summarize agent performance and load. The latest report is kept for `status`.
    pub async fn assess_performance(&self) -> PerformanceReport {
        let agents = self.agents().await;
        let report = PerformanceReport {
            assessed_at: Utc::now(),
            agent_count: agents.len(),
            mean_performance: mean(agents.iter().map(|a| a.performance_rating)),
            mean_load: mean(agents.iter().map(|a| a.current_load)),
            underperformers: agents
                .iter()
                .filter(|a| a.performance_rating < self.config.underperformance_threshold)
                .map(|a| a.name.clone())
                .collect(),
            overloaded: agents
                .iter()
                .filter(|a| a.current_load > self.config.max_agent_load)
                .map(|a| a.name.clone())
                .collect(),
        };

        if !report.underperformers.is_empty() || !report.overloaded.is_empty() {
            warn!(underperformers = ?report.underperformers, overloaded = ?report.overloaded, "performance assessment flagged agents");
        }
        self.registries.write().await.last_performance = Some(report.clone());
        report
    }

    // ----- conflicts -----

    /// Run every detector against one registry snapshot and record what they find.
    ///
    /// A failing detector is logged and skipped.
    pub async fn detect_conflicts(&self) -> DomainResult<Vec<Conflict>> {
        let snapshot = self.registries.read().await.snapshot();

        let mut found = Vec::new();
        for detector in &self.detectors {
            match detector.detect(&snapshot).await {
                Ok(detected) => found.extend(detected.into_iter().map(|mut d| {
                    d.kind = detector.kind();
                    Conflict::from_detected(d)
                })),
                Err(e) => warn!(detector = detector.name(), error = %e, "conflict detector failed"),
            }
        }

        if found.is_empty() {
            return Ok(found);
        }

        {
            let _writer = self.writes.lock().await;
            for conflict in &found {
                self.retry.execute(|| self.repo.save_conflict(conflict)).await?;
                self.registries.write().await.conflicts.insert(conflict.id, conflict.clone());
            }
        }

        for conflict in &found {
            info!(conflict_id = %conflict.id, kind = %conflict.kind, severity = conflict.severity, "conflict detected");
            self.events.publish(CoreEvent::ConflictDetected {
                conflict_id: conflict.id,
                kind: conflict.kind,
            });
        }
        Ok(found)
    }

    /// Resolve a conflict. Returns whether the resolver succeeded.
    #[instrument(skip(self), err)]
    pub async fn resolve_conflict(&self, id: Uuid, strategy: ResolutionStrategy) -> DomainResult<bool> {
        let conflict = self
            .registries
            .read()
            .await
            .conflicts
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("conflict", id.to_string()))?;
        if conflict.is_resolved() {
            return Err(DomainError::invalid_state("conflict", id.to_string(), "resolved", "resolve"));
        }

        let concrete = match strategy {
            ResolutionStrategy::Auto => ResolutionStrategy::auto_for(conflict.kind),
            other => other,
        };
        let resolved = match concrete {
            ResolutionStrategy::Rebalance => self.resolver.rebalance(&conflict).await?,
            ResolutionStrategy::Reassign => self.resolver.reassign(&conflict).await?,
            ResolutionStrategy::Escalate | ResolutionStrategy::Auto => self.resolver.escalate(&conflict).await?,
        };
        if !resolved {
            info!(strategy = %concrete, "conflict left open by resolver");
            return Ok(false);
        }

        {
            let _writer = self.writes.lock().await;
            let mut entry = self
                .registries
                .read()
                .await
                .conflicts
                .get(&id)
                .cloned()
                .ok_or_else(|| DomainError::not_found("conflict", id.to_string()))?;
            if entry.is_resolved() {
                return Err(DomainError::invalid_state("conflict", id.to_string(), "resolved", "resolve"));
            }
            entry.resolved_at = Some(Utc::now());
            entry.resolution = Some(concrete);
            self.retry.execute(|| self.repo.save_conflict(&entry)).await?;
            self.registries.write().await.conflicts.insert(id, entry);
        }

        info!(strategy = %concrete, "conflict resolved");
        self.events.publish(CoreEvent::ConflictResolved {
            conflict_id: id,
            strategy: concrete,
        });
        Ok(true)
    }

    pub async fn conflicts(&self) -> Vec<Conflict> {
        self.registries.read().await.conflicts.values().cloned().collect()
    }

    // ----- crash recovery -----

    /// Recover owners whose heartbeat lapsed and mark their agents Offline.
    ///
    /// One failing owner never stops the sweep.
    pub async fn recover_stalled_agents(&self, timeout: Duration) -> DomainResult<Vec<RecoveryReport>> {
        let Some(recovery) = self.recovery.as_ref() else {
            return Ok(Vec::new());
        };

        let stalled = recovery.detect_stalled_owners(timeout).await?;
        let mut reports = Vec::with_capacity(stalled.len());
        for owner in stalled {
            warn!(owner = %owner.owner, last_heartbeat = %owner.last_heartbeat, "owner heartbeat lapsed");
            match recovery.recover_owner(&owner.owner).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(owner = %owner.owner, error = %e, "owner recovery failed");
                    continue;
                }
            }
            match self.report_health(&owner.owner, HealthLevel::Offline).await {
                Ok(_) | Err(DomainError::NotFound { .. }) => {}
                Err(e) => warn!(owner = %owner.owner, error = %e, "failed to mark agent offline"),
            }
        }
        Ok(reports)
    }

    // ----- status -----

    pub async fn status(&self) -> CoordinatorStatus {
        let reg = self.registries.read().await;

        let mut health: BTreeMap<HealthLevel, usize> = BTreeMap::new();
        for agent in reg.agents.values() {
            *health.entry(agent.health).or_default() += 1;
        }
        let mut team_types: BTreeMap<TeamType, usize> = BTreeMap::new();
        for team in reg.teams.values().filter(|t| t.is_active()) {
            *team_types.entry(team.team_type).or_default() += 1;
        }

        CoordinatorStatus {
            total_agents: reg.agents.len(),
            available_agents: reg.agents.values().filter(|a| a.health.is_available()).count(),
            health,
            active_teams: team_types.values().sum(),
            team_types,
            average_utilization: mean(reg.agents.values().map(|a| a.current_load)),
            active_conflicts: reg.conflicts.values().filter(|c| !c.is_resolved()).count(),
            pending_work: reg.pending_work.len(),
            plans_recorded: reg.plans.len(),
            last_performance: reg.last_performance.clone(),
        }
    }
}
