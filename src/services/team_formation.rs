//! Team formation strategies.
//!
//! Pure functions over a snapshot of agent profiles. One strategy per
//! [`TeamType`]; each decides which agents qualify, how they rank, how many
//! to take and who leads. The coordinator owns locking and persistence.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::models::{AgentProfile, CoordinatorConfig, Team, TeamStatus, TeamType};

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct FormationRequest {
    pub workload: Vec<String>,
    pub required_capabilities: BTreeSet<String>,
    pub preferred_agents: Vec<String>,
}

/// Members chosen by a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub members: Vec<String>,
    pub leader: Option<String>,
}

trait FormationStrategy {
    fn min_size(&self, config: &CoordinatorConfig) -> usize {
        config.min_team_size
    }

    fn max_size(&self, config: &CoordinatorConfig, _request: &FormationRequest) -> usize {
        config.max_team_size
    }

    /// Agents this strategy will consider. `pool` is already health/load filtered.
    fn eligible<'a>(
        &self,
        pool: Vec<&'a AgentProfile>,
        _request: &FormationRequest,
        _config: &CoordinatorConfig,
    ) -> Vec<&'a AgentProfile> {
        pool
    }

    /// Best candidate first.
    fn compare(&self, a: &AgentProfile, b: &AgentProfile, request: &FormationRequest) -> Ordering;

    /// Take members from `ordered` (preferred agents first, then by rank).
    fn pick<'a>(
        &self,
        ordered: Vec<&'a AgentProfile>,
        size: usize,
        _request: &FormationRequest,
        _min: usize,
    ) -> Vec<&'a AgentProfile> {
        ordered.into_iter().take(size).collect()
    }

    fn leader(&self, members: &[&AgentProfile], request: &FormationRequest) -> Option<String>;
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

fn asc(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Highest-ranked member according to `strategy`.
fn top_ranked(
    strategy: &dyn FormationStrategy,
    members: &[&AgentProfile],
    request: &FormationRequest,
) -> Option<String> {
    members
        .iter()
        .min_by(|a, b| strategy.compare(a, b, request))
        .map(|a| a.name.clone())
}

struct Parallel;

impl FormationStrategy for Parallel {
    fn max_size(&self, config: &CoordinatorConfig, request: &FormationRequest) -> usize {
        let wanted = request.workload.len().div_ceil(2) + 1;
        wanted.clamp(config.min_team_size, config.max_team_size.max(config.min_team_size))
    }

    fn compare(&self, a: &AgentProfile, b: &AgentProfile, _request: &FormationRequest) -> Ordering {
        desc(a.performance_rating, b.performance_rating)
            .then_with(|| asc(a.current_load, b.current_load))
            .then_with(|| a.name.cmp(&b.name))
    }

    fn leader(&self, _members: &[&AgentProfile], _request: &FormationRequest) -> Option<String> {
        None
    }
}

struct Pipeline;

impl Pipeline {
    fn universe(pool: &[&AgentProfile], request: &FormationRequest) -> BTreeSet<String> {
        if request.required_capabilities.is_empty() {
            pool.iter().flat_map(|a| a.capabilities.iter().cloned()).collect()
        } else {
            request.required_capabilities.clone()
        }
    }
}

impl FormationStrategy for Pipeline {
    fn compare(&self, a: &AgentProfile, b: &AgentProfile, _request: &FormationRequest) -> Ordering {
        b.capabilities
            .len()
            .cmp(&a.capabilities.len())
            .then_with(|| desc(a.collaboration_rating, b.collaboration_rating))
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Greedy set cover: each round takes the candidate adding the most
    /// uncovered capabilities. Stops once nothing new is added and the team
    /// has reached its minimum.
    fn pick<'a>(
        &self,
        ordered: Vec<&'a AgentProfile>,
        size: usize,
        request: &FormationRequest,
        min: usize,
    ) -> Vec<&'a AgentProfile> {
        let universe = Self::universe(&ordered, request);
        let preferred: BTreeSet<&str> = request.preferred_agents.iter().map(String::as_str).collect();
        let (mut members, mut remaining): (Vec<_>, Vec<_>) =
            ordered.into_iter().partition(|a| preferred.contains(a.name.as_str()));
        members.truncate(size);

        let mut covered: BTreeSet<&str> = members
            .iter()
            .copied()
            .flat_map(|a| a.capabilities.iter().map(String::as_str))
            .filter(|c| universe.contains(*c))
            .collect();

        while members.len() < size && !remaining.is_empty() {
            let gain = |a: &AgentProfile| {
                a.capabilities
                    .iter()
                    .filter(|c| universe.contains(*c) && !covered.contains(c.as_str()))
                    .count()
            };
            // `remaining` is already in rank order, so the first maximum wins ties.
            let (best_idx, best_gain) = remaining
                .iter()
                .enumerate()
                .map(|(i, a)| (i, gain(*a)))
                .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best });

            if best_gain == 0 && members.len() >= min {
                break;
            }
            let chosen = remaining.remove(best_idx);
            covered.extend(chosen.capabilities.iter().map(String::as_str).filter(|c| universe.contains(*c)));
            members.push(chosen);
        }
        members
    }

    fn leader(&self, members: &[&AgentProfile], _request: &FormationRequest) -> Option<String> {
        members
            .iter()
            .min_by(|a, b| desc(a.collaboration_rating, b.collaboration_rating).then_with(|| a.name.cmp(&b.name)))
            .map(|a| a.name.clone())
    }
}

struct Mesh;

impl FormationStrategy for Mesh {
    fn eligible<'a>(
        &self,
        pool: Vec<&'a AgentProfile>,
        _request: &FormationRequest,
        config: &CoordinatorConfig,
    ) -> Vec<&'a AgentProfile> {
        let collaborative: Vec<_> = pool
            .iter()
            .copied()
            .filter(|a| a.collaboration_rating > config.mesh_collaboration_threshold)
            .collect();
        if collaborative.len() >= config.min_team_size {
            collaborative
        } else {
            // Not enough strong collaborators: fall back to the best available.
            pool
        }
    }

    fn compare(&self, a: &AgentProfile, b: &AgentProfile, _request: &FormationRequest) -> Ordering {
        desc(a.collaboration_rating, b.collaboration_rating)
            .then_with(|| desc(a.performance_rating, b.performance_rating))
            .then_with(|| a.name.cmp(&b.name))
    }

    fn leader(&self, members: &[&AgentProfile], _request: &FormationRequest) -> Option<String> {
        let score = |a: &AgentProfile| (a.collaboration_rating + a.performance_rating) / 2.0;
        members
            .iter()
            .min_by(|a, b| desc(score(**a), score(**b)).then_with(|| a.name.cmp(&b.name)))
            .map(|a| a.name.clone())
    }
}

struct Specialist;

impl FormationStrategy for Specialist {
    fn eligible<'a>(
        &self,
        pool: Vec<&'a AgentProfile>,
        request: &FormationRequest,
        config: &CoordinatorConfig,
    ) -> Vec<&'a AgentProfile> {
        pool.into_iter()
            .filter(|a| a.performance_rating > config.specialist_performance_threshold)
            .filter(|a| {
                request.required_capabilities.is_empty()
                    || a.capability_matches(&request.required_capabilities) > 0
            })
            .collect()
    }

    fn compare(&self, a: &AgentProfile, b: &AgentProfile, request: &FormationRequest) -> Ordering {
        let required = &request.required_capabilities;
        b.capability_matches(required)
            .cmp(&a.capability_matches(required))
            .then_with(|| desc(a.performance_rating, b.performance_rating))
            .then_with(|| a.name.cmp(&b.name))
    }

    fn leader(&self, members: &[&AgentProfile], request: &FormationRequest) -> Option<String> {
        top_ranked(self, members, request)
    }
}

struct Emergency;

impl FormationStrategy for Emergency {
    fn min_size(&self, config: &CoordinatorConfig) -> usize {
        config.emergency_min_team_size
    }

    fn max_size(&self, config: &CoordinatorConfig, _request: &FormationRequest) -> usize {
        config.emergency_max_team_size.max(config.emergency_min_team_size)
    }

    fn compare(&self, a: &AgentProfile, b: &AgentProfile, _request: &FormationRequest) -> Ordering {
        desc(a.performance_rating, b.performance_rating)
            .then_with(|| asc(a.current_load, b.current_load))
            .then_with(|| desc(a.collaboration_rating, b.collaboration_rating))
            .then_with(|| a.name.cmp(&b.name))
    }

    fn leader(&self, members: &[&AgentProfile], request: &FormationRequest) -> Option<String> {
        top_ranked(self, members, request)
    }
}

fn strategy_for(team_type: TeamType) -> &'static dyn FormationStrategy {
    match team_type {
        TeamType::Parallel => &Parallel,
        TeamType::Pipeline => &Pipeline,
        TeamType::Mesh => &Mesh,
        TeamType::Specialist => &Specialist,
        TeamType::Emergency => &Emergency,
    }
}

/// Smallest team a type may form.
pub fn minimum_size(team_type: TeamType, config: &CoordinatorConfig) -> usize {
    strategy_for(team_type).min_size(config).max(1)
}

/// Load above which an agent is excluded from a team of `team_type`.
pub fn load_cap(team_type: TeamType, config: &CoordinatorConfig) -> f64 {
    match team_type {
        TeamType::Emergency => config.emergency_max_load,
        _ => config.max_agent_load,
    }
}

/// Whether an agent may serve on a team of `team_type` at all.
pub fn is_available(agent: &AgentProfile, team_type: TeamType, config: &CoordinatorConfig) -> bool {
    agent.health.is_available() && agent.current_load <= load_cap(team_type, config)
}

/// Choose members and a leader, or `None` when too few agents qualify.
pub fn select_members(
    agents: &[AgentProfile],
    team_type: TeamType,
    request: &FormationRequest,
    config: &CoordinatorConfig,
) -> Option<Selection> {
    let strategy = strategy_for(team_type);
    let min = minimum_size(team_type, config);

    let pool: Vec<&AgentProfile> = agents.iter().filter(|a| is_available(a, team_type, config)).collect();
    let mut eligible = strategy.eligible(pool, request, config);
    if eligible.len() < min {
        return None;
    }

    eligible.sort_by(|a, b| strategy.compare(a, b, request));

    // Preferred agents that survived the filter go first, in the caller's order.
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut ordered: Vec<&AgentProfile> = Vec::with_capacity(eligible.len());
    for name in &request.preferred_agents {
        if let Some(agent) = eligible.iter().copied().find(|a| &a.name == name) {
            if seen.insert(agent.name.clone()) {
                ordered.push(agent);
            }
        }
    }
    ordered.extend(eligible.into_iter().filter(|a| !seen.contains(&a.name)));

    let size = strategy.max_size(config, request).max(min);
    let members = strategy.pick(ordered, size, request, min);
    if members.len() < min {
        return None;
    }

    Some(Selection {
        leader: strategy.leader(&members, request),
        members: members.into_iter().map(|a| a.name.clone()).collect(),
    })
}

/// Expected finish time of `items` spread over `members` agents.
pub fn estimate_completion(
    team_type: TeamType,
    members: usize,
    items: usize,
    overhead: f64,
    config: &CoordinatorConfig,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if members == 0 || items == 0 {
        return now;
    }
    let rounds = items.div_ceil(members) as f64;
    let mut secs = rounds * config.per_item_duration_secs as f64 * (1.0 + overhead);
    if team_type == TeamType::Emergency {
        secs *= config.emergency_speedup;
    }
    now + chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Build an active team from a selection.
pub fn assemble_team(
    team_type: TeamType,
    selection: Selection,
    workload: Vec<String>,
    config: &CoordinatorConfig,
) -> Team {
    let now = Utc::now();
    let overhead = team_type.coordination_overhead(selection.members.len());
    Team {
        id: Uuid::new_v4(),
        team_type,
        leader: selection.leader,
        estimated_completion: estimate_completion(
            team_type,
            selection.members.len(),
            workload.len(),
            overhead,
            config,
            now,
        ),
        members: selection.members,
        assigned_items: workload,
        coordination_overhead: overhead,
        status: TeamStatus::Active,
        formed_at: now,
    }
}

/// Re-elect a leader for an existing team after its membership changed.
pub fn elect_leader(team_type: TeamType, members: &[&AgentProfile]) -> Option<String> {
    strategy_for(team_type).leader(members, &FormationRequest::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HealthLevel;
    use std::collections::BTreeMap;

    fn agent(name: &str, perf: f64, load: f64, collab: f64, caps: &[&str]) -> AgentProfile {
        let mut a = AgentProfile::new(
            name,
            caps.iter().map(|c| (*c).to_string()).collect(),
            BTreeMap::new(),
            vec![],
        );
        a.performance_rating = perf;
        a.current_load = load;
        a.collaboration_rating = collab;
        a
    }

    fn work(n: usize) -> FormationRequest {
        FormationRequest {
            workload: (0..n).map(|i| format!("w{i}")).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parallel_size_and_ranking() {
        let config = CoordinatorConfig::default();
        let agents: Vec<_> = (0..6)
            .map(|i| agent(&format!("a{i}"), 0.5 + i as f64 * 0.05, 0.1, 0.5, &[]))
            .collect();

        // ceil(4/2)+1 = 3
        let selection = select_members(&agents, TeamType::Parallel, &work(4), &config).unwrap();
        assert_eq!(selection.members, vec!["a5", "a4", "a3"]);
        assert_eq!(selection.leader, None);

        // ceil(1/2)+1 = 2 = min
        let selection = select_members(&agents, TeamType::Parallel, &work(1), &config).unwrap();
        assert_eq!(selection.members.len(), 2);
    }

    #[test]
    fn test_prefilter_excludes_unhealthy_and_overloaded() {
        let config = CoordinatorConfig::default();
        let mut sick = agent("sick", 0.9, 0.1, 0.5, &[]);
        sick.health = HealthLevel::Critical;
        let busy = agent("busy", 0.9, 0.93, 0.5, &[]);
        let ok = agent("ok", 0.5, 0.1, 0.5, &[]);
        let agents = vec![sick, busy, ok];

        assert!(select_members(&agents, TeamType::Parallel, &work(2), &config).is_none());

        // Emergency tolerates load up to 0.95.
        let selection = select_members(&agents, TeamType::Emergency, &work(2), &config).unwrap();
        assert_eq!(selection.members, vec!["busy", "ok"]);
        assert_eq!(selection.leader.as_deref(), Some("busy"));
    }

    #[test]
    fn test_preferred_agents_go_first() {
        let config = CoordinatorConfig::default();
        let agents = vec![
            agent("fast", 0.9, 0.0, 0.5, &[]),
            agent("mid", 0.7, 0.0, 0.5, &[]),
            agent("slow", 0.3, 0.0, 0.5, &[]),
        ];
        let request = FormationRequest {
            preferred_agents: vec!["slow".into(), "ghost".into()],
            ..work(1)
        };
        let selection = select_members(&agents, TeamType::Parallel, &request, &config).unwrap();
        assert_eq!(selection.members, vec!["slow", "fast"]);
    }

    #[test]
    fn test_pipeline_maximizes_coverage() {
        let config = CoordinatorConfig::default();
        let agents = vec![
            agent("generalist", 0.5, 0.0, 0.4, &["a", "b"]),
            agent("dup", 0.5, 0.0, 0.9, &["a", "b"]),
            agent("tester", 0.5, 0.0, 0.6, &["c"]),
            agent("noop", 0.5, 0.0, 0.5, &[]),
        ];
        let request = FormationRequest {
            required_capabilities: ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect(),
            ..work(3)
        };
        let selection = select_members(&agents, TeamType::Pipeline, &request, &config).unwrap();
        assert_eq!(selection.members, vec!["dup", "tester"]);
        assert_eq!(selection.leader.as_deref(), Some("dup"));
    }

    #[test]
    fn test_mesh_falls_back_when_few_collaborators() {
        let config = CoordinatorConfig::default();
        let agents = vec![
            agent("social", 0.5, 0.0, 0.9, &[]),
            agent("loner", 0.9, 0.0, 0.2, &[]),
        ];
        let selection = select_members(&agents, TeamType::Mesh, &work(2), &config).unwrap();
        assert_eq!(selection.members, vec!["social", "loner"]);
        // (0.9 + 0.5) / 2 = 0.7 vs (0.2 + 0.9) / 2 = 0.55
        assert_eq!(selection.leader.as_deref(), Some("social"));
    }

    #[test]
    fn test_specialist_requires_performance_and_match() {
        let config = CoordinatorConfig::default();
        let agents = vec![
            agent("expert", 0.8, 0.0, 0.5, &["rust", "sql"]),
            agent("partial", 0.95, 0.0, 0.5, &["rust"]),
            agent("weak", 0.6, 0.0, 0.5, &["rust", "sql"]),
            agent("other", 0.9, 0.0, 0.5, &["go"]),
        ];
        let request = FormationRequest {
            required_capabilities: ["rust", "sql"].iter().map(|s| (*s).to_string()).collect(),
            ..work(2)
        };
        let selection = select_members(&agents, TeamType::Specialist, &request, &config).unwrap();
        assert_eq!(selection.members, vec!["expert", "partial"]);
        assert_eq!(selection.leader.as_deref(), Some("expert"));
    }

    #[test]
    fn test_completion_estimate() {
        let config = CoordinatorConfig::default();
        let now = Utc::now();
        // ceil(5/2) = 3 rounds × 1800s × 1.1
        let eta = estimate_completion(TeamType::Parallel, 2, 5, 0.1, &config, now);
        assert_eq!((eta - now).num_seconds(), 5940);

        let eta = estimate_completion(TeamType::Emergency, 2, 5, 0.1, &config, now);
        assert_eq!((eta - now).num_seconds(), 4158);
    }
}
