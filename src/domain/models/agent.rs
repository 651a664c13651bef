use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::team::TeamType;

/// Health level reported for an agent by the external monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Degraded,
    Critical,
    Offline,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
            Self::Offline => "offline",
        }
    }

    /// Critical and offline agents are never placed on a team.
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Critical | Self::Offline)
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "critical" => Ok(Self::Critical),
            "offline" => Ok(Self::Offline),
            _ => Err(anyhow::anyhow!("Invalid health level: {s}")),
        }
    }
}

/// Coordinator view of a registered worker agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub capabilities: BTreeSet<String>,
    pub specialization_scores: BTreeMap<String, f64>,
    /// Performance rating in [0, 1]
    pub performance_rating: f64,
    /// Current load in [0, 1]
    pub current_load: f64,
    pub health: HealthLevel,
    /// Collaboration rating in [0, 1]
    pub collaboration_rating: f64,
    pub team_preferences: Vec<TeamType>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rating given to agents registered without specialization scores.
pub const DEFAULT_RATING: f64 = 0.5;

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        capabilities: BTreeSet<String>,
        specialization_scores: BTreeMap<String, f64>,
        team_preferences: Vec<TeamType>,
    ) -> Self {
        let now = Utc::now();
        let performance_rating = mean_score(&specialization_scores).unwrap_or(DEFAULT_RATING);
        Self {
            name: name.into(),
            capabilities,
            specialization_scores,
            performance_rating,
            current_load: 0.0,
            health: HealthLevel::Healthy,
            collaboration_rating: DEFAULT_RATING,
            team_preferences,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Apply a re-registration in place, keeping runtime metrics.
    pub fn reregister(
        &mut self,
        capabilities: BTreeSet<String>,
        specialization_scores: BTreeMap<String, f64>,
        team_preferences: Vec<TeamType>,
    ) {
        if let Some(mean) = mean_score(&specialization_scores) {
            self.performance_rating = mean;
        }
        self.capabilities = capabilities;
        self.specialization_scores = specialization_scores;
        self.team_preferences = team_preferences;
        self.updated_at = Utc::now();
    }

    /// Number of `required` capabilities this agent offers.
    pub fn capability_matches(&self, required: &BTreeSet<String>) -> usize {
        required.intersection(&self.capabilities).count()
    }
}

fn mean_score(scores: &BTreeMap<String, f64>) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: f64 = scores.values().map(|s| s.clamp(0.0, 1.0)).sum();
    Some(sum / scores.len() as f64)
}

/// Partial update of an agent's runtime metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentMetricsUpdate {
    pub current_load: Option<f64>,
    pub performance_rating: Option<f64>,
    pub collaboration_rating: Option<f64>,
}
