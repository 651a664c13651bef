use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Coordination strategy of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamType {
    Parallel,
    Pipeline,
    Mesh,
    Specialist,
    Emergency,
}

impl TeamType {
    pub const ALL: [Self; 5] = [
        Self::Parallel,
        Self::Pipeline,
        Self::Mesh,
        Self::Specialist,
        Self::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Pipeline => "pipeline",
            Self::Mesh => "mesh",
            Self::Specialist => "specialist",
            Self::Emergency => "emergency",
        }
    }

    /// Estimated coordination overhead for a team of `members`, in [0, 1].
    pub fn coordination_overhead(&self, members: usize) -> f64 {
        let n = members as f64;
        let raw = match self {
            Self::Parallel | Self::Emergency => 0.05 * n,
            Self::Pipeline => 0.1 * (n - 1.0).max(0.0),
            Self::Mesh => 0.02 * n * (n - 1.0) / 2.0,
            Self::Specialist => 0.08 * n,
        };
        raw.clamp(0.0, 1.0)
    }
}

impl fmt::Display for TeamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "pipeline" => Ok(Self::Pipeline),
            "mesh" => Ok(Self::Mesh),
            "specialist" => Ok(Self::Specialist),
            "emergency" => Ok(Self::Emergency),
            _ => Err(anyhow::anyhow!("Invalid team type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Active,
    Disbanded,
}

/// An ad hoc group of agents formed for one work batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub team_type: TeamType,
    pub leader: Option<String>,
    pub members: Vec<String>,
    pub assigned_items: Vec<String>,
    pub coordination_overhead: f64,
    pub estimated_completion: DateTime<Utc>,
    pub status: TeamStatus,
    pub formed_at: DateTime<Utc>,
}

impl Team {
    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }
}

/// Result of partitioning a batch of work across teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDistributionPlan {
    pub batch_id: Uuid,
    pub assignments: BTreeMap<Uuid, Vec<String>>,
    /// Items that found no under-loaded team
    pub unassigned: Vec<String>,
    pub load_balance_score: f64,
    pub conflict_risk_score: f64,
    pub coordination_complexity: f64,
    pub estimated_completion: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WorkDistributionPlan {
    pub fn max_items_per_team(&self) -> usize {
        self.assignments.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// `1 − maxDeviationFromMean / mean`, clamped to [0, 1].
///
/// An empty or all-zero distribution is perfectly balanced.
pub fn load_balance_score(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 1.0;
    }
    let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    if mean <= f64::EPSILON {
        return 1.0;
    }
    let max_deviation = counts
        .iter()
        .map(|&c| (c as f64 - mean).abs())
        .fold(0.0_f64, f64::max);
    (1.0 - max_deviation / mean).clamp(0.0, 1.0)
}

/// `min(1, teamCount / 10)`.
pub fn coordination_complexity(team_count: usize) -> f64 {
    (team_count as f64 / 10.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balance_score() {
        assert!((load_balance_score(&[3, 3, 3]) - 1.0).abs() < f64::EPSILON);
        // mean 2, max deviation 1
        assert!((load_balance_score(&[3, 1]) - 0.5).abs() < 1e-9);
        // mean 1, max deviation 2 → clamped
        assert!(load_balance_score(&[3, 0, 0]).abs() < f64::EPSILON);
        assert!((load_balance_score(&[]) - 1.0).abs() < f64::EPSILON);
        assert!((load_balance_score(&[0, 0]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordination_complexity() {
        assert!((coordination_complexity(3) - 0.3).abs() < 1e-9);
        assert!((coordination_complexity(25) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overhead_bounded() {
        for team_type in TeamType::ALL {
            for n in 0..50 {
                let overhead = team_type.coordination_overhead(n);
                assert!((0.0..=1.0).contains(&overhead));
            }
        }
        assert!(TeamType::Mesh.coordination_overhead(6) > TeamType::Parallel.coordination_overhead(6));
    }

    #[test]
    fn test_team_type_parse() {
        assert_eq!("Mesh".parse::<TeamType>().unwrap(), TeamType::Mesh);
        assert!("swarm".parse::<TeamType>().is_err());
    }
}
