//! Team formation and distribution CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{format_ratio, list_table, output, render_list, ActionOutput, CommandOutput};
use crate::domain::models::{Team, TeamType, WorkDistributionPlan};
use crate::services::FormationRequest;

#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommands,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Form a team for a workload
    Form {
        #[arg(short = 't', long = "type", default_value = "parallel")]
        team_type: TeamType,
        /// Work items (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        items: Vec<String>,
        /// Required capabilities (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        requires: Vec<String>,
        /// Agents to place first if they qualify (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        prefer: Vec<String>,
    },
    /// List teams
    List {
        /// Include disbanded teams
        #[arg(short, long)]
        all: bool,
    },
    /// Spread work items across active, under-loaded teams
    Distribute {
        #[arg(value_delimiter = ',', required = true)]
        items: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct TeamOutput {
    pub id: Uuid,
    pub team_type: TeamType,
    pub leader: Option<String>,
    pub members: Vec<String>,
    pub items: usize,
    pub overhead: f64,
    pub estimated_completion: DateTime<Utc>,
    pub active: bool,
}

impl From<&Team> for TeamOutput {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            team_type: team.team_type,
            leader: team.leader.clone(),
            members: team.members.clone(),
            items: team.assigned_items.len(),
            overhead: team.coordination_overhead,
            estimated_completion: team.estimated_completion,
            active: team.is_active(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamListOutput {
    pub teams: Vec<TeamOutput>,
}

impl CommandOutput for TeamListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "type", "leader", "members", "items", "overhead", "eta"]);
        for team in &self.teams {
            table.add_row(vec![
                team.id.to_string(),
                team.team_type.to_string(),
                team.leader.clone().unwrap_or_else(|| "-".into()),
                team.members.join(","),
                team.items.to_string(),
                format_ratio(team.overhead),
                team.estimated_completion.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        render_list("team", &table, self.teams.len())
    }
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    #[serde(flatten)]
    pub plan: WorkDistributionPlan,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        let plan = &self.plan;
        let mut lines = vec![
            format!("Batch {}", plan.batch_id),
            format!(
                "  load balance {}  conflict risk {}  complexity {}",
                format_ratio(plan.load_balance_score),
                format_ratio(plan.conflict_risk_score),
                format_ratio(plan.coordination_complexity)
            ),
            format!("  estimated completion {}", plan.estimated_completion.format("%Y-%m-%d %H:%M")),
        ];
        for (team, items) in &plan.assignments {
            lines.push(format!("  {team}: {}", items.join(", ")));
        }
        if !plan.unassigned.is_empty() {
            lines.push(format!("  unassigned: {}", plan.unassigned.join(", ")));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: TeamArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let coordinator = ctx.coordinator().await?;

    match args.command {
        TeamCommands::Form {
            team_type,
            items,
            requires,
            prefer,
        } => {
            let request = FormationRequest {
                workload: items,
                required_capabilities: requires.into_iter().collect(),
                preferred_agents: prefer,
            };
            match coordinator.form_team(team_type, request).await? {
                Some(team) => output(
                    &ActionOutput::ok(
                        format!("Formed {team_type} team {} with {}", team.id, team.members.join(", ")),
                        TeamOutput::from(&team),
                    ),
                    json_mode,
                ),
                None => output(
                    &ActionOutput::<TeamOutput>::declined(format!(
                        "Not enough qualifying agents for a {team_type} team"
                    )),
                    json_mode,
                ),
            }
        }

        TeamCommands::List { all } => {
            let teams = coordinator.teams().await;
            output(
                &TeamListOutput {
                    teams: teams.iter().filter(|t| all || t.is_active()).map(TeamOutput::from).collect(),
                },
                json_mode,
            );
        }

        TeamCommands::Distribute { items } => {
            let plan = coordinator.distribute_work(items).await?;
            output(&PlanOutput { plan }, json_mode);
        }
    }

    Ok(())
}
