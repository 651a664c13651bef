//! Agent registry CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use console::style;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::cli::context::AppContext;
use crate::cli::output::{format_ratio, list_table, output, render_list, ActionOutput, CommandOutput};
use crate::domain::models::{AgentMetricsUpdate, AgentProfile, HealthLevel, TeamType};

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

/// Parse `skill=score`.
fn parse_score(s: &str) -> Result<(String, f64)> {
    let (skill, score) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected skill=score, got {s}"))?;
    let score: f64 = score.trim().parse().map_err(|_| anyhow!("invalid score in {s}"))?;
    Ok((skill.trim().to_string(), score))
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// Register an agent, or update its declared profile
    Register {
        name: String,
        /// Capabilities (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        capabilities: Vec<String>,
        /// Specialization score, repeatable (format: "skill=0.8")
        #[arg(short, long = "score", value_parser = parse_score)]
        scores: Vec<(String, f64)>,
        /// Preferred team types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        prefers: Vec<TeamType>,
    },
    /// Remove an agent from the registry
    Unregister { name: String },
    /// List registered agents
    List,
    /// Report an agent's health, and optionally its load
    Health {
        name: String,
        level: HealthLevel,
        #[arg(long)]
        load: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub struct AgentOutput {
    pub name: String,
    pub capabilities: Vec<String>,
    pub health: HealthLevel,
    pub performance: f64,
    pub collaboration: f64,
    pub load: f64,
}

impl From<&AgentProfile> for AgentOutput {
    fn from(agent: &AgentProfile) -> Self {
        Self {
            name: agent.name.clone(),
            capabilities: agent.capabilities.iter().cloned().collect(),
            health: agent.health,
            performance: agent.performance_rating,
            collaboration: agent.collaboration_rating,
            load: agent.current_load,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentOutput>,
}

fn styled_health(health: HealthLevel) -> String {
    match health {
        HealthLevel::Healthy => style(health).green().to_string(),
        HealthLevel::Degraded => style(health).yellow().to_string(),
        HealthLevel::Critical | HealthLevel::Offline => style(health).red().to_string(),
    }
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "health", "perf", "collab", "load", "capabilities"]);
        for agent in &self.agents {
            table.add_row(vec![
                agent.name.clone(),
                styled_health(agent.health),
                format_ratio(agent.performance),
                format_ratio(agent.collaboration),
                format_ratio(agent.load),
                agent.capabilities.join(","),
            ]);
        }
        render_list("agent", &table, self.agents.len())
    }
}

pub async fn execute(args: AgentArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let coordinator = ctx.coordinator().await?;

    match args.command {
        AgentCommands::Register {
            name,
            capabilities,
            scores,
            prefers,
        } => {
            let capabilities: BTreeSet<String> = capabilities.into_iter().filter(|c| !c.is_empty()).collect();
            let scores: BTreeMap<String, f64> = scores.into_iter().collect();
            let profile = coordinator.register_agent(&name, capabilities, scores, prefers).await?;
            output(
                &ActionOutput::ok(format!("Agent registered: {name}"), AgentOutput::from(&profile)),
                json_mode,
            );
        }

        AgentCommands::Unregister { name } => {
            let profile = coordinator.unregister_agent(&name).await?;
            output(
                &ActionOutput::ok(format!("Agent unregistered: {name}"), AgentOutput::from(&profile)),
                json_mode,
            );
        }

        AgentCommands::List => {
            let agents = coordinator.agents().await;
            output(
                &AgentListOutput {
                    agents: agents.iter().map(AgentOutput::from).collect(),
                },
                json_mode,
            );
        }

        AgentCommands::Health { name, level, load } => {
            if load.is_some() {
                coordinator
                    .update_agent_metrics(
                        &name,
                        AgentMetricsUpdate {
                            current_load: load,
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            let profile = coordinator.report_health(&name, level).await?;
            output(
                &ActionOutput::ok(format!("{name} is now {level}"), AgentOutput::from(&profile)),
                json_mode,
            );
        }
    }

    Ok(())
}
