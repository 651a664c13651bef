//! `convoy status`: coordinator and hook overview.

use anyhow::Result;
use console::style;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{format_ratio, output, CommandOutput};
use crate::domain::models::WorkItemState;
use crate::services::CoordinatorStatus;

#[derive(Debug, Serialize)]
pub struct HookSummary {
    pub agent: String,
    pub pending: u64,
    pub in_flight: u64,
    pub failed: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub coordinator: CoordinatorStatus,
    pub hooks: Vec<HookSummary>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let c = &self.coordinator;
        let health: Vec<String> = c.health.iter().map(|(h, n)| format!("{h}={n}")).collect();
        let team_types: Vec<String> = c.team_types.iter().map(|(t, n)| format!("{t}={n}")).collect();

        let mut lines = vec![
            style("Coordinator").bold().to_string(),
            format!("  agents        {} ({} available) {}", c.total_agents, c.available_agents, health.join(" ")),
            format!("  teams         {} active {}", c.active_teams, team_types.join(" ")),
            format!("  utilization   {}", format_ratio(c.average_utilization)),
            format!("  conflicts     {} open", c.active_conflicts),
            format!("  plans         {}", c.plans_recorded),
        ];
        if let Some(perf) = &c.last_performance {
            lines.push(format!(
                "  performance   mean {} ({} under, {} overloaded)",
                format_ratio(perf.mean_performance),
                perf.underperformers.len(),
                perf.overloaded.len()
            ));
        }

        lines.push(String::new());
        lines.push(style("Hooks").bold().to_string());
        if self.hooks.is_empty() {
            lines.push("  none".to_string());
        }
        for hook in &self.hooks {
            lines.push(format!(
                "  {:<20} pending {:<4} in-flight {:<4} failed {}",
                hook.agent, hook.pending, hook.in_flight, hook.failed
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let coordinator = ctx.coordinator().await?;
    let queue = ctx.work_queue();

    let mut hooks = Vec::new();
    for agent in queue.list_agents().await? {
        let status = queue.status(&agent).await?;
        hooks.push(HookSummary {
            pending: status.count(WorkItemState::Pending),
            in_flight: status.count(WorkItemState::Claimed) + status.count(WorkItemState::Executing),
            failed: status.count(WorkItemState::Failed),
            agent,
        });
    }

    output(
        &StatusOutput {
            coordinator: coordinator.status().await,
            hooks,
        },
        json_mode,
    );
    Ok(())
}
