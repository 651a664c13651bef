//! Hook (per-agent work queue) CLI commands.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{error_info, parse_json_arg};
use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, truncate, ActionOutput, CommandOutput};
use crate::domain::models::{QueueStatus, WorkItem, WorkPriority};
use crate::services::SlingRequest;

#[derive(Args, Debug)]
pub struct HookArgs {
    #[command(subcommand)]
    pub command: HookCommands,
}

fn parse_priority(s: &str) -> Result<WorkPriority> {
    WorkPriority::from_str(s).ok_or_else(|| anyhow!("invalid priority: {s} (urgent, high, normal, low)"))
}

#[derive(Subcommand, Debug)]
pub enum HookCommands {
    /// Put a work item on an agent's hook
    Sling {
        agent: String,
        work_type: String,
        work_ref: String,
        #[arg(short, long, default_value = "normal", value_parser = parse_priority)]
        priority: WorkPriority,
        #[arg(long, default_value = "cli")]
        requested_by: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// List pending items in execution order
    Peek {
        agent: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Claim a pending item
    Claim { agent: String, id: Uuid },
    /// Begin executing a claimed item
    Start {
        agent: String,
        id: Uuid,
        /// Execution context (JSON)
        #[arg(long)]
        context: Option<String>,
    },
    /// Complete an item
    Complete {
        agent: String,
        id: Uuid,
        /// Result (JSON)
        #[arg(long)]
        result: Option<String>,
    },
    /// Fail an item
    Fail {
        agent: String,
        id: Uuid,
        /// Error details (JSON object or plain message)
        #[arg(short, long)]
        error: String,
    },
    /// Show counts per state and recent activity
    Status {
        /// Agent to report on. Omit for every agent with a hook.
        agent: Option<String>,
    },
    /// Delete completed and failed items older than the retention window
    Prune {
        /// Override the configured retention in days
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
pub struct WorkItemOutput {
    pub id: Uuid,
    pub agent: String,
    pub work_type: String,
    pub work_ref: String,
    pub priority: String,
    pub state: String,
    pub retry_count: u32,
    pub requested_by: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<&WorkItem> for WorkItemOutput {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            agent: item.agent.clone(),
            work_type: item.work_type.clone(),
            work_ref: item.work_ref.clone(),
            priority: item.priority.as_str().to_string(),
            state: item.state.as_str().to_string(),
            retry_count: item.retry_count,
            requested_by: item.requested_by.clone(),
            submitted_at: item.submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkItemListOutput {
    pub items: Vec<WorkItemOutput>,
}

impl CommandOutput for WorkItemListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "priority", "type", "ref", "state", "submitted"]);
        for item in &self.items {
            table.add_row(vec![
                item.id.to_string(),
                item.priority.clone(),
                truncate(&item.work_type, 16),
                truncate(&item.work_ref, 24),
                item.state.clone(),
                item.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        render_list("work item", &table, self.items.len())
    }
}

#[derive(Debug, Serialize)]
pub struct QueueStatusOutput {
    pub agent: String,
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
    pub recent: Vec<WorkItemOutput>,
}

impl From<&QueueStatus> for QueueStatusOutput {
    fn from(status: &QueueStatus) -> Self {
        Self {
            agent: status.agent.clone(),
            counts: status
                .counts
                .iter()
                .map(|(state, n)| (state.as_str().to_string(), *n))
                .collect(),
            total: status.total(),
            recent: status.recent.iter().map(WorkItemOutput::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueStatusListOutput {
    pub queues: Vec<QueueStatusOutput>,
}

impl CommandOutput for QueueStatusListOutput {
    fn to_human(&self) -> String {
        if self.queues.is_empty() {
            return "No hooks found.".to_string();
        }
        let mut sections = Vec::new();
        for queue in &self.queues {
            let counts: Vec<String> = queue.counts.iter().map(|(s, n)| format!("{s}={n}")).collect();
            let mut lines = vec![format!("{} ({} items): {}", queue.agent, queue.total, counts.join(" "))];
            for item in &queue.recent {
                lines.push(format!(
                    "  {} {:<10} {} {}",
                    item.id,
                    item.state,
                    item.work_type,
                    truncate(&item.work_ref, 32)
                ));
            }
            sections.push(lines.join("\n"));
        }
        sections.join("\n\n")
    }
}

pub async fn execute(args: HookArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let queue = ctx.work_queue();

    match args.command {
        HookCommands::Sling {
            agent,
            work_type,
            work_ref,
            priority,
            requested_by,
            reason,
        } => {
            let mut request = SlingRequest::new(&agent, work_type, work_ref)
                .with_priority(priority)
                .requested_by(requested_by);
            if let Some(reason) = reason {
                request = request.with_reason(reason);
            }
            let id = queue.sling(request).await?;
            output(&ActionOutput::ok(format!("Slung {id} onto {agent}'s hook"), id), json_mode);
        }

        HookCommands::Peek { agent, limit } => {
            let items = queue.peek(&agent, limit).await?;
            output(
                &WorkItemListOutput {
                    items: items.iter().map(WorkItemOutput::from).collect(),
                },
                json_mode,
            );
        }

        HookCommands::Claim { agent, id } => {
            let out: ActionOutput<Uuid> = if queue.claim(&agent, id).await? {
                ActionOutput::ok(format!("Claimed {id}"), id)
            } else {
                ActionOutput::declined(format!("{id} is no longer pending"))
            };
            output(&out, json_mode);
        }

        HookCommands::Start { agent, id, context } => {
            let context = context.map(|c| parse_json_arg("context", &c)).transpose()?;
            let out: ActionOutput<Uuid> = if queue.begin_execution(&agent, id, context).await? {
                ActionOutput::ok(format!("Started {id}"), id)
            } else {
                ActionOutput::declined(format!("{id} is not claimed"))
            };
            output(&out, json_mode);
        }

        HookCommands::Complete { agent, id, result } => {
            let result = result.map(|r| parse_json_arg("result", &r)).transpose()?;
            queue.complete(&agent, id, result).await?;
            output(&ActionOutput::ok(format!("Completed {id}"), id), json_mode);
        }

        HookCommands::Fail { agent, id, error } => {
            queue.fail(&agent, id, error_info(&error)).await?;
            output(&ActionOutput::ok(format!("Failed {id}"), id), json_mode);
        }

        HookCommands::Status { agent } => {
            let agents = match agent {
                Some(agent) => vec![agent],
                None => queue.list_agents().await?,
            };
            let mut queues = Vec::with_capacity(agents.len());
            for agent in &agents {
                queues.push(QueueStatusOutput::from(&queue.status(agent).await?));
            }
            output(&QueueStatusListOutput { queues }, json_mode);
        }

        HookCommands::Prune { days } => {
            let days = days.unwrap_or(queue.config().retention_days);
            let removed = queue.prune(days).await?;
            output(
                &ActionOutput::ok(format!("Pruned {removed} finished item(s) older than {days} day(s)"), removed),
                json_mode,
            );
        }
    }

    Ok(())
}
