//! Molecule CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use super::{error_info, parse_json_arg};
use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, truncate, ActionOutput, CommandOutput};
use crate::domain::models::{MoleculeState, RecoveryReport, Snapshot};

#[derive(Args, Debug)]
pub struct MoleculeArgs {
    #[command(subcommand)]
    pub command: MoleculeCommands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CheckpointState {
    Running,
    Suspended,
}

impl From<CheckpointState> for MoleculeState {
    fn from(state: CheckpointState) -> Self {
        match state {
            CheckpointState::Running => Self::Running,
            CheckpointState::Suspended => Self::Suspended,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MoleculeCommands {
    /// Create a molecule with an initial rollback point
    Create {
        /// Molecule ID
        id: String,
        /// Owning agent
        #[arg(short, long)]
        owner: String,
        /// Initial payload (JSON)
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Execution context (JSON)
        #[arg(long, default_value = "{}")]
        context: String,
        /// Molecules this one depends on (comma-separated)
        #[arg(short = 'D', long, value_delimiter = ',')]
        depends_on: Vec<String>,
    },
    /// Record a checkpoint
    Checkpoint {
        id: String,
        /// Payload to record (JSON)
        #[arg(long)]
        payload: String,
        #[arg(long, value_enum, default_value_t = CheckpointState::Running)]
        state: CheckpointState,
        /// Skip the minimum-interval throttle
        #[arg(long)]
        force: bool,
        /// Mark this checkpoint as a rollback point
        #[arg(long)]
        rollback_point: bool,
    },
    /// Mark a molecule completed
    Complete {
        id: String,
        /// Final payload (JSON)
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Mark a molecule failed
    Fail {
        id: String,
        /// Error details (JSON object or plain message)
        #[arg(short, long)]
        error: String,
    },
    /// Show a molecule's checkpoint history, newest first
    History {
        id: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Restore the latest rollback point
    Rollback { id: String },
    /// Recover molecules of a crashed owner, or of every stalled owner
    Recover {
        /// Owner to recover. Omit to sweep owners whose heartbeat lapsed.
        owner: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct SnapshotOutput {
    pub molecule_id: String,
    pub sequence: u64,
    pub state: String,
    pub rollback_point: bool,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&Snapshot> for SnapshotOutput {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            molecule_id: snapshot.molecule_id.clone(),
            sequence: snapshot.sequence,
            state: snapshot.state.as_str().to_string(),
            rollback_point: snapshot.rollback_point,
            payload: snapshot.payload.clone(),
            created_at: snapshot.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub molecule_id: String,
    pub snapshots: Vec<SnapshotOutput>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["seq", "state", "rollback", "recorded", "payload"]);
        for s in &self.snapshots {
            table.add_row(vec![
                s.sequence.to_string(),
                s.state.clone(),
                if s.rollback_point { "yes".into() } else { String::new() },
                s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                truncate(&s.payload.to_string(), 48),
            ]);
        }
        render_list("snapshot", &table, self.snapshots.len())
    }
}

#[derive(Debug, Serialize)]
pub struct RecoveryOutput {
    pub reports: Vec<RecoveryReport>,
}

impl CommandOutput for RecoveryOutput {
    fn to_human(&self) -> String {
        if self.reports.is_empty() {
            return "No stalled owners.".to_string();
        }
        let mut lines = Vec::new();
        for report in &self.reports {
            lines.push(format!(
                "{}: {} rolled back, {} failed",
                report.owner,
                report.rolled_back.len(),
                report.failed.len()
            ));
            for (molecule, reason) in &report.errors {
                lines.push(format!("  ! {molecule}: {reason}"));
            }
        }
        lines.join("\n")
    }
}

pub async fn execute(args: MoleculeArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let store = ctx.state_store();

    match args.command {
        MoleculeCommands::Create {
            id,
            owner,
            payload,
            context,
            depends_on,
        } => {
            let payload = parse_json_arg("payload", &payload)?;
            let context = parse_json_arg("context", &context)?;
            let snapshot = store.create_molecule(&id, &owner, payload, context, depends_on).await?;
            output(
                &ActionOutput::ok(format!("Molecule created: {id}"), SnapshotOutput::from(&snapshot)),
                json_mode,
            );
        }

        MoleculeCommands::Checkpoint {
            id,
            payload,
            state,
            force,
            rollback_point,
        } => {
            let payload = parse_json_arg("payload", &payload)?;
            let recorded = store
                .checkpoint(&id, payload, state.into(), force, rollback_point)
                .await?;
            let out: ActionOutput<()> = if recorded {
                ActionOutput {
                    success: true,
                    message: format!("Checkpoint recorded for {id}"),
                    data: None,
                }
            } else {
                ActionOutput::declined(format!("Checkpoint for {id} throttled; use --force to record anyway"))
            };
            output(&out, json_mode);
        }

        MoleculeCommands::Complete { id, payload } => {
            let payload = parse_json_arg("payload", &payload)?;
            let snapshot = store.complete(&id, payload).await?;
            output(
                &ActionOutput::ok(format!("Molecule completed: {id}"), SnapshotOutput::from(&snapshot)),
                json_mode,
            );
        }

        MoleculeCommands::Fail { id, error } => {
            let snapshot = store.fail(&id, error_info(&error)).await?;
            output(
                &ActionOutput::ok(format!("Molecule failed: {id}"), SnapshotOutput::from(&snapshot)),
                json_mode,
            );
        }

        MoleculeCommands::History { id, limit } => {
            let snapshots = store.history(&id, limit).await?;
            output(
                &HistoryOutput {
                    molecule_id: id,
                    snapshots: snapshots.iter().map(SnapshotOutput::from).collect(),
                },
                json_mode,
            );
        }

        MoleculeCommands::Rollback { id } => {
            let snapshot = store.rollback(&id).await?;
            output(
                &ActionOutput::ok(
                    format!("Molecule {id} rolled back (sequence {})", snapshot.sequence),
                    SnapshotOutput::from(&snapshot),
                ),
                json_mode,
            );
        }

        MoleculeCommands::Recover { owner } => {
            let reports = match owner {
                Some(owner) => vec![store.recover_owner(&owner).await?],
                None => {
                    let timeout = store.config().heartbeat_timeout();
                    let mut reports = Vec::new();
                    for stalled in store.detect_stalled_owners(timeout).await? {
                        reports.push(store.recover_owner(&stalled.owner).await?);
                    }
                    reports
                }
            };
            output(&RecoveryOutput { reports }, json_mode);
        }
    }

    Ok(())
}
