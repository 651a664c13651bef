//! CLI type definitions
//!
//! Top-level clap structures. Each subcommand group lives with its
//! implementation under `commands/`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::agent::AgentArgs;
use super::commands::hook::HookArgs;
use super::commands::molecule::MoleculeArgs;
use super::commands::team::TeamArgs;

#[derive(Parser, Debug)]
#[command(name = "convoy")]
#[command(about = "Convoy - worker-pool coordination core", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of .convoy/
    #[arg(short, long, global = true, env = "CONVOY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Checkpointed molecules: create, checkpoint, roll back, recover
    Molecule(MoleculeArgs),

    /// Per-agent hook queues: sling, peek, claim, execute
    Hook(HookArgs),

    /// Agent registry
    Agent(AgentArgs),

    /// Team formation and work distribution
    Team(TeamArgs),

    /// Coordinator and hook overview
    Status,

    /// Run the coordinator's background loops until Ctrl-C
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::hook::HookCommands;
    use crate::cli::commands::molecule::MoleculeCommands;
    use crate::domain::models::WorkPriority;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sling_with_global_json() {
        let cli = Cli::try_parse_from(["convoy", "hook", "sling", "A", "build", "123", "-p", "urgent", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Hook(HookArgs {
                command: HookCommands::Sling { agent, priority, .. },
            }) => {
                assert_eq!(agent, "A");
                assert_eq!(priority, WorkPriority::Urgent);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_checkpoint_flags() {
        let cli = Cli::try_parse_from([
            "convoy", "molecule", "checkpoint", "m1", "--payload", "{}", "--state", "suspended", "--force", "--rollback-point",
        ])
        .unwrap();
        match cli.command {
            Commands::Molecule(MoleculeArgs {
                command: MoleculeCommands::Checkpoint { force, rollback_point, .. },
            }) => assert!(force && rollback_point),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["convoy", "hook", "sling", "A", "build", "1", "-p", "whenever"]).is_err());
    }
}
