//! Convoy CLI entry point.

use anyhow::Result;
use clap::Parser;

use convoy::cli::commands::{agent, hook, molecule, run, status, team};
use convoy::cli::{handle_error, AppContext, Cli, Commands};
use convoy::infrastructure::config::ConfigLoader;
use convoy::infrastructure::logging::{LogConfig, LoggerImpl};

async fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;
    let ctx = AppContext::open(config).await?;

    let result = match cli.command {
        Commands::Molecule(args) => molecule::execute(args, &ctx, cli.json).await,
        Commands::Hook(args) => hook::execute(args, &ctx, cli.json).await,
        Commands::Agent(args) => agent::execute(args, &ctx, cli.json).await,
        Commands::Team(args) => team::execute(args, &ctx, cli.json).await,
        Commands::Status => status::execute(&ctx, cli.json).await,
        Commands::Run => run::execute(&ctx, cli.json).await,
    };

    ctx.close().await;
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = dispatch(cli).await {
        handle_error(err, json_mode);
    }
}
