//! `convoy run`: host the coordinator daemon until Ctrl-C.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::services::{CoordinatorDaemon, TaskStats};

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub uptime_secs: u64,
    pub events_published: u64,
    pub loops: Vec<LoopSummary>,
}

#[derive(Debug, Serialize)]
pub struct LoopSummary {
    pub task: &'static str,
    pub ticks: u64,
    pub failures: u64,
}

impl From<&TaskStats> for LoopSummary {
    fn from(stats: &TaskStats) -> Self {
        Self {
            task: stats.task.as_str(),
            ticks: stats.ticks,
            failures: stats.failures,
        }
    }
}

impl CommandOutput for RunSummary {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Stopped after {}s, {} event(s) published",
            self.uptime_secs, self.events_published
        )];
        for l in &self.loops {
            lines.push(format!("  {:<24} ticks {:<6} failures {}", l.task, l.ticks, l.failures));
        }
        lines.join("\n")
    }
}

pub async fn execute(ctx: &AppContext, json_mode: bool) -> Result<()> {
    let coordinator = Arc::new(ctx.coordinator().await?);
    let events = ctx.events();
    let mut rx = events.subscribe();

    let audit = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => match serde_json::to_string(&envelope) {
                    Ok(line) => info!(target: "convoy::events", event = %line, "core event"),
                    Err(e) => warn!(error = %e, "failed to serialize event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let handle = CoordinatorDaemon::new(
        Arc::clone(&coordinator),
        ctx.config.daemon.clone(),
        ctx.config.state_store.heartbeat_timeout(),
    )
    .spawn();
    info!(loops = handle.task_count(), "convoy running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("shutdown requested");

    let uptime = handle.uptime();
    let stats = handle.shutdown().await;
    audit.abort();

    output(
        &RunSummary {
            uptime_secs: uptime.as_secs(),
            events_published: events.published_count(),
            loops: stats.iter().map(LoopSummary::from).collect(),
        },
        json_mode,
    );
    Ok(())
}
