//! Coordinator background daemon.
//!
//! Runs the coordinator's maintenance loops as independent tokio tasks:
//! - Team rebalancing
//! - Conflict detection
//! - Performance assessment
//! - Workload distribution
//! - Crash recovery sweep
//!
//! Each loop ticks on its own interval. All of them listen on one broadcast
//! shutdown channel. A failing tick is logged and the loop keeps going.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::DaemonConfig;
use crate::domain::ports::CoordinationRepository;
use crate::services::coordinator::Coordinator;

/// One of the daemon's loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonTask {
    Rebalance,
    ConflictDetection,
    PerformanceAssessment,
    WorkDistribution,
    CrashRecovery,
}

impl DaemonTask {
    pub const ALL: [Self; 5] = [
        Self::Rebalance,
        Self::ConflictDetection,
        Self::PerformanceAssessment,
        Self::WorkDistribution,
        Self::CrashRecovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rebalance => "rebalance",
            Self::ConflictDetection => "conflict_detection",
            Self::PerformanceAssessment => "performance_assessment",
            Self::WorkDistribution => "work_distribution",
            Self::CrashRecovery => "crash_recovery",
        }
    }

    fn period(&self, config: &DaemonConfig) -> Duration {
        let secs = match self {
            Self::Rebalance => config.rebalance_interval_secs,
            Self::ConflictDetection => config.conflict_detection_interval_secs,
            Self::PerformanceAssessment => config.performance_interval_secs,
            Self::WorkDistribution => config.distribution_interval_secs,
            Self::CrashRecovery => config.recovery_interval_secs,
        };
        Duration::from_secs(secs.max(1))
    }
}

/// Counters a loop returns when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub task: DaemonTask,
    pub ticks: u64,
    pub failures: u64,
}

/// Handle to a running daemon.
pub struct DaemonHandle {
    shutdown: broadcast::Sender<()>,
    tasks: Vec<(DaemonTask, JoinHandle<TaskStats>)>,
    started_at: Instant,
}

impl DaemonHandle {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Signal every loop to stop and wait for them to finish.
    pub async fn shutdown(self) -> Vec<TaskStats> {
        // Receivers also stop when the sender is dropped, so a send error is fine.
        let _ = self.shutdown.send(());

        let (names, handles): (Vec<DaemonTask>, Vec<_>) = self.tasks.into_iter().unzip();
        let mut stats = Vec::with_capacity(handles.len());
        for (task, joined) in names.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(task_stats) => stats.push(task_stats),
                Err(e) => error!(task = task.as_str(), error = %e, "daemon task panicked"),
            }
        }
        info!(tasks = stats.len(), "coordinator daemon stopped");
        stats
    }
}

/// Spawns the coordinator's background loops.
pub struct CoordinatorDaemon<R>
where
    R: CoordinationRepository + 'static,
{
    coordinator: Arc<Coordinator<R>>,
    config: DaemonConfig,
    stall_timeout: Duration,
}

impl<R> CoordinatorDaemon<R>
where
    R: CoordinationRepository + 'static,
{
    /// `stall_timeout` is how long an owner may go without a heartbeat
    /// before the recovery sweep treats it as crashed.
    pub fn new(coordinator: Arc<Coordinator<R>>, config: DaemonConfig, stall_timeout: Duration) -> Self {
        Self {
            coordinator,
            config,
            stall_timeout,
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Start every loop. The first tick of each runs immediately.
    pub fn spawn(self) -> DaemonHandle {
        let (shutdown, _) = broadcast::channel(1);

        let tasks = DaemonTask::ALL
            .into_iter()
            .map(|task| {
                let coordinator = Arc::clone(&self.coordinator);
                let period = task.period(&self.config);
                let stall_timeout = self.stall_timeout;
                let rx = shutdown.subscribe();
                let handle = tokio::spawn(run_loop(coordinator, task, period, stall_timeout, rx));
                (task, handle)
            })
            .collect();

        info!(stall_timeout_secs = self.stall_timeout.as_secs(), "coordinator daemon started");
        DaemonHandle {
            shutdown,
            tasks,
            started_at: Instant::now(),
        }
    }
}

async fn run_loop<R>(
    coordinator: Arc<Coordinator<R>>,
    task: DaemonTask,
    period: Duration,
    stall_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> TaskStats
where
    R: CoordinationRepository + 'static,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = TaskStats {
        task,
        ticks: 0,
        failures: 0,
    };
    debug!(task = task.as_str(), period_secs = period.as_secs(), "daemon loop started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                stats.ticks += 1;
                if let Err(e) = tick(&coordinator, task, stall_timeout).await {
                    stats.failures += 1;
                    error!(task = task.as_str(), error = %e, "daemon tick failed");
                }
            }
        }
    }

    debug!(task = task.as_str(), ticks = stats.ticks, failures = stats.failures, "daemon loop stopped");
    stats
}

async fn tick<R>(coordinator: &Coordinator<R>, task: DaemonTask, stall_timeout: Duration) -> DomainResult<()>
where
    R: CoordinationRepository + 'static,
{
    match task {
        DaemonTask::Rebalance => {
            coordinator.rebalance_teams().await?;
        }
        DaemonTask::ConflictDetection => {
            let found = coordinator.detect_conflicts().await?;
            if !found.is_empty() {
                warn!(count = found.len(), "conflicts detected");
            }
        }
        DaemonTask::PerformanceAssessment => {
            coordinator.assess_performance().await;
        }
        DaemonTask::WorkDistribution => {
            if let Some(plan) = coordinator.distribute_pending().await? {
                debug!(batch_id = %plan.batch_id, unassigned = plan.unassigned.len(), "pending work distributed");
            }
        }
        DaemonTask::CrashRecovery => {
            for report in coordinator.recover_stalled_agents(stall_timeout).await? {
                for (molecule, reason) in &report.errors {
                    warn!(owner = %report.owner, molecule = %molecule, reason = %reason, "molecule not recovered");
                }
            }
        }
    }
    Ok(())
}
