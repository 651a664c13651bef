use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Convoy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Molecule state store settings
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Hook work queue settings
    #[serde(default)]
    pub work_queue: WorkQueueConfig,

    /// Team formation and distribution settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Background loop intervals
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before SQLite reports BUSY
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> String {
    ".convoy/convoy.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Retry policy for transient storage contention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of attempts before surfacing `StorageUnavailable`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    50
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StateStoreConfig {
    /// Minimum seconds between non-forced checkpoints of one molecule
    #[serde(default = "default_checkpoint_min_interval_secs")]
    pub checkpoint_min_interval_secs: u64,

    /// Seconds without a heartbeat before an owner counts as stalled
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,

    /// Age in days after which non-rollback-point snapshots are pruned
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: u32,
}

const fn default_checkpoint_min_interval_secs() -> u64 {
    30
}

const fn default_heartbeat_timeout_secs() -> u64 {
    120
}

const fn default_history_retention_days() -> u32 {
    30
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            checkpoint_min_interval_secs: default_checkpoint_min_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            history_retention_days: default_history_retention_days(),
        }
    }
}

impl StateStoreConfig {
    pub fn checkpoint_min_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_min_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkQueueConfig {
    /// Age in days after which completed/failed items are pruned
    #[serde(default = "default_queue_retention_days")]
    pub retention_days: u32,

    /// Number of recent items reported by queue status
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

const fn default_queue_retention_days() -> u32 {
    7
}

const fn default_recent_activity_limit() -> usize {
    10
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            retention_days: default_queue_retention_days(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinatorConfig {
    #[serde(default = "default_min_team_size")]
    pub min_team_size: usize,

    #[serde(default = "default_max_team_size")]
    pub max_team_size: usize,

    /// Expected duration of one work item, in seconds
    #[serde(default = "default_per_item_duration_secs")]
    pub per_item_duration_secs: u64,

    /// Agents above this load are excluded from non-emergency teams
    #[serde(default = "default_max_agent_load")]
    pub max_agent_load: f64,

    /// Load cap for emergency teams
    #[serde(default = "default_emergency_max_load")]
    pub emergency_max_load: f64,

    #[serde(default = "default_emergency_max_team_size")]
    pub emergency_max_team_size: usize,

    #[serde(default = "default_emergency_min_team_size")]
    pub emergency_min_team_size: usize,

    /// Multiplier applied to emergency completion estimates
    #[serde(default = "default_emergency_speedup")]
    pub emergency_speedup: f64,

    /// Mesh teams prefer agents whose collaboration exceeds this
    #[serde(default = "default_rating_threshold")]
    pub mesh_collaboration_threshold: f64,

    /// Specialist teams require performance above this
    #[serde(default = "default_rating_threshold")]
    pub specialist_performance_threshold: f64,

    /// Teams whose mean member load is below this accept new work
    #[serde(default = "default_team_underload_threshold")]
    pub team_underload_threshold: f64,

    /// Agents below this performance are reported as underperforming
    #[serde(default = "default_underperformance_threshold")]
    pub underperformance_threshold: f64,
}

const fn default_min_team_size() -> usize {
    2
}

const fn default_max_team_size() -> usize {
    8
}

const fn default_per_item_duration_secs() -> u64 {
    1_800
}

const fn default_max_agent_load() -> f64 {
    0.9
}

const fn default_emergency_max_load() -> f64 {
    0.95
}

const fn default_emergency_max_team_size() -> usize {
    5
}

const fn default_emergency_min_team_size() -> usize {
    2
}

const fn default_emergency_speedup() -> f64 {
    0.7
}

const fn default_rating_threshold() -> f64 {
    0.7
}

const fn default_team_underload_threshold() -> f64 {
    0.8
}

const fn default_underperformance_threshold() -> f64 {
    0.4
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_team_size: default_min_team_size(),
            max_team_size: default_max_team_size(),
            per_item_duration_secs: default_per_item_duration_secs(),
            max_agent_load: default_max_agent_load(),
            emergency_max_load: default_emergency_max_load(),
            emergency_max_team_size: default_emergency_max_team_size(),
            emergency_min_team_size: default_emergency_min_team_size(),
            emergency_speedup: default_emergency_speedup(),
            mesh_collaboration_threshold: default_rating_threshold(),
            specialist_performance_threshold: default_rating_threshold(),
            team_underload_threshold: default_team_underload_threshold(),
            underperformance_threshold: default_underperformance_threshold(),
        }
    }
}

impl CoordinatorConfig {
    pub fn per_item_duration(&self) -> Duration {
        Duration::from_secs(self.per_item_duration_secs)
    }
}

/// Intervals of the coordinator's background loops, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DaemonConfig {
    #[serde(default = "default_rebalance_interval_secs")]
    pub rebalance_interval_secs: u64,

    #[serde(default = "default_conflict_detection_interval_secs")]
    pub conflict_detection_interval_secs: u64,

    #[serde(default = "default_performance_interval_secs")]
    pub performance_interval_secs: u64,

    #[serde(default = "default_distribution_interval_secs")]
    pub distribution_interval_secs: u64,

    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: u64,
}

const fn default_rebalance_interval_secs() -> u64 {
    60
}

const fn default_conflict_detection_interval_secs() -> u64 {
    30
}

const fn default_performance_interval_secs() -> u64 {
    300
}

const fn default_distribution_interval_secs() -> u64 {
    10
}

const fn default_recovery_interval_secs() -> u64 {
    30
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rebalance_interval_secs: default_rebalance_interval_secs(),
            conflict_detection_interval_secs: default_conflict_detection_interval_secs(),
            performance_interval_secs: default_performance_interval_secs(),
            distribution_interval_secs: default_distribution_interval_secs(),
            recovery_interval_secs: default_recovery_interval_secs(),
        }
    }
}

impl DaemonConfig {
    pub fn intervals(&self) -> [u64; 5] {
        [
            self.rebalance_interval_secs,
            self.conflict_detection_interval_secs,
            self.performance_interval_secs,
            self.distribution_interval_secs,
            self.recovery_interval_secs,
        ]
    }
}
