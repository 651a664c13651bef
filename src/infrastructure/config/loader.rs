use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".convoy";

/// Prefix of environment overrides, e.g. `CONVOY_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "CONVOY_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid team size bounds: min ({min}) must be at least 1 and not exceed max ({max})")]
    InvalidTeamSize { min: usize, max: usize },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .convoy/config.yaml (project config)
    /// 3. .convoy/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CONVOY_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) with `.convoy/` resolved under `root`.
    pub fn load_from(root: &Path) -> Result<Config> {
        let dir = root.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }
        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Self::validate_coordinator(config)?;

        let intervals = [
            ("state_store.heartbeat_timeout_secs", config.state_store.heartbeat_timeout_secs),
            ("coordinator.per_item_duration_secs", config.coordinator.per_item_duration_secs),
            ("daemon.rebalance_interval_secs", config.daemon.rebalance_interval_secs),
            ("daemon.conflict_detection_interval_secs", config.daemon.conflict_detection_interval_secs),
            ("daemon.performance_interval_secs", config.daemon.performance_interval_secs),
            ("daemon.distribution_interval_secs", config.daemon.distribution_interval_secs),
            ("daemon.recovery_interval_secs", config.daemon.recovery_interval_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroInterval(name));
        }

        Ok(())
    }

    fn validate_coordinator(config: &Config) -> Result<(), ConfigError> {
        let c = &config.coordinator;
        if c.min_team_size == 0 || c.min_team_size > c.max_team_size {
            return Err(ConfigError::InvalidTeamSize {
                min: c.min_team_size,
                max: c.max_team_size,
            });
        }
        if c.emergency_min_team_size == 0 || c.emergency_min_team_size > c.emergency_max_team_size {
            return Err(ConfigError::InvalidTeamSize {
                min: c.emergency_min_team_size,
                max: c.emergency_max_team_size,
            });
        }

        let unit_fields = [
            ("coordinator.max_agent_load", c.max_agent_load),
            ("coordinator.emergency_max_load", c.emergency_max_load),
            ("coordinator.emergency_speedup", c.emergency_speedup),
            ("coordinator.mesh_collaboration_threshold", c.mesh_collaboration_threshold),
            ("coordinator.specialist_performance_threshold", c.specialist_performance_threshold),
            ("coordinator.team_underload_threshold", c.team_underload_threshold),
            ("coordinator.underperformance_threshold", c.underperformance_threshold),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }

        if c.emergency_max_load < c.max_agent_load {
            return Err(ConfigError::ValidationFailed(format!(
                "coordinator.emergency_max_load ({}) must not be below max_agent_load ({})",
                c.emergency_max_load, c.max_agent_load
            )));
        }
        Ok(())
    }
}
