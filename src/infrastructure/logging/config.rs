use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Resolved logging settings handed to [`LoggerImpl::init`](super::LoggerImpl::init).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files. `None` logs to the terminal only.
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enable_terminal: bool,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_terminal: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            format: match config.format.as_str() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            enable_terminal: true,
            rotation: match config.rotation.as_str() {
                "hourly" => RotationPolicy::Hourly,
                "never" => RotationPolicy::Never,
                _ => RotationPolicy::Daily,
            },
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}
