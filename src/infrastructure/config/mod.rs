//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading (`.convoy/config.yaml`, `.convoy/local.yaml`)
//! - `CONVOY_*` environment variable overrides
//! - Validation of every section before the config is handed out

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
