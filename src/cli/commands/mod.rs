//! CLI command implementations.

use anyhow::{Context, Result};
use serde_json::{json, Value};

pub mod agent;
pub mod hook;
pub mod molecule;
pub mod run;
pub mod status;
pub mod team;

/// Parse a JSON argument, naming the flag in the error.
pub(crate) fn parse_json_arg(flag: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("--{flag} must be valid JSON"))
}

/// Failure details: JSON objects pass through, anything else becomes `{"message": ...}`.
pub(crate) fn error_info(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "message": raw }),
    }
}
