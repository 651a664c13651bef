//! Command-line interface: a thin issuer/inspector over the three services.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use console::style;
use serde_json::json;

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = json!({
            "success": false,
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}
