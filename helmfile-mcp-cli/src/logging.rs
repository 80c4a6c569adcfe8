//! Tracing subscriber setup
//!
//! Logs never go to stdout: it carries the MCP stdio transport and the JSON
//! printed by `exec` and `sync`.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Level selected by the global flags
pub fn log_level(debug: bool, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

fn create_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("rmcp=warn,{level}")))
}

/// Install the global subscriber, writing to `log_file` or stderr
pub fn configure_logging(level: Level, log_file: Option<&Path>) {
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                registry()
                    .with(create_filter(level))
                    .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                    .init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log file {}: {}. Falling back to stderr.",
                    path.display(),
                    e
                );
            }
        }
    }

    registry()
        .with(create_filter(level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
