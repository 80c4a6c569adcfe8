//! Subcommand handlers
//!
//! Each handler returns the process exit code.

pub mod config;
pub mod exec;
pub mod serve;
pub mod sync;

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use helmfile_mcp_tools::Response;

/// Print a response as JSON on stdout and map its status to an exit code
pub(crate) fn print_response(response: &Response) -> i32 {
    match serde_json::to_string_pretty(&response.to_json()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to render response: {e}");
            return EXIT_ERROR;
        }
    }

    if response.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_ERROR
    }
}
