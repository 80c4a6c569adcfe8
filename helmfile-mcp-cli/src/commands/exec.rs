use super::print_response;
use helmfile_mcp_tools::{CommandSpec, HelmfileTools};
use std::path::PathBuf;

/// Run one command through the facade and print the response
pub async fn handle_command(
    tools: &HelmfileTools,
    command: String,
    timeout: Option<u64>,
    confirm: bool,
    working_directory: Option<PathBuf>,
) -> i32 {
    let spec = CommandSpec {
        raw_command: command,
        timeout_seconds: timeout,
        working_directory,
        namespace: None,
        confirmed: confirm,
    };

    let response = tools.execute_command(&spec, None).await;
    print_response(&response)
}
