use super::print_response;
use helmfile_mcp_tools::{HelmfileTools, SyncRequest};

/// Sync one helmfile and print the response
pub async fn handle_command(tools: &HelmfileTools, request: SyncRequest) -> i32 {
    let response = tools.sync_releases(&request, None).await;
    print_response(&response)
}
