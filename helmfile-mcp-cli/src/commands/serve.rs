use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use helmfile_mcp_config::HelmfileMcpConfig;
use helmfile_mcp_tools::McpServer;
use std::sync::Arc;

/// Serve the helmfile tools over stdio until the client disconnects
pub async fn handle_command(config: Arc<HelmfileMcpConfig>) -> i32 {
    use rmcp::serve_server;
    use rmcp::transport::io::stdio;

    warn_if_helmfile_missing(&config.helmfile_binary);

    let server = match McpServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to create MCP server: {}", e);
            eprintln!("Failed to create MCP server: {}", e);
            return EXIT_ERROR;
        }
    };

    tracing::debug!("Starting MCP server in stdio mode");
    let running_service = match serve_server(server, stdio()).await {
        Ok(service) => {
            tracing::info!("MCP server started");
            service
        }
        Err(e) => {
            tracing::error!("MCP server error: {}", e);
            eprintln!("MCP server error: {}", e);
            return EXIT_ERROR;
        }
    };

    match running_service.waiting().await {
        Ok(quit_reason) => {
            tracing::info!("MCP server stopped: {:?}", quit_reason);
            EXIT_SUCCESS
        }
        Err(e) => {
            tracing::error!("MCP server task error: {}", e);
            EXIT_ERROR
        }
    }
}

/// A missing binary only fails the calls that need it
fn warn_if_helmfile_missing(binary: &str) {
    match which::which(binary) {
        Ok(path) => tracing::debug!("Using helmfile at {}", path.display()),
        Err(e) => tracing::warn!(
            "helmfile binary '{}' not found on PATH ({}); commands will fail with EXECUTION_ERROR",
            binary,
            e
        ),
    }
}
