//! `execute_helmfile` tool

use crate::mcp::helmfile_tools::CommandSpec;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use async_trait::async_trait;
use helmfile_mcp_config::{DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

/// Arguments of `execute_helmfile`
#[derive(Debug, Deserialize)]
pub struct ExecuteHelmfileRequest {
    /// Command line, with or without the leading `helmfile`
    pub command: String,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Confirms a destructive verb
    #[serde(default)]
    pub confirm: bool,
    /// Directory to run in
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

impl From<ExecuteHelmfileRequest> for CommandSpec {
    fn from(request: ExecuteHelmfileRequest) -> Self {
        CommandSpec {
            raw_command: request.command,
            timeout_seconds: request.timeout,
            working_directory: request.working_directory,
            namespace: None,
            confirmed: request.confirm,
        }
    }
}

/// Runs an arbitrary helmfile command line
#[derive(Default)]
pub struct ExecuteHelmfileTool;

impl ExecuteHelmfileTool {
    /// Create the tool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for ExecuteHelmfileTool {
    fn name(&self) -> &'static str {
        "execute_helmfile"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Helmfile command to run, e.g. 'list' or 'diff -e staging | grep web'",
                    "minLength": 1
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds for the whole pipe chain",
                    "minimum": 1,
                    "maximum": MAX_TIMEOUT_SECONDS,
                    "default": DEFAULT_TIMEOUT_SECONDS
                },
                "confirm": {
                    "type": "boolean",
                    "description": "Set to true to run destructive operations such as apply or destroy",
                    "default": false
                },
                "working_directory": {
                    "type": "string",
                    "description": "Working directory for the command (optional, defaults to the server's directory)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: ExecuteHelmfileRequest = match BaseToolImpl::parse_arguments(arguments) {
            Ok(request) => request,
            Err(response) => return Ok(response.into_call_tool_result()),
        };
        debug!(command = %request.command, confirm = request.confirm, "execute_helmfile called");

        let spec = CommandSpec::from(request);
        let response = context
            .tools
            .execute_command(&spec, context.progress_sink())
            .await;
        Ok(response.into_call_tool_result())
    }
}
