//! `sync_helmfile` tool

use crate::mcp::helmfile_tools::SyncRequest;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use async_trait::async_trait;
use helmfile_mcp_config::{DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS};
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde::Deserialize;
use tracing::debug;

/// Arguments of `sync_helmfile`
#[derive(Debug, Deserialize)]
pub struct SyncHelmfileRequest {
    /// Helmfile to sync
    pub helmfile_path: String,
    /// Optional namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Optional environment
    #[serde(default)]
    pub environment: Option<String>,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl From<SyncHelmfileRequest> for SyncRequest {
    fn from(request: SyncHelmfileRequest) -> Self {
        SyncRequest {
            helmfile_path: request.helmfile_path,
            namespace: request.namespace,
            environment: request.environment,
            timeout_seconds: request.timeout,
        }
    }
}

/// Syncs the releases of one helmfile
#[derive(Default)]
pub struct SyncHelmfileTool;

impl SyncHelmfileTool {
    /// Create the tool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for SyncHelmfileTool {
    fn name(&self) -> &'static str {
        "sync_helmfile"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "helmfile_path": {
                    "type": "string",
                    "description": "Path to the helmfile to sync",
                    "minLength": 1
                },
                "namespace": {
                    "type": "string",
                    "description": "Namespace to limit the sync to"
                },
                "environment": {
                    "type": "string",
                    "description": "Helmfile environment to sync"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds",
                    "minimum": 1,
                    "maximum": MAX_TIMEOUT_SECONDS,
                    "default": DEFAULT_TIMEOUT_SECONDS
                }
            },
            "required": ["helmfile_path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: SyncHelmfileRequest = match BaseToolImpl::parse_arguments(arguments) {
            Ok(request) => request,
            Err(response) => return Ok(response.into_call_tool_result()),
        };
        debug!(helmfile_path = %request.helmfile_path, "sync_helmfile called");

        let response = context
            .tools
            .sync_releases(&SyncRequest::from(request), context.progress_sink())
            .await;
        Ok(response.into_call_tool_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::helmfile_tools::HelmfileTools;
    use helmfile_mcp_config::HelmfileMcpConfig;
    use std::sync::Arc;

    fn context_with(config: HelmfileMcpConfig) -> ToolContext {
        ToolContext::new(Arc::new(HelmfileTools::new(Arc::new(config)).unwrap()))
    }

    fn echo_config() -> HelmfileMcpConfig {
        HelmfileMcpConfig {
            helmfile_binary: "echo".to_string(),
            ..Default::default()
        }
    }

    async fn run(
        config: HelmfileMcpConfig,
        arguments: serde_json::Value,
    ) -> serde_json::Value {
        let result = SyncHelmfileTool::new()
            .execute(arguments.as_object().unwrap().clone(), &context_with(config))
            .await
            .unwrap();
        result.structured_content.unwrap()
    }

    #[test]
    fn test_tool_properties() {
        let tool = SyncHelmfileTool::new();
        assert_eq!(tool.name(), "sync_helmfile");
        assert_eq!(tool.schema()["required"], serde_json::json!(["helmfile_path"]));
    }

    #[tokio::test]
    async fn test_sync_command_line() {
        let response = run(
            echo_config(),
            serde_json::json!({"helmfile_path": "x.yaml", "namespace": "web"}),
        )
        .await;
        assert_eq!(response["output"], "sync -f x.yaml --namespace web");
    }

    #[tokio::test]
    async fn test_sync_never_requires_confirmation() {
        let mut config = echo_config();
        config.policy.destructive_verbs = vec!["sync".to_string()];

        let response = run(config, serde_json::json!({"helmfile_path": "x.yaml"})).await;
        assert_eq!(response["status"], "success");
    }

    #[tokio::test]
    async fn test_sync_environment_allowlist() {
        let mut config = echo_config();
        config.policy.allowed_environments = Some(vec!["staging".to_string()]);

        let response = run(
            config,
            serde_json::json!({"helmfile_path": "x.yaml", "environment": "prod"}),
        )
        .await;
        assert_eq!(response["error"]["code"], "EnvironmentNotAllowed");
    }

    #[tokio::test]
    async fn test_empty_path_is_invalid_command() {
        let response = run(echo_config(), serde_json::json!({"helmfile_path": "  "})).await;
        assert_eq!(response["error"]["code"], "InvalidCommand");
    }
}
