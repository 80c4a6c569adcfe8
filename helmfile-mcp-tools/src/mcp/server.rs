//! MCP server exposing the helmfile tools

use rmcp::model::*;
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, Peer, RoleServer, ServerHandler};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use helmfile_mcp_common::Result;
use helmfile_mcp_config::HelmfileMcpConfig;

use super::helmfile_tools::HelmfileTools;
use super::progress_notifications::{ProgressNotification, ProgressSender};
use super::tool_registry::{McpTool, ToolContext, ToolRegistry};
use super::tools::helmfile::register_helmfile_tools;

/// Server instructions displayed to MCP clients
const SERVER_INSTRUCTIONS: &str = "Runs helmfile commands. Use execute_helmfile for any helmfile \
     command (destructive verbs need confirm=true) and sync_helmfile to sync a helmfile's releases.";

/// Create ServerCapabilities for MCP protocol
fn create_server_capabilities() -> ServerCapabilities {
    let mut capabilities = ServerCapabilities::default();
    capabilities.tools = Some(ToolsCapability {
        list_changed: Some(false),
    });
    capabilities
}

/// Create Implementation information for the MCP server
fn create_server_implementation() -> Implementation {
    Implementation::new("helmfile-mcp", crate::VERSION).with_title("Helmfile MCP Server")
}

/// MCP server for the helmfile tools
#[derive(Clone)]
pub struct McpServer {
    tool_registry: Arc<ToolRegistry>,
    tool_context: ToolContext,
}

impl McpServer {
    /// Create a server over the given configuration
    ///
    /// # Errors
    ///
    /// Fails when the configured policy cannot be compiled.
    pub fn new(config: Arc<HelmfileMcpConfig>) -> Result<Self> {
        let tools = Arc::new(HelmfileTools::new(config)?);

        let mut tool_registry = ToolRegistry::new();
        register_helmfile_tools(&mut tool_registry);
        tracing::debug!(
            "Registered {} tools: {:?}",
            tool_registry.len(),
            tool_registry.list_tool_names()
        );

        Ok(Self {
            tool_registry: Arc::new(tool_registry),
            tool_context: ToolContext::new(tools),
        })
    }

    /// Names of the registered tools, sorted
    pub fn list_tool_names(&self) -> Vec<String> {
        self.tool_registry.list_tool_names()
    }

    /// Tool definitions as advertised to clients
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tool_registry.list_tools()
    }

    /// Execute a tool by name without an MCP session
    pub async fn execute_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<CallToolResult, McpError> {
        let tool = self.resolve_tool(name)?;
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self::execute_tool_with_logging(tool, name, arguments, &self.tool_context).await
    }

    fn resolve_tool(&self, name: &str) -> std::result::Result<&dyn McpTool, McpError> {
        self.tool_registry.get_tool(name).ok_or_else(|| {
            tracing::error!("Unknown tool requested: {}", name);
            McpError::invalid_request(format!("Unknown tool: {}", name), None)
        })
    }

    async fn execute_tool_with_logging(
        tool: &dyn McpTool,
        name: &str,
        arguments: serde_json::Map<String, Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        tracing::info!("Executing tool: {}", name);
        let result = tool.execute(arguments, context).await;
        tracing::debug!("Tool execution result for {}: {:?}", name, result);
        result
    }

    /// Bind a progress sender to the request's token and forward its
    /// notifications to the peer until the sender is dropped
    fn spawn_progress_forwarder(
        peer: Peer<RoleServer>,
        token: ProgressToken,
    ) -> (ProgressSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressNotification>();
        let token_label = match &token.0 {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::String(s) => s.to_string(),
        };
        let sender = ProgressSender::new(tx, token_label);

        let handle = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let param = ProgressNotificationParam {
                    progress_token: token.clone(),
                    progress: f64::from(notification.progress.unwrap_or(0)),
                    total: Some(100.0),
                    message: Some(notification.message),
                };
                if let Err(e) = peer.notify_progress(param).await {
                    tracing::debug!("Failed to send progress notification: {}", e);
                }
            }
        });

        (sender, handle)
    }
}

impl ServerHandler for McpServer {
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.list_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        tracing::debug!(
            "call_tool() invoked for tool: {}, arguments: {:?}",
            request.name,
            request.arguments
        );

        let tool = self.resolve_tool(&request.name)?;
        let arguments = request.arguments.unwrap_or_default();

        let Some(token) = context.meta.get_progress_token() else {
            return Self::execute_tool_with_logging(tool, &request.name, arguments, &self.tool_context)
                .await;
        };

        let (sender, forwarder) = Self::spawn_progress_forwarder(context.peer.clone(), token);
        let tool_context = self.tool_context.clone().with_progress_sender(sender);
        let result =
            Self::execute_tool_with_logging(tool, &request.name, arguments, &tool_context).await;

        // the forwarder drains once the last sender is gone
        drop(tool_context);
        if let Err(e) = forwarder.await {
            tracing::debug!("Progress forwarder ended abnormally: {}", e);
        }
        result
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(create_server_capabilities())
            .with_protocol_version(ProtocolVersion::default())
            .with_server_info(create_server_implementation())
            .with_instructions(SERVER_INSTRUCTIONS)
    }
}
