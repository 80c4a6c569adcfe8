//! Tool registry for MCP operations
//!
//! Each tool lives in its own module under `tools/`, implements [`McpTool`]
//! and is registered by name. The server resolves `call_tool` requests
//! through the registry.
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
//!
//! #[derive(Default)]
//! pub struct MyTool;
//!
//! #[async_trait]
//! impl McpTool for MyTool {
//!     fn name(&self) -> &'static str {
//!         "my_tool"
//!     }
//!
//!     fn description(&self) -> &'static str {
//!         include_str!("description.md")
//!     }
//!
//!     fn schema(&self) -> serde_json::Value {
//!         serde_json::json!({ "type": "object", "properties": {} })
//!     }
//!
//!     async fn execute(
//!         &self,
//!         arguments: serde_json::Map<String, serde_json::Value>,
//!         context: &ToolContext,
//!     ) -> Result<CallToolResult, McpError> {
//!         let request: MyRequest = match BaseToolImpl::parse_arguments(arguments) {
//!             Ok(request) => request,
//!             Err(response) => return Ok(response.into_call_tool_result()),
//!         };
//!         // ...
//!     }
//! }
//! ```

use super::helmfile_tools::HelmfileTools;
use super::progress_notifications::{ProgressSender, ProgressSink};
use super::responses::{ErrorCode, Response};
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use std::collections::HashMap;
use std::sync::Arc;

/// Context shared by all tools during execution
///
/// Cloned per request; the facade is shared, the progress sender is bound
/// to the request's progress token when the client supplied one.
#[derive(Clone)]
pub struct ToolContext {
    /// Facade performing validation and execution
    pub tools: Arc<HelmfileTools>,

    /// Progress channel for the current request
    pub progress_sender: Option<ProgressSender>,
}

impl ToolContext {
    /// Create a new tool context without progress reporting
    pub fn new(tools: Arc<HelmfileTools>) -> Self {
        Self {
            tools,
            progress_sender: None,
        }
    }

    /// Attach a progress sender for the current request
    pub fn with_progress_sender(mut self, sender: ProgressSender) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    /// Progress sink for the facade, if any
    pub fn progress_sink(&self) -> Option<&dyn ProgressSink> {
        self.progress_sender
            .as_ref()
            .map(|sender| sender as &dyn ProgressSink)
    }
}

/// Interface implemented by every MCP tool
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Unique tool name, stable across versions
    fn name(&self) -> &'static str;

    /// Human-readable description, usually `include_str!("description.md")`
    fn description(&self) -> &'static str;

    /// JSON schema of the tool's arguments
    fn schema(&self) -> serde_json::Value;

    /// Execute the tool
    ///
    /// Domain failures are reported inside the returned [`CallToolResult`]
    /// with `isError` set; `Err` is reserved for protocol-level problems.
    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError>;
}

/// Registry for managing MCP tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool in the registry
    pub fn register<T: McpTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Box::new(tool));
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    /// List all registered tool names, sorted
    pub fn list_tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all registered tools as Tool objects for MCP list_tools response
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .values()
            .map(|tool| {
                let schema_map = match tool.schema() {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                Tool::new(tool.name(), tool.description(), Arc::new(schema_map))
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Common helpers for tool implementations
pub struct BaseToolImpl;

impl BaseToolImpl {
    /// Parse tool arguments from a JSON map into a typed struct
    ///
    /// A malformed argument object is a client mistake, not a protocol
    /// failure, so it comes back as an `INVALID_COMMAND` response.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<T, Response> {
        serde_json::from_value(serde_json::Value::Object(arguments)).map_err(|e| {
            Response::error(ErrorCode::InvalidCommand, format!("Invalid arguments: {e}"))
        })
    }
}
