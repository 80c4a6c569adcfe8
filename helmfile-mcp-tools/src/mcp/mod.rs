//! Model Context Protocol (MCP) server support
//!
//! 1. **Server layer**: [`McpServer`] handles MCP protocol messages
//! 2. **Registry layer**: [`ToolRegistry`] dispatches tool calls by name
//! 3. **Tool layer**: `tools::helmfile` parses arguments and calls the facade
//! 4. **Facade**: [`helmfile_tools::HelmfileTools`] runs the command pipeline
//!
//! ### Registering Tools
//!
//! ```rust
//! use helmfile_mcp_tools::mcp::{register_helmfile_tools, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! register_helmfile_tools(&mut registry);
//! assert_eq!(registry.len(), 2);
//! ```

pub mod helmfile_tools;
pub mod progress_notifications;
pub mod responses;
pub mod server;
pub mod tool_registry;
pub mod tools;

pub use server::McpServer;
pub use tool_registry::{BaseToolImpl, McpTool, ToolContext, ToolRegistry};
pub use tools::helmfile::register_helmfile_tools;
