//! # helmfile-mcp Tools
//!
//! MCP server and tools for running helmfile commands.
//!
//! - **Tool facade**: [`HelmfileTools`] validates, parses, runs and formats
//!   commands and never fails; every outcome is a [`Response`]
//! - **MCP tools**: `execute_helmfile` and `sync_helmfile`
//! - **Server**: [`McpServer`] implements the rmcp `ServerHandler` and turns
//!   facade progress into `notifications/progress`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helmfile_mcp_config::HelmfileMcpConfig;
//! use helmfile_mcp_tools::{CommandSpec, HelmfileTools};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tools = HelmfileTools::new(Arc::new(HelmfileMcpConfig::default()))?;
//! let response = tools.execute_command(&CommandSpec::new("list"), None).await;
//! println!("{}", response.to_json());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Model Context Protocol (MCP) server and tools
pub mod mcp;

pub use mcp::helmfile_tools::{CommandSpec, HelmfileTools, SyncRequest};
pub use mcp::progress_notifications::{ProgressPhase, ProgressSender, ProgressSink};
pub use mcp::responses::{ErrorCode, Response, Status};
pub use mcp::McpServer;
pub use mcp::{ToolContext, ToolRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
