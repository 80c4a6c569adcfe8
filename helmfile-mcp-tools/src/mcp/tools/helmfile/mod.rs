//! Helmfile tools
//!
//! - `execute_helmfile`: run any helmfile command line, optionally piped
//!   through further stages
//! - `sync_helmfile`: sync the releases of one helmfile
//!
//! Both return the same response shape:
//!
//! ```json
//! { "status": "error", "error": { "code": "TIMEOUT", "message": "Command timed out after 30 seconds" } }
//! ```

pub mod execute;
pub mod sync;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all helmfile tools with the registry
pub fn register_helmfile_tools(registry: &mut ToolRegistry) {
    registry.register(execute::ExecuteHelmfileTool::new());
    registry.register(sync::SyncHelmfileTool::new());
}
