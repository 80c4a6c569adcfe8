//! MCP tools, one module per tool group

pub mod helmfile;
