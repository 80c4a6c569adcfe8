//! # helmfile-mcp Common
//!
//! Foundational types shared across the helmfile-mcp workspace:
//!
//! - [`error`] - the base error type and severity classification
//! - [`logging`] - helpers for rendering structured values in log lines
//!
//! Domain crates define their own error enums and implement [`Severity`] so that
//! the server and CLI can pick log levels consistently.

pub mod error;
pub mod logging;

// Re-export error types for convenience
pub use error::{ErrorSeverity, HelmfileMcpError, Result, Severity};

// Re-export logging helpers for convenience
pub use logging::Pretty;
