//! Error types for helmfile-mcp Common
//!
//! This module provides the base error type shared by the workspace crates,
//! along with the severity classification used to choose log levels.

use std::fmt;
use thiserror::Error as ThisError;

/// Severity levels for error classification
///
/// - **Warning**: Potential issue but the operation can proceed.
/// - **Error**: The operation failed but the server can keep serving requests.
/// - **Critical**: The process cannot continue (e.g. invalid startup configuration).
///
/// ```rust
/// use helmfile_mcp_common::ErrorSeverity;
///
/// let rejected_command = ErrorSeverity::Warning;
/// let spawn_failure = ErrorSeverity::Error;
/// let bad_config = ErrorSeverity::Critical;
/// assert_ne!(rejected_command, bad_config);
/// # let _ = spawn_failure;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,

    /// Operation failed but system can continue
    Error,

    /// System cannot continue, requires immediate attention
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Trait for error types that have severity levels
///
/// Every error enum in the workspace implements this so callers can log
/// rejections, runtime failures and startup failures at consistent levels.
///
/// ```rust
/// use helmfile_mcp_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum MyError {
///     Rejected,
///     Crashed,
/// }
///
/// impl Severity for MyError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             MyError::Rejected => ErrorSeverity::Warning,
///             MyError::Crashed => ErrorSeverity::Error,
///         }
///     }
/// }
///
/// assert_eq!(MyError::Crashed.severity(), ErrorSeverity::Error);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

/// Result type alias for helmfile-mcp operations
pub type Result<T> = std::result::Result<T, HelmfileMcpError>;

/// Common error type for helmfile-mcp operations
///
/// Domain-specific errors (validation, parsing, process execution,
/// configuration loading) live in their own crates. This type covers the
/// failures raised while building the shared runtime from a loaded config.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum HelmfileMcpError {
    /// Configuration is unusable at runtime
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },
}

impl HelmfileMcpError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl Severity for HelmfileMcpError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            HelmfileMcpError::Configuration { .. } => ErrorSeverity::Critical,
        }
    }
}
