//! # helmfile-mcp Shell Crate
//!
//! The command execution core of helmfile-mcp:
//!
//! - **Validation**: length limits, blocked patterns, destructive-verb
//!   confirmation and the environment allowlist ([`CommandValidator`])
//! - **Pipe parsing**: top-level `|` splitting with shell quoting ([`parse_pipeline`])
//! - **Execution**: process-group pipe chains under one deadline ([`run_pipeline`])
//! - **Audit logging**: start/completion events on the `helmfile_audit` target
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helmfile_mcp_shell::{parse_pipeline, run_pipeline, CommandValidator, RunOptions};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = CommandValidator::with_default_policy()?;
//! validator.validate("helmfile list | grep web", false)?;
//!
//! let stages = parse_pipeline("helmfile list | grep web")?;
//! let result = run_pipeline(&stages, &RunOptions::new(Duration::from_secs(60))).await?;
//! println!("exit code {}", result.exit_code);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Audit events for executed commands
pub mod audit;

/// Pipe chain parsing
pub mod pipeline;

/// Process-group execution of pipe chains
pub mod runner;

/// Command guardrails
pub mod validator;

pub use audit::{log_execution_completed, log_execution_started, AuditEvent, AUDIT_TARGET};
pub use pipeline::{parse_pipeline, render_pipeline, PipelineParseError, PipelineStage};
pub use runner::{run_pipeline, ExecutionResult, RunError, RunOptions, TRUNCATION_MARKER};
pub use validator::{CommandValidator, RejectionKind, ValidationRejection};
