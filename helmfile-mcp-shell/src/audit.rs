//! Audit trail for executed commands
//!
//! Events are emitted on the `helmfile_audit` target so they can be routed
//! separately from operational logs.

use crate::runner::ExecutionResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "helmfile_audit";

/// Audit record for one pipeline execution
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Unix epoch seconds when the record was created
    pub timestamp: u64,
    /// Rendered pipe chain
    pub command: String,
    /// Working directory, when overridden
    pub working_directory: Option<PathBuf>,
    /// Exit code of the last stage
    pub exit_code: Option<i32>,
    /// Wall time in milliseconds
    pub execution_time_ms: Option<u64>,
    /// Whether the deadline fired
    pub timed_out: bool,
}

impl AuditEvent {
    /// Create an event for a command about to start
    pub fn new(command: String, working_directory: Option<&Path>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            timestamp,
            command,
            working_directory: working_directory.map(Path::to_path_buf),
            exit_code: None,
            execution_time_ms: None,
            timed_out: false,
        }
    }

    /// Fill in the outcome of the execution
    pub fn with_result(mut self, result: &ExecutionResult) -> Self {
        self.exit_code = Some(result.exit_code);
        self.execution_time_ms = Some(result.duration.as_millis() as u64);
        self.timed_out = result.timed_out;
        self
    }
}

/// Log the start of an execution
pub fn log_execution_started(event: &AuditEvent) {
    info!(
        target: AUDIT_TARGET,
        command = %event.command,
        working_dir = ?event.working_directory,
        timestamp = event.timestamp,
        "Helmfile command execution started"
    );
}

/// Log the completion of an execution
pub fn log_execution_completed(event: &AuditEvent) {
    info!(
        target: AUDIT_TARGET,
        command = %event.command,
        exit_code = ?event.exit_code,
        execution_time_ms = ?event.execution_time_ms,
        timed_out = event.timed_out,
        success = event.exit_code == Some(0) && !event.timed_out,
        "Helmfile command execution completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[test]
    fn test_event_records_result() {
        let result = ExecutionResult {
            exit_code: 2,
            stdout: String::new(),
            stderr: "boom".to_string(),
            truncated: false,
            duration: Duration::from_millis(1500),
            timed_out: false,
        };
        let event = AuditEvent::new("helmfile list".to_string(), None).with_result(&result);

        assert_eq!(event.exit_code, Some(2));
        assert_eq!(event.execution_time_ms, Some(1500));
        assert!(!event.timed_out);
        assert!(event.timestamp > 0);
    }

    #[traced_test]
    #[test]
    fn test_completion_is_logged_on_audit_target() {
        let result = ExecutionResult {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
            duration: Duration::from_secs(1),
            timed_out: true,
        };
        let event = AuditEvent::new("sleep 5".to_string(), None).with_result(&result);
        log_execution_completed(&event);

        assert!(logs_contain("Helmfile command execution completed"));
        assert!(logs_contain("timed_out=true"));
    }
}
