//! Uniform responses for every tool invocation
//!
//! A [`Response`] can only be built through [`Response::success`] or
//! [`Response::error`], so a successful response always carries output and
//! no error, and a failed one always carries an error and no output.

use helmfile_mcp_shell::{
    ExecutionResult, PipelineParseError, RejectionKind, RunError, ValidationRejection,
};
use rmcp::model::CallToolResult;
use serde::Serialize;

/// Error codes surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// Empty, oversized, blocked or malformed command or arguments
    InvalidCommand,
    /// Destructive verb without confirmation
    ConfirmationRequired,
    /// Environment outside the allowlist
    EnvironmentNotAllowed,
    /// Command could not be split into stages
    ParseError,
    /// Last stage exited non-zero
    #[serde(rename = "COMMAND_FAILED")]
    CommandFailed,
    /// Deadline fired
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// Spawn, I/O or working directory failure
    #[serde(rename = "EXECUTION_ERROR")]
    ExecutionError,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidCommand => "InvalidCommand",
            ErrorCode::ConfirmationRequired => "ConfirmationRequired",
            ErrorCode::EnvironmentNotAllowed => "EnvironmentNotAllowed",
            ErrorCode::ParseError => "ParseError",
            ErrorCode::CommandFailed => "COMMAND_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RejectionKind> for ErrorCode {
    fn from(kind: RejectionKind) -> Self {
        match kind {
            RejectionKind::InvalidCommand => ErrorCode::InvalidCommand,
            RejectionKind::ConfirmationRequired => ErrorCode::ConfirmationRequired,
            RejectionKind::EnvironmentNotAllowed => ErrorCode::EnvironmentNotAllowed,
        }
    }
}

/// Outcome tag of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Command ran and exited zero
    Success,
    /// Anything else
    Error,
}

/// Typed error carried by a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable explanation
    pub message: String,
}

/// Terminal result of a tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    /// Successful response with output
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Failed response with a code and message
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            output: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Overall outcome
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the command succeeded
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Command output, present only on success
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Error code and message, present only on failure
    pub fn error_detail(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    /// Error code, if this is a failed response
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    /// Wire representation
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "status": "error",
                "error": { "code": "EXECUTION_ERROR", "message": "response serialization failed" }
            })
        })
    }

    /// Structured MCP result with `isError` mirroring the status
    pub fn into_call_tool_result(self) -> CallToolResult {
        let value = self.to_json();
        if self.is_success() {
            CallToolResult::structured(value)
        } else {
            CallToolResult::structured_error(value)
        }
    }
}

/// Everything the pipeline can end with
#[derive(Debug)]
pub enum Outcome {
    /// The chain ran (possibly timing out)
    Executed {
        /// What the runner produced
        result: ExecutionResult,
        /// Timeout that applied, for the TIMEOUT message
        timeout_seconds: u64,
    },
    /// The validator refused the command
    Rejected(ValidationRejection),
    /// The command could not be parsed
    ParseFailed(PipelineParseError),
    /// The chain could not be run
    RunFailed(RunError),
}

/// Convert a pipeline outcome into a response
pub fn format(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Executed {
            result,
            timeout_seconds,
        } => format_execution(result, timeout_seconds),
        Outcome::Rejected(rejection) => Response::error(rejection.kind().into(), rejection.to_string()),
        Outcome::ParseFailed(error) => Response::error(ErrorCode::ParseError, error.to_string()),
        Outcome::RunFailed(error) => Response::error(ErrorCode::ExecutionError, error.to_string()),
    }
}

fn format_execution(result: ExecutionResult, timeout_seconds: u64) -> Response {
    if result.timed_out {
        let mut message = format!("Command timed out after {timeout_seconds} seconds");
        let partial = result.stdout.trim_end();
        if !partial.is_empty() {
            message.push_str("\nPartial output:\n");
            message.push_str(partial);
        }
        return Response::error(ErrorCode::Timeout, message);
    }

    if result.exit_code == 0 {
        return Response::success(result.stdout.trim_end());
    }

    let stderr = result.stderr.trim();
    let message = if stderr.is_empty() {
        format!("Command exited with status {}", result.exit_code)
    } else {
        stderr.to_string()
    };
    Response::error(ErrorCode::CommandFailed, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executed(exit_code: i32, stdout: &str, stderr: &str, timed_out: bool) -> Outcome {
        Outcome::Executed {
            result: ExecutionResult {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                truncated: false,
                duration: Duration::from_millis(10),
                timed_out,
            },
            timeout_seconds: 7,
        }
    }

    #[test]
    fn test_success_trims_trailing_whitespace() {
        let response = format(executed(0, "a\nb\n", "", false));
        assert!(response.is_success());
        assert_eq!(response.output(), Some("a\nb"));
        assert!(response.error_detail().is_none());
    }

    #[test]
    fn test_success_with_empty_output() {
        let response = format(executed(0, "", "warning on stderr", false));
        assert_eq!(response.output(), Some(""));
    }

    #[test]
    fn test_failure_uses_trimmed_stderr() {
        let response = format(executed(1, "ignored", "  err: no releases\n", false));
        assert_eq!(response.error_code(), Some(ErrorCode::CommandFailed));
        assert_eq!(response.error_detail().unwrap().message, "err: no releases");
        assert!(response.output().is_none());
    }

    #[test]
    fn test_failure_without_stderr_reports_status() {
        let response = format(executed(3, "", " \n", false));
        assert_eq!(
            response.error_detail().unwrap().message,
            "Command exited with status 3"
        );
    }

    #[test]
    fn test_timeout_message_includes_partial_output() {
        let response = format(executed(-1, "line one\n", "", true));
        let error = response.error_detail().unwrap();
        assert_eq!(error.code, ErrorCode::Timeout);
        assert!(error.message.starts_with("Command timed out after 7 seconds"));
        assert!(error.message.contains("line one"));
    }

    #[test]
    fn test_timeout_without_output() {
        let response = format(executed(-1, "", "", true));
        assert_eq!(
            response.error_detail().unwrap().message,
            "Command timed out after 7 seconds"
        );
    }

    #[test]
    fn test_rejection_codes() {
        let response = format(Outcome::Rejected(ValidationRejection::EmptyCommand));
        assert_eq!(response.error_code(), Some(ErrorCode::InvalidCommand));

        let response = format(Outcome::ParseFailed(PipelineParseError::EmptyCommand));
        assert_eq!(response.error_code(), Some(ErrorCode::ParseError));

        let response = format(Outcome::RunFailed(RunError::EmptyPipeline));
        assert_eq!(response.error_code(), Some(ErrorCode::ExecutionError));
    }

    #[test]
    fn test_wire_shape() {
        assert_eq!(
            Response::success("ok").to_json(),
            serde_json::json!({"status": "success", "output": "ok"})
        );
        assert_eq!(
            Response::error(ErrorCode::Timeout, "slow").to_json(),
            serde_json::json!({"status": "error", "error": {"code": "TIMEOUT", "message": "slow"}})
        );
        assert_eq!(
            Response::error(ErrorCode::EnvironmentNotAllowed, "no").to_json()["error"]["code"],
            "EnvironmentNotAllowed"
        );
    }

    #[test]
    fn test_call_tool_result_mirrors_status() {
        let ok = Response::success("fine").into_call_tool_result();
        assert_eq!(ok.is_error, Some(false));
        assert_eq!(
            ok.structured_content,
            Some(serde_json::json!({"status": "success", "output": "fine"}))
        );

        let failed = Response::error(ErrorCode::ParseError, "bad").into_call_tool_result();
        assert_eq!(failed.is_error, Some(true));
    }
}
