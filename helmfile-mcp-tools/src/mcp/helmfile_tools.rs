//! The two user-facing operations: run a helmfile command, sync releases
//!
//! Both drive the same pipeline: validate, parse, normalize, run, format.
//! Nothing escapes as an error; every failure becomes a [`Response`].

use crate::mcp::progress_notifications::{report, ProgressPhase, ProgressSink};
use crate::mcp::responses::{format, ErrorCode, Outcome, Response};
use helmfile_mcp_common::Result;
use helmfile_mcp_config::HelmfileMcpConfig;
use helmfile_mcp_shell::{
    parse_pipeline, render_pipeline, run_pipeline, CommandValidator, PipelineStage, RunOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A request to run an arbitrary helmfile command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command line, optionally with `|` stages
    pub raw_command: String,
    /// Per-invocation timeout; the configured default when `None`
    pub timeout_seconds: Option<u64>,
    /// Directory to run in; inherited when `None`
    pub working_directory: Option<PathBuf>,
    /// Namespace appended to the helmfile stage
    pub namespace: Option<String>,
    /// Explicit confirmation for destructive verbs
    pub confirmed: bool,
}

impl CommandSpec {
    /// Request with defaults for everything but the command line
    pub fn new(raw_command: impl Into<String>) -> Self {
        Self {
            raw_command: raw_command.into(),
            ..Default::default()
        }
    }

    /// Set the timeout in seconds
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Set the working directory
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Mark the request as confirmed
    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }
}

/// A request to sync the releases of one helmfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    /// Path passed to `-f`, not re-quoted
    pub helmfile_path: String,
    /// Optional `--namespace`; blank is ignored
    pub namespace: Option<String>,
    /// Optional `--environment`, checked against the allowlist
    pub environment: Option<String>,
    /// Per-invocation timeout; the configured default when `None`
    pub timeout_seconds: Option<u64>,
}

impl SyncRequest {
    /// Request syncing `helmfile_path` with no namespace or environment
    pub fn new(helmfile_path: impl Into<String>) -> Self {
        Self {
            helmfile_path: helmfile_path.into(),
            ..Default::default()
        }
    }
}

/// Tool facade shared by the MCP tools and the CLI
///
/// Holds only immutable state, so one instance serves concurrent invocations.
#[derive(Debug)]
pub struct HelmfileTools {
    config: Arc<HelmfileMcpConfig>,
    validator: CommandValidator,
}

impl HelmfileTools {
    /// Create the facade from a loaded configuration
    pub fn new(config: Arc<HelmfileMcpConfig>) -> Result<Self> {
        let validator = CommandValidator::new(&config)?;
        Ok(Self { config, validator })
    }

    /// Get the configuration
    pub fn config(&self) -> &HelmfileMcpConfig {
        &self.config
    }

    /// Validate, parse, normalize and run a command line
    pub async fn execute_command(
        &self,
        spec: &CommandSpec,
        sink: Option<&dyn ProgressSink>,
    ) -> Response {
        let timeout_seconds = match self.resolve_timeout(spec.timeout_seconds) {
            Ok(timeout) => timeout,
            Err(response) => return response,
        };

        if let Err(rejection) = self.validator.validate(&spec.raw_command, spec.confirmed) {
            warn!(
                command = %spec.raw_command,
                code = rejection.kind().as_str(),
                "Command rejected: {}",
                rejection
            );
            return format(Outcome::Rejected(rejection));
        }
        report(sink, ProgressPhase::Validated, None);

        let stages = match parse_pipeline(&spec.raw_command) {
            Ok(stages) => stages,
            Err(error) => {
                warn!(command = %spec.raw_command, "Command could not be parsed: {}", error);
                return format(Outcome::ParseFailed(error));
            }
        };

        let stages = self.normalize(stages, spec.namespace.as_deref());
        self.run(stages, timeout_seconds, spec.working_directory.clone(), sink)
            .await
    }

    /// Run `helmfile sync -f <path>` with optional namespace and environment
    ///
    /// Sync needs no confirmation; the environment allowlist still applies.
    pub async fn sync_releases(
        &self,
        request: &SyncRequest,
        sink: Option<&dyn ProgressSink>,
    ) -> Response {
        let timeout_seconds = match self.resolve_timeout(request.timeout_seconds) {
            Ok(timeout) => timeout,
            Err(response) => return response,
        };

        if request.helmfile_path.trim().is_empty() {
            return Response::error(ErrorCode::InvalidCommand, "helmfile_path must not be empty");
        }

        let mut arguments = vec![
            "sync".to_string(),
            "-f".to_string(),
            request.helmfile_path.clone(),
        ];

        if let Some(namespace) = non_blank(request.namespace.as_deref()) {
            arguments.extend(["--namespace".to_string(), namespace.to_string()]);
        }

        if let Some(environment) = non_blank(request.environment.as_deref()) {
            if let Err(rejection) = self.validator.validate_environment(environment) {
                warn!(environment = %environment, "Sync rejected: {}", rejection);
                return format(Outcome::Rejected(rejection));
            }
            arguments.extend(["--environment".to_string(), environment.to_string()]);
        }
        report(sink, ProgressPhase::Validated, None);

        let stages = vec![PipelineStage::new(
            self.config.helmfile_binary.clone(),
            arguments,
        )];
        self.run(stages, timeout_seconds, None, sink).await
    }

    async fn run(
        &self,
        stages: Vec<PipelineStage>,
        timeout_seconds: u64,
        working_directory: Option<PathBuf>,
        sink: Option<&dyn ProgressSink>,
    ) -> Response {
        let rendered = render_pipeline(&stages);
        let options = RunOptions {
            timeout: Duration::from_secs(timeout_seconds),
            termination_grace: Duration::from_secs(self.config.termination_grace_seconds),
            working_directory,
            audit: self.config.policy.enable_audit_logging,
            max_output_bytes: self.config.max_output_bytes,
        };

        info!(command = %rendered, timeout_seconds, "Running helmfile command");
        report(sink, ProgressPhase::Started, Some(&rendered));

        let response = match run_pipeline(&stages, &options).await {
            Ok(result) => format(Outcome::Executed {
                result,
                timeout_seconds,
            }),
            Err(error) => {
                warn!(command = %rendered, "Command could not be run: {}", error);
                format(Outcome::RunFailed(error))
            }
        };

        let summary = response
            .error_code()
            .map_or("success", |code| code.as_str());
        report(sink, ProgressPhase::Completed, Some(summary));
        response
    }

    /// Prepend the helmfile program when missing, append the namespace and
    /// drop confirmation flags from every helmfile stage
    fn normalize(&self, mut stages: Vec<PipelineStage>, namespace: Option<&str>) -> Vec<PipelineStage> {
        let Some(first) = stages.first_mut() else {
            return stages;
        };

        if !self.validator.is_helmfile_program(&first.executable) {
            let subcommand = std::mem::replace(
                &mut first.executable,
                self.config.helmfile_binary.clone(),
            );
            first.arguments.insert(0, subcommand);
        }

        if let Some(namespace) = non_blank(namespace) {
            first
                .arguments
                .extend(["--namespace".to_string(), namespace.to_string()]);
        }

        for (position, stage) in stages.iter_mut().enumerate() {
            if position == 0 || self.validator.is_helmfile_program(&stage.executable) {
                stage
                    .arguments
                    .retain(|argument| !self.validator.is_confirmation_flag(argument));
            }
        }

        debug!(command = %render_pipeline(&stages), "Normalized command");
        stages
    }

    fn resolve_timeout(&self, requested: Option<u64>) -> std::result::Result<u64, Response> {
        let timeout = requested.unwrap_or(self.config.default_timeout_seconds);
        if timeout == 0 || timeout > self.config.max_timeout_seconds {
            return Err(Response::error(
                ErrorCode::InvalidCommand,
                format!(
                    "timeout must be between 1 and {} seconds, got {}",
                    self.config.max_timeout_seconds, timeout
                ),
            ));
        }
        Ok(timeout)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
