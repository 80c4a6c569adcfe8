//! Command guardrails applied before any parsing or spawning
//!
//! The validator inspects the raw command string. Verb and flag detection
//! applies to the first pipe segment and to every later segment that runs
//! the helmfile program.

use crate::pipeline::{first_segment, split_top_level};
use helmfile_mcp_common::{ErrorSeverity, HelmfileMcpError, Result, Severity};
use helmfile_mcp_config::{HelmfileMcpConfig, PolicyConfig};
use regex::Regex;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Category of a rejection, surfaced to clients as the error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Empty, oversized, blocked or otherwise malformed command
    InvalidCommand,
    /// Destructive verb without confirmation
    ConfirmationRequired,
    /// Environment outside the allowlist
    EnvironmentNotAllowed,
}

impl RejectionKind {
    /// Wire name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionKind::InvalidCommand => "InvalidCommand",
            RejectionKind::ConfirmationRequired => "ConfirmationRequired",
            RejectionKind::EnvironmentNotAllowed => "EnvironmentNotAllowed",
        }
    }
}

/// Reasons a command is refused before execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejection {
    /// Command is empty or whitespace
    #[error("Command must not be empty")]
    EmptyCommand,

    /// Command exceeds maximum allowed length
    #[error("Command too long: {length} characters exceeds limit of {limit}")]
    CommandTooLong {
        /// Actual command length
        length: usize,
        /// Maximum allowed length
        limit: usize,
    },

    /// Command contains a blocked pattern
    #[error("Command contains blocked pattern: {pattern}")]
    BlockedPattern {
        /// The matched pattern
        pattern: String,
    },

    /// Environment flag present without a value
    #[error("Environment flag '{flag}' requires a value")]
    MissingEnvironmentValue {
        /// The flag as written
        flag: String,
    },

    /// Destructive verb without confirmation
    #[error("'{verb}' is a destructive operation; add {hint} or set confirm to true to proceed")]
    ConfirmationRequired {
        /// The destructive verb found
        verb: String,
        /// Accepted confirmation flags
        hint: String,
    },

    /// Environment not in the allowlist
    #[error("Environment '{environment}' is not allowed; allowed environments: {allowed}")]
    EnvironmentNotAllowed {
        /// The requested environment
        environment: String,
        /// Comma separated allowlist
        allowed: String,
    },
}

impl ValidationRejection {
    /// Category used as the response error code
    pub fn kind(&self) -> RejectionKind {
        match self {
            ValidationRejection::EmptyCommand
            | ValidationRejection::CommandTooLong { .. }
            | ValidationRejection::BlockedPattern { .. }
            | ValidationRejection::MissingEnvironmentValue { .. } => RejectionKind::InvalidCommand,
            ValidationRejection::ConfirmationRequired { .. } => RejectionKind::ConfirmationRequired,
            ValidationRejection::EnvironmentNotAllowed { .. } => {
                RejectionKind::EnvironmentNotAllowed
            }
        }
    }
}

impl Severity for ValidationRejection {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}

/// Validator holding an immutable policy and its compiled patterns
///
/// Validation is pure: the same input always yields the same outcome.
#[derive(Debug)]
pub struct CommandValidator {
    policy: PolicyConfig,
    helmfile_binary: String,
    blocked_patterns: Vec<Regex>,
}

impl CommandValidator {
    /// Create a validator from the loaded configuration
    pub fn new(config: &HelmfileMcpConfig) -> Result<Self> {
        let blocked_patterns = Self::compile_blocked_patterns(&config.policy.blocked_patterns)?;

        Ok(Self {
            policy: config.policy.clone(),
            helmfile_binary: config.helmfile_binary.clone(),
            blocked_patterns,
        })
    }

    /// Create a validator with the default configuration
    pub fn with_default_policy() -> Result<Self> {
        Self::new(&HelmfileMcpConfig::default())
    }

    /// Validate a raw command
    ///
    /// `confirmed` is the explicit confirmation carried by the request; a
    /// confirmation flag in the command counts the same.
    pub fn validate(
        &self,
        command: &str,
        confirmed: bool,
    ) -> std::result::Result<(), ValidationRejection> {
        if command.trim().is_empty() {
            return Err(ValidationRejection::EmptyCommand);
        }

        self.check_command_length(command)?;
        self.check_blocked_patterns(command)?;

        for tokens in self.helmfile_invocations(command) {
            self.check_confirmation(&tokens, confirmed)?;
            self.check_environment_flags(&tokens)?;
        }

        debug!(command = %command, "Command passed validation");
        Ok(())
    }

    /// Check a single environment name against the allowlist
    pub fn validate_environment(
        &self,
        environment: &str,
    ) -> std::result::Result<(), ValidationRejection> {
        let Some(allowed) = &self.policy.allowed_environments else {
            return Ok(());
        };

        if allowed.iter().any(|candidate| candidate == environment) {
            return Ok(());
        }

        warn!(
            target: "helmfile_audit",
            environment = %environment,
            "Environment rejected by allowlist"
        );
        Err(ValidationRejection::EnvironmentNotAllowed {
            environment: environment.to_string(),
            allowed: allowed.join(", "),
        })
    }

    /// Whether a token names the helmfile program
    pub fn is_helmfile_program(&self, token: &str) -> bool {
        token == self.helmfile_binary
            || Path::new(token).file_name() == Path::new(&self.helmfile_binary).file_name()
    }

    /// Whether a token is one of the confirmation flags
    pub fn is_confirmation_flag(&self, token: &str) -> bool {
        self.policy.confirmation_flags.iter().any(|flag| flag == token)
    }

    fn check_command_length(&self, command: &str) -> std::result::Result<(), ValidationRejection> {
        let length = command.len();
        if length > self.policy.max_command_length {
            return Err(ValidationRejection::CommandTooLong {
                length,
                limit: self.policy.max_command_length,
            });
        }
        Ok(())
    }

    fn check_blocked_patterns(&self, command: &str) -> std::result::Result<(), ValidationRejection> {
        for pattern in &self.blocked_patterns {
            if pattern.is_match(command) {
                warn!(
                    target: "helmfile_audit",
                    pattern = %pattern.as_str(),
                    "Command rejected by blocked pattern"
                );
                return Err(ValidationRejection::BlockedPattern {
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_confirmation(
        &self,
        tokens: &[String],
        confirmed: bool,
    ) -> std::result::Result<(), ValidationRejection> {
        let Some(verb) = self.subcommand(tokens) else {
            return Ok(());
        };

        if !self.policy.destructive_verbs.iter().any(|v| v == verb) {
            return Ok(());
        }

        if confirmed || tokens.iter().any(|t| self.is_confirmation_flag(t)) {
            debug!(verb = %verb, "Destructive operation confirmed");
            return Ok(());
        }

        Err(ValidationRejection::ConfirmationRequired {
            verb: verb.to_string(),
            hint: self.policy.confirmation_flags.join(" or "),
        })
    }

    fn check_environment_flags(
        &self,
        tokens: &[String],
    ) -> std::result::Result<(), ValidationRejection> {
        let mut iter = tokens.iter().peekable();
        while let Some(token) = iter.next() {
            for flag in &self.policy.environment_flags {
                let value = if token == flag {
                    let has_value = iter.peek().is_some_and(|next| !next.starts_with('-'));
                    if has_value {
                        iter.next().map(String::as_str)
                    } else {
                        None
                    }
                } else if let Some(rest) = token.strip_prefix(flag.as_str()) {
                    if let Some(inline) = rest.strip_prefix('=') {
                        Some(inline).filter(|v| !v.is_empty())
                    } else if is_short_flag(flag) && !rest.is_empty() {
                        // `-eprod` is the attached form of `-e prod`
                        Some(rest)
                    } else {
                        continue;
                    }
                } else {
                    continue;
                };

                match value {
                    Some(environment) => self.validate_environment(environment)?,
                    None => {
                        return Err(ValidationRejection::MissingEnvironmentValue {
                            flag: flag.clone(),
                        })
                    }
                }
                break;
            }
        }
        Ok(())
    }

    /// First non-flag token, skipping values of value-taking flags
    fn subcommand<'a>(&self, tokens: &'a [String]) -> Option<&'a str> {
        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            if token.starts_with('-') {
                if !token.contains('=') && self.policy.value_flags.iter().any(|f| f == token) {
                    iter.next();
                }
                continue;
            }
            return Some(token.as_str());
        }
        None
    }

    /// Tokens of each helmfile invocation, without the program itself
    ///
    /// The first segment always counts; later segments only when they start
    /// with the helmfile program.
    fn helmfile_invocations(&self, command: &str) -> Vec<Vec<String>> {
        let segments =
            split_top_level(command).unwrap_or_else(|| vec![first_segment(command)]);

        segments
            .into_iter()
            .enumerate()
            .filter_map(|(position, segment)| {
                let mut tokens = shell_words::split(segment)
                    .unwrap_or_else(|_| segment.split_whitespace().map(String::from).collect());

                if tokens.first().is_some_and(|t| self.is_helmfile_program(t)) {
                    tokens.remove(0);
                    Some(tokens)
                } else if position == 0 {
                    Some(tokens)
                } else {
                    None
                }
            })
            .collect()
    }

    fn compile_blocked_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
        patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    HelmfileMcpError::configuration(format!(
                        "Failed to compile blocked pattern '{pattern}': {e}"
                    ))
                })
            })
            .collect()
    }
}

fn is_short_flag(flag: &str) -> bool {
    flag.len() == 2 && flag.starts_with('-') && !flag.starts_with("--")
}
