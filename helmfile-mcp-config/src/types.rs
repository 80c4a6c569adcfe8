//! Core data structures for the helmfile-mcp configuration system

use crate::{ConfigError, ConfigResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default helmfile program name, resolved through `PATH`
pub const DEFAULT_HELMFILE_BINARY: &str = "helmfile";

/// Default per-invocation timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound accepted for a per-invocation timeout
pub const MAX_TIMEOUT_SECONDS: u64 = 1800;

/// Seconds between SIGTERM and SIGKILL when a chain times out
pub const DEFAULT_TERMINATION_GRACE_SECONDS: u64 = 5;

/// Bytes of output kept per stream before truncation
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum allowed command length in characters
pub const MAX_COMMAND_LENGTH: usize = 4096;

/// Process-wide configuration for the helmfile MCP server
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// invocation. Missing keys fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmfileMcpConfig {
    /// Program prepended to commands and used for `sync`
    pub helmfile_binary: String,

    /// Timeout used when a request does not specify one
    pub default_timeout_seconds: u64,

    /// Largest timeout a request may ask for
    pub max_timeout_seconds: u64,

    /// Grace period between SIGTERM and SIGKILL on timeout
    pub termination_grace_seconds: u64,

    /// Cap on captured bytes per output stream; excess output is dropped
    pub max_output_bytes: usize,

    /// Command guardrails
    pub policy: PolicyConfig,
}

impl Default for HelmfileMcpConfig {
    fn default() -> Self {
        Self {
            helmfile_binary: DEFAULT_HELMFILE_BINARY.to_string(),
            default_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            termination_grace_seconds: DEFAULT_TERMINATION_GRACE_SECONDS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            policy: PolicyConfig::default(),
        }
    }
}

impl HelmfileMcpConfig {
    /// Check the invariants the runtime relies on
    ///
    /// Called by the provider after every load. A configuration that fails
    /// here must never reach the tool facade.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.helmfile_binary.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "helmfile_binary",
                "must not be empty",
            ));
        }

        if self.default_timeout_seconds == 0 {
            return Err(ConfigError::invalid_value(
                "default_timeout_seconds",
                "must be greater than zero",
            ));
        }

        if self.max_timeout_seconds == 0 {
            return Err(ConfigError::invalid_value(
                "max_timeout_seconds",
                "must be greater than zero",
            ));
        }

        if self.default_timeout_seconds > self.max_timeout_seconds {
            return Err(ConfigError::invalid_value(
                "default_timeout_seconds",
                format!(
                    "{} exceeds max_timeout_seconds ({})",
                    self.default_timeout_seconds, self.max_timeout_seconds
                ),
            ));
        }

        if self.max_output_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "max_output_bytes",
                "must be greater than zero",
            ));
        }

        self.policy.validate()
    }
}

/// Guardrails applied to every command before it is parsed or spawned
///
/// Verb, flag and environment lists are matched by exact, case-sensitive
/// token equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Environments commands may target. `None` means unrestricted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_environments: Option<Vec<String>>,

    /// Subcommands that need explicit confirmation
    pub destructive_verbs: Vec<String>,

    /// Tokens that count as confirmation for a destructive verb
    pub confirmation_flags: Vec<String>,

    /// Flags whose value names a helmfile environment
    pub environment_flags: Vec<String>,

    /// Global flags whose next token is a value, not the subcommand
    pub value_flags: Vec<String>,

    /// Regex patterns that must never appear in a command
    pub blocked_patterns: Vec<String>,

    /// Maximum allowed command length
    pub max_command_length: usize,

    /// Emit `helmfile_audit` events for every execution
    pub enable_audit_logging: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_environments: None,
            destructive_verbs: strings(&["apply", "destroy", "delete"]),
            confirmation_flags: strings(&["--confirm"]),
            environment_flags: strings(&["-e", "--environment"]),
            value_flags: strings(&[
                "-f",
                "--file",
                "-e",
                "--environment",
                "-n",
                "--namespace",
                "-l",
                "--selector",
                "-b",
                "--helm-binary",
                "-c",
                "--chart",
                "--kube-context",
                "--state-values-file",
                "--state-values-set",
                "--log-level",
            ]),
            blocked_patterns: strings(&[
                // Piping output into an interpreter
                r"\|\s*(sh|bash|zsh|dash)(\s|$)",
                r"\bsudo\s+",
                r"rm\s+-rf\s+/",
                r"/etc/shadow",
            ]),
            max_command_length: MAX_COMMAND_LENGTH,
            enable_audit_logging: true,
        }
    }
}

impl PolicyConfig {
    /// Check that every list entry is usable and every pattern compiles
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_command_length == 0 {
            return Err(ConfigError::invalid_value(
                "policy.max_command_length",
                "must be greater than zero",
            ));
        }

        let lists = [
            ("policy.destructive_verbs", &self.destructive_verbs),
            ("policy.confirmation_flags", &self.confirmation_flags),
            ("policy.environment_flags", &self.environment_flags),
            ("policy.value_flags", &self.value_flags),
        ];
        for (key, values) in lists {
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(ConfigError::invalid_value(key, "entries must not be blank"));
            }
        }

        if let Some(environments) = &self.allowed_environments {
            if environments.iter().any(|e| e.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    "policy.allowed_environments",
                    "entries must not be blank",
                ));
            }
        }

        for pattern in &self.blocked_patterns {
            Regex::new(pattern).map_err(|e| {
                ConfigError::invalid_value(
                    "policy.blocked_patterns",
                    format!("failed to compile '{pattern}': {e}"),
                )
            })?;
        }

        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HelmfileMcpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.helmfile_binary, "helmfile");
        assert_eq!(config.default_timeout_seconds, 300);
        assert_eq!(config.max_timeout_seconds, 1800);
        assert_eq!(config.termination_grace_seconds, 5);
        assert_eq!(config.max_output_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_default_policy_lists() {
        let policy = PolicyConfig::default();
        assert!(policy.allowed_environments.is_none());
        assert_eq!(policy.destructive_verbs, vec!["apply", "destroy", "delete"]);
        assert_eq!(policy.confirmation_flags, vec!["--confirm"]);
        assert!(policy.value_flags.contains(&"-f".to_string()));
        assert_eq!(policy.max_command_length, 4096);
    }

    #[test]
    fn test_zero_default_timeout_rejected() {
        let config = HelmfileMcpConfig {
            default_timeout_seconds: 0,
            ..Default::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("default_timeout_seconds"));
    }

    #[test]
    fn test_zero_output_cap_rejected() {
        let config = HelmfileMcpConfig {
            max_output_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "max_output_bytes"
        ));
    }

    #[test]
    fn test_default_above_max_rejected() {
        let config = HelmfileMcpConfig {
            default_timeout_seconds: 600,
            max_timeout_seconds: 60,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "default_timeout_seconds"
        ));
    }

    #[test]
    fn test_invalid_blocked_pattern_rejected() {
        let mut config = HelmfileMcpConfig::default();
        config.policy.blocked_patterns.push("([unclosed".to_string());
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("policy.blocked_patterns"));
    }

    #[test]
    fn test_blank_environment_rejected() {
        let mut config = HelmfileMcpConfig::default();
        config.policy.allowed_environments = Some(vec!["staging".to_string(), " ".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_binary_rejected() {
        let config = HelmfileMcpConfig {
            helmfile_binary: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "max_timeout_seconds: 900\npolicy:\n  allowed_environments: [staging]\n";
        let config: HelmfileMcpConfig = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.max_timeout_seconds, 900);
        assert_eq!(config.default_timeout_seconds, 300);
        assert_eq!(
            config.policy.allowed_environments,
            Some(vec!["staging".to_string()])
        );
        assert_eq!(config.policy.confirmation_flags, vec!["--confirm"]);
    }
}
