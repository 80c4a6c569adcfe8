//! helmfile-mcp configuration management using Figment
//!
//! Loads the immutable [`HelmfileMcpConfig`] shared by the server, with
//! the following precedence (later wins):
//!
//! - built-in defaults
//! - global file `~/.helmfile-mcp/config.{toml,yaml,yml,json}`
//! - project file `./.helmfile-mcp/config.{toml,yaml,yml,json}`
//! - an explicit `--config <file>`
//! - `HELMFILE_MCP_*` environment variables, nested keys split on `__`
//! - command line overrides
//!
//! ```no_run
//! use helmfile_mcp_config::{load_configuration, ConfigOverrides};
//!
//! let config = load_configuration(&ConfigOverrides::default())?;
//! println!("helmfile binary: {}", config.helmfile_binary);
//! # Ok::<(), helmfile_mcp_config::ConfigError>(())
//! ```
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! helmfile_binary: /usr/local/bin/helmfile
//! default_timeout_seconds: 300
//! max_timeout_seconds: 1800
//! max_output_bytes: 10485760
//! policy:
//!   allowed_environments: [staging, dev]
//!   destructive_verbs: [apply, destroy, delete]
//! ```
//!
//! ```bash
//! export HELMFILE_MCP_DEFAULT_TIMEOUT_SECONDS=60                # → default_timeout_seconds
//! export HELMFILE_MCP_POLICY__ALLOWED_ENVIRONMENTS='[staging]'  # → policy.allowed_environments
//! ```

/// File discovery logic for configuration files
pub mod discovery;
/// Error types and handling
pub mod error;
/// Figment provider and CLI overrides
pub mod provider;
/// Configuration data structures
pub mod types;

pub use discovery::{ConfigFile, ConfigFormat, ConfigScope, FileDiscovery};
pub use error::{ConfigError, ConfigResult};
pub use provider::{ConfigOverrides, ConfigProvider, ENV_PREFIX};
pub use types::{
    HelmfileMcpConfig, PolicyConfig, DEFAULT_HELMFILE_BINARY, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_TERMINATION_GRACE_SECONDS, DEFAULT_TIMEOUT_SECONDS, MAX_COMMAND_LENGTH, MAX_TIMEOUT_SECONDS,
};

/// Load configuration from all sources in precedence order
pub fn load_configuration(overrides: &ConfigOverrides) -> ConfigResult<HelmfileMcpConfig> {
    ConfigProvider::new().load(overrides)
}
