//! Configuration provider using Figment

use crate::{
    discovery::{ConfigFile, ConfigFormat, ConfigScope, FileDiscovery},
    error::ConfigError,
    types::HelmfileMcpConfig,
    ConfigResult,
};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use helmfile_mcp_common::Pretty;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "HELMFILE_MCP_";

/// Values supplied on the command line, applied with the highest precedence
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit configuration file, merged after discovered files
    pub config_file: Option<PathBuf>,
    /// Replacement for `helmfile_binary`
    pub helmfile_binary: Option<String>,
    /// Replacement for `policy.allowed_environments` when non-empty
    pub allowed_environments: Vec<String>,
}

impl ConfigOverrides {
    fn to_value(&self) -> Value {
        let mut root = Map::new();
        if let Some(binary) = &self.helmfile_binary {
            root.insert("helmfile_binary".to_string(), json!(binary));
        }
        if !self.allowed_environments.is_empty() {
            root.insert(
                "policy".to_string(),
                json!({ "allowed_environments": self.allowed_environments }),
            );
        }
        Value::Object(root)
    }
}

/// Configuration provider using figment
///
/// Sources are merged in precedence order (later sources override earlier ones):
/// 1. Default values
/// 2. Discovered files (`~/.helmfile-mcp/`, then `./.helmfile-mcp/`)
/// 3. The explicit `--config` file
/// 4. `HELMFILE_MCP_*` environment variables
/// 5. Command line overrides
#[derive(Debug, Default)]
pub struct ConfigProvider {
    discovery: FileDiscovery,
}

impl ConfigProvider {
    /// Create a provider that discovers files in the standard locations
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with a custom file discovery
    pub fn with_discovery(discovery: FileDiscovery) -> Self {
        Self { discovery }
    }

    /// Load, merge and validate the configuration
    pub fn load(&self, overrides: &ConfigOverrides) -> ConfigResult<HelmfileMcpConfig> {
        let figment = self.build_figment(overrides)?;
        let config: HelmfileMcpConfig = figment.extract()?;
        config.validate()?;

        debug!("Loaded configuration: {}", Pretty(&config));
        info!(
            helmfile_binary = %config.helmfile_binary,
            default_timeout_seconds = config.default_timeout_seconds,
            restricted_environments = config.policy.allowed_environments.is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(&self, overrides: &ConfigOverrides) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HelmfileMcpConfig::default()));

        for config_file in self.discovery.discover_all() {
            trace!(
                "Loading config file: {} ({:?})",
                config_file.path.display(),
                config_file.format
            );
            figment = figment.merge(Self::file_provider(&config_file));
        }

        if let Some(path) = &overrides.config_file {
            figment = figment.merge(Self::file_provider(&Self::explicit_file(path)?));
        }

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides.to_value())))
    }

    fn explicit_file(path: &Path) -> ConfigResult<ConfigFile> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        Ok(ConfigFile::new(path.to_path_buf(), format, ConfigScope::Project))
    }

    fn file_provider(config_file: &ConfigFile) -> Figment {
        let path = &config_file.path;
        match config_file.format {
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn isolated_provider(temp_dir: &TempDir) -> ConfigProvider {
        let project = temp_dir.path().join("project");
        let global = temp_dir.path().join("global");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(&global).unwrap();
        ConfigProvider::with_discovery(FileDiscovery::with_directories(
            Some(project),
            Some(global),
        ))
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        let temp_dir = TempDir::new().unwrap();
        let config = isolated_provider(&temp_dir)
            .load(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(config, HelmfileMcpConfig::default());
    }

    #[test]
    #[serial]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let provider = isolated_provider(&temp_dir);
        fs::write(
            temp_dir.path().join("global/config.toml"),
            "default_timeout_seconds = 100\nmax_timeout_seconds = 200\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("project/config.yaml"),
            "default_timeout_seconds: 150\n",
        )
        .unwrap();

        let config = provider.load(&ConfigOverrides::default()).unwrap();
        assert_eq!(config.default_timeout_seconds, 150);
        assert_eq!(config.max_timeout_seconds, 200);
    }

    #[test]
    #[serial]
    fn test_explicit_file_overrides_discovered() {
        let temp_dir = TempDir::new().unwrap();
        let provider = isolated_provider(&temp_dir);
        fs::write(
            temp_dir.path().join("project/config.toml"),
            "helmfile_binary = \"from-project\"\n",
        )
        .unwrap();
        let explicit = temp_dir.path().join("custom.json");
        fs::write(&explicit, r#"{"helmfile_binary": "from-explicit"}"#).unwrap();

        let overrides = ConfigOverrides {
            config_file: Some(explicit),
            ..Default::default()
        };
        let config = provider.load(&overrides).unwrap();
        assert_eq!(config.helmfile_binary, "from-explicit");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            config_file: Some(temp_dir.path().join("nope.toml")),
            ..Default::default()
        };
        let result = isolated_provider(&temp_dir).load(&overrides);
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    #[serial]
    fn test_unsupported_explicit_format_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("config.ini");
        fs::write(&explicit, "x=1").unwrap();
        let overrides = ConfigOverrides {
            config_file: Some(explicit),
            ..Default::default()
        };
        let result = isolated_provider(&temp_dir).load(&overrides);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    #[serial]
    fn test_env_overrides_files_and_cli_overrides_env() {
        let temp_dir = TempDir::new().unwrap();
        let provider = isolated_provider(&temp_dir);
        fs::write(
            temp_dir.path().join("project/config.toml"),
            "helmfile_binary = \"from-file\"\n[policy]\nallowed_environments = [\"dev\"]\n",
        )
        .unwrap();

        std::env::set_var("HELMFILE_MCP_HELMFILE_BINARY", "from-env");
        std::env::set_var("HELMFILE_MCP_POLICY__ALLOWED_ENVIRONMENTS", "[staging]");
        std::env::set_var("HELMFILE_MCP_TERMINATION_GRACE_SECONDS", "2");

        let from_env = provider.load(&ConfigOverrides::default());
        let from_cli = provider.load(&ConfigOverrides {
            helmfile_binary: Some("from-cli".to_string()),
            allowed_environments: vec!["prod".to_string()],
            ..Default::default()
        });

        std::env::remove_var("HELMFILE_MCP_HELMFILE_BINARY");
        std::env::remove_var("HELMFILE_MCP_POLICY__ALLOWED_ENVIRONMENTS");
        std::env::remove_var("HELMFILE_MCP_TERMINATION_GRACE_SECONDS");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.helmfile_binary, "from-env");
        assert_eq!(
            from_env.policy.allowed_environments,
            Some(vec!["staging".to_string()])
        );
        assert_eq!(from_env.termination_grace_seconds, 2);

        let from_cli = from_cli.unwrap();
        assert_eq!(from_cli.helmfile_binary, "from-cli");
        assert_eq!(
            from_cli.policy.allowed_environments,
            Some(vec!["prod".to_string()])
        );
    }

    #[test]
    #[serial]
    fn test_invalid_merged_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let provider = isolated_provider(&temp_dir);
        fs::write(
            temp_dir.path().join("project/config.yaml"),
            "default_timeout_seconds: 5000\n",
        )
        .unwrap();

        let result = provider.load(&ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let provider = isolated_provider(&temp_dir);
        fs::write(
            temp_dir.path().join("project/config.toml"),
            "default_timeout_seconds = \"soon\"\n",
        )
        .unwrap();

        let result = provider.load(&ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
