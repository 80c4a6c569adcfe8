//! Configuration file discovery
//!
//! Looks for `config.{toml,yaml,yml,json}` in the global `~/.helmfile-mcp/`
//! directory and the project `./.helmfile-mcp/` directory.

use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Name of the configuration directory in both scopes
pub const CONFIG_DIR_NAME: &str = ".helmfile-mcp";

const CONFIG_FILE_NAMES: [&str; 4] = ["config.toml", "config.yaml", "config.yml", "config.json"];

/// A discovered configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Full path to the configuration file
    pub path: PathBuf,
    /// Detected format of the file
    pub format: ConfigFormat,
    /// Where the file was found
    pub scope: ConfigScope,
}

impl ConfigFile {
    /// Create a new ConfigFile with the given path, format, and scope
    pub fn new(path: PathBuf, format: ConfigFormat, scope: ConfigScope) -> Self {
        Self {
            path,
            format,
            scope,
        }
    }
}

/// Configuration file format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration scope; later scopes override earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigScope {
    /// `~/.helmfile-mcp/`
    Global,
    /// `./.helmfile-mcp/`
    Project,
}

/// File discovery service for finding configuration files
#[derive(Debug, Default)]
pub struct FileDiscovery {
    project_dir: Option<PathBuf>,
    global_dir: Option<PathBuf>,
}

impl FileDiscovery {
    /// Create a discovery that resolves directories at discovery time
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a discovery rooted at explicit directories
    ///
    /// Each directory is searched directly, without appending `.helmfile-mcp`.
    pub fn with_directories(project_dir: Option<PathBuf>, global_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            global_dir,
        }
    }

    /// Discover all configuration files, lowest precedence first
    pub fn discover_all(&self) -> Vec<ConfigFile> {
        let global_dir = self.global_dir.clone().or_else(Self::resolve_global_dir);
        let project_dir = self.project_dir.clone().or_else(Self::resolve_project_dir);

        let mut files = Vec::new();
        if let Some(dir) = global_dir {
            files.extend(self.search_directory(&dir, ConfigScope::Global));
        }
        if let Some(dir) = project_dir {
            files.extend(self.search_directory(&dir, ConfigScope::Project));
        }

        // Stable sort keeps toml < yaml < yml < json inside a scope
        files.sort_by_key(|f| f.scope);

        debug!("Discovered {} configuration files", files.len());
        for file in &files {
            trace!("Found config: {} ({:?})", file.path.display(), file.format);
        }

        files
    }

    fn search_directory(&self, dir: &Path, scope: ConfigScope) -> Vec<ConfigFile> {
        if !dir.exists() {
            trace!("Directory does not exist: {}", dir.display());
            return Vec::new();
        }

        if !dir.is_dir() {
            warn!("Path exists but is not a directory: {}", dir.display());
            return Vec::new();
        }

        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .filter(|candidate| candidate.is_file())
            .filter_map(|candidate| {
                let format = ConfigFormat::from_path(&candidate)?;
                Some(ConfigFile::new(candidate, format, scope))
            })
            .collect()
    }

    fn resolve_project_dir() -> Option<PathBuf> {
        let dir = std::env::current_dir().ok()?.join(CONFIG_DIR_NAME);
        dir.is_dir().then_some(dir)
    }

    fn resolve_global_dir() -> Option<PathBuf> {
        let dir = dirs::home_dir()?.join(CONFIG_DIR_NAME);
        dir.is_dir().then_some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("YML"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("ini"), None);
    }

    #[test]
    fn test_config_format_from_path_without_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("/tmp/config")), None);
    }

    #[test]
    fn test_scope_ordering() {
        assert!(ConfigScope::Project > ConfigScope::Global);
    }

    #[test]
    fn test_search_directory_ignores_unknown_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.yaml"), "helmfile_binary: hf").unwrap();
        fs::write(temp_dir.path().join("other.toml"), "x = 1").unwrap();

        let discovery = FileDiscovery::new();
        let files = discovery.search_directory(temp_dir.path(), ConfigScope::Project);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].format, ConfigFormat::Yaml);
        assert_eq!(files[0].scope, ConfigScope::Project);
    }

    #[test]
    fn test_search_directory_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let discovery = FileDiscovery::new();
        let files =
            discovery.search_directory(&temp_dir.path().join("missing"), ConfigScope::Global);
        assert!(files.is_empty());
    }

    #[test]
    fn test_global_files_come_before_project_files() {
        let temp_dir = TempDir::new().unwrap();
        let global_dir = temp_dir.path().join("global");
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&global_dir).unwrap();
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "max_timeout_seconds = 10").unwrap();
        fs::write(global_dir.join("config.json"), "{}").unwrap();

        let discovery = FileDiscovery::with_directories(Some(project_dir), Some(global_dir));
        let files = discovery.discover_all();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].scope, ConfigScope::Global);
        assert_eq!(files[1].scope, ConfigScope::Project);
    }
}
