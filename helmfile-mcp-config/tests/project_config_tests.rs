use helmfile_mcp_config::{load_configuration, ConfigOverrides};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

/// Runs `f` with the process working directory set to `dir`
fn in_directory<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir).unwrap();
    let result = f();
    std::env::set_current_dir(original).unwrap();
    result
}

#[test]
#[serial]
fn test_project_directory_config_is_discovered() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".helmfile-mcp");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.yaml"),
        "policy:\n  allowed_environments:\n    - staging\n    - dev\n",
    )
    .unwrap();

    let config = in_directory(temp_dir.path(), || {
        load_configuration(&ConfigOverrides::default())
    })
    .unwrap();

    assert_eq!(
        config.policy.allowed_environments,
        Some(vec!["staging".to_string(), "dev".to_string()])
    );
}

#[test]
#[serial]
fn test_cli_allowed_environments_replace_file_list() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".helmfile-mcp");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[policy]\nallowed_environments = [\"staging\"]\n",
    )
    .unwrap();

    let overrides = ConfigOverrides {
        allowed_environments: vec!["qa".to_string()],
        ..Default::default()
    };
    let config = in_directory(temp_dir.path(), || load_configuration(&overrides)).unwrap();

    assert_eq!(
        config.policy.allowed_environments,
        Some(vec!["qa".to_string()])
    );
}
