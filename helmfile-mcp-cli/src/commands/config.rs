use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use helmfile_mcp_config::HelmfileMcpConfig;

/// Print the effective configuration as YAML
pub fn handle_command(config: &HelmfileMcpConfig) -> i32 {
    match serde_yaml_ng::to_string(config) {
        Ok(yaml) => {
            print!("{yaml}");
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render configuration: {e}");
            EXIT_ERROR
        }
    }
}
