use std::process;
use std::sync::Arc;

mod cli;
mod commands;
mod exit_codes;
mod logging;

use anyhow::Context;
use cli::{Cli, Commands};
use exit_codes::EXIT_ERROR;
use helmfile_mcp_config::{load_configuration, ConfigOverrides, HelmfileMcpConfig};
use helmfile_mcp_tools::{HelmfileTools, SyncRequest};

fn load_config(cli: &Cli) -> anyhow::Result<Arc<HelmfileMcpConfig>> {
    let overrides = ConfigOverrides {
        config_file: cli.global.config.clone(),
        helmfile_binary: cli.global.helmfile_binary.clone(),
        allowed_environments: cli.global.allowed_environments.clone(),
    };

    let config = load_configuration(&overrides).context("Failed to load configuration")?;
    Ok(Arc::new(config))
}

fn create_tools(config: Arc<HelmfileMcpConfig>) -> anyhow::Result<HelmfileTools> {
    HelmfileTools::new(config).context("Failed to compile the command policy")
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli)?;

    let exit_code = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle_command(config).await,
        Commands::Config => commands::config::handle_command(&config),
        Commands::Exec {
            command,
            timeout,
            confirm,
            working_directory,
        } => {
            let tools = create_tools(config)?;
            commands::exec::handle_command(&tools, command, timeout, confirm, working_directory)
                .await
        }
        Commands::Sync {
            helmfile_path,
            namespace,
            environment,
            timeout,
        } => {
            let tools = create_tools(config)?;
            let request = SyncRequest {
                helmfile_path,
                namespace,
                environment,
                timeout_seconds: timeout,
            };
            commands::sync::handle_command(&tools, request).await
        }
    };
    Ok(exit_code)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let level = logging::log_level(cli.global.debug, cli.global.quiet);
    logging::configure_logging(level, cli.global.log_file.as_deref());
    tracing::debug!("Running {:?} (serve: {})", cli.selected_command(), cli.is_serve());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };
    process::exit(exit_code);
}
