use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "helmfile-mcp")]
#[command(version)]
#[command(about = "An MCP server for running helmfile commands")]
#[command(long_about = "
helmfile-mcp exposes helmfile to MCP clients over stdio. Commands are checked
against a guardrail policy before they run: destructive verbs need explicit
confirmation and environments can be restricted to an allowlist.

Without a subcommand the stdio MCP server is started.

Example:
  helmfile-mcp                                  # serve over stdio
  helmfile-mcp exec 'list | grep web'           # run one command
  helmfile-mcp exec 'destroy -e dev' --confirm  # destructive verbs need --confirm
  helmfile-mcp sync helmfile.yaml -n web        # sync releases
  helmfile-mcp config                           # show effective configuration
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file merged after the discovered ones
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restrict environments to this list (repeatable)
    #[arg(long = "allowed-environment", global = true, value_name = "ENV")]
    pub allowed_environments: Vec<String>,

    /// Program used to run helmfile
    #[arg(long, global = true, value_name = "PATH")]
    pub helmfile_binary: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server over stdio (default)
    Serve,

    /// Run one helmfile command and print the response as JSON
    #[command(long_about = "
Runs a helmfile command through the same validation and execution pipeline
the MCP server uses, then prints the JSON response. The exit code is 0 when
the response status is success and 1 otherwise.

The leading 'helmfile' may be omitted. Stages separated by '|' run as a pipe
chain.
")]
    Exec {
        /// Command line, e.g. 'diff -e staging'
        command: String,

        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Confirm a destructive verb (apply, destroy, delete)
        #[arg(long)]
        confirm: bool,

        /// Directory to run the command in
        #[arg(short = 'C', long, value_name = "DIR")]
        working_directory: Option<PathBuf>,
    },

    /// Sync the releases of a helmfile and print the response as JSON
    Sync {
        /// Path to the helmfile
        helmfile_path: String,

        /// Limit the sync to a namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Helmfile environment
        #[arg(short, long)]
        environment: Option<String>,

        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Print the effective configuration as YAML
    Config,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand, defaulting to serve
    pub fn selected_command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }

    pub fn is_serve(&self) -> bool {
        matches!(self.selected_command(), Commands::Serve)
    }
}
