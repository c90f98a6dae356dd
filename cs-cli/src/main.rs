//! chatstack CLI - run the self-hosted chat stack from the terminal.
//!
//! Starts, stops and inspects the four-service stack (chat app, object
//! store, identity provider, database) through the container orchestration
//! tool, and walks the operator through first-run configuration.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing::{debug, info};

use cs_core::config::{ConfigHandle, StackConfig};
use cs_core::constants;
use cs_core::error::{CsResult, StackError};
use cs_core::logging;

/// chatstack - self-hosted chat stack launcher.
#[derive(Parser)]
#[command(
    name = "chatstack",
    version,
    about = "Start, stop and configure the self-hosted chat stack",
    long_about = "Runs the chat application together with its object store, identity provider\n\
                  and database as one multi-container project. Data lives in named volumes\n\
                  that survive `down`; only `purge` deletes them."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Directory holding the service definition and environment file
    /// (overrides config; defaults to the current directory).
    #[arg(short = 'C', long, global = true)]
    project_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start all services, creating the data volumes if absent.
    Up,
    /// Stop all services. Data volumes are kept.
    Down,
    /// Stop then start the whole stack (after editing the environment file).
    Restart,
    /// Show containers, data volumes and endpoint reachability.
    Status {
        /// Wait until the chat endpoint answers (or the configured deadline passes).
        #[arg(short, long)]
        wait: bool,
    },
    /// Show container logs.
    Logs {
        /// Only this service.
        service: Option<String>,
        /// Follow log output in real-time.
        #[arg(short = 'F', long)]
        follow: bool,
        /// Number of lines to show from the end of each log.
        #[arg(short = 'n', long)]
        tail: Option<u32>,
    },
    /// Stop all services and DELETE the data volumes.
    Purge {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Print or write the generated service definition.
    Render {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the environment file with a generated database password.
    Init {
        /// Overwrite an existing environment file (and config file with --write-config).
        #[arg(long)]
        force: bool,
        /// Also write the effective configuration to the config file for editing.
        #[arg(long)]
        write_config: bool,
    },
    /// First-run configuration steps.
    Setup {
        #[command(subcommand)]
        action: commands::setup::SetupAction,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> CsResult<()> {
    // Load configuration
    let config_path = match cli.config.as_deref() {
        Some(path) => PathBuf::from(path),
        None => StackConfig::default_config_path()?,
    };
    let creating_config = matches!(cli.command, Commands::Init { write_config: true, .. });
    let mut config = if config_path.exists() {
        StackConfig::load_from_file(&config_path)?
    } else if cli.config.is_some() && !creating_config {
        return Err(StackError::MissingConfig(format!(
            "config file {} not found",
            config_path.display()
        )));
    } else {
        StackConfig::default()
    };
    if let Some(dir) = cli.project_dir {
        config.project.directory = dir;
    }

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let guard = match config.effective_log_dir() {
        Ok(dir) => logging::init_logging(&log_level, &dir, config.logging.json_output).ok(),
        Err(_) => None,
    };
    if guard.is_none() {
        logging::init_console_logging(&log_level);
    }

    info!("{} v{}", constants::APP_NAME, constants::APP_VERSION);
    debug!("project directory: {}", config.project_dir()?.display());

    let config_handle = ConfigHandle::new(config);

    // Dispatch to command handlers
    match cli.command {
        Commands::Up => commands::up::run(config_handle, cli.format).await,
        Commands::Down => commands::down::run(config_handle, cli.format).await,
        Commands::Restart => commands::restart::run(config_handle, cli.format).await,
        Commands::Status { wait } => commands::status::run(config_handle, wait, cli.format).await,
        Commands::Logs { service, follow, tail } => {
            commands::logs::run(config_handle, service, follow, tail).await
        }
        Commands::Purge { yes } => commands::purge::run(config_handle, yes, cli.format).await,
        Commands::Render { output } => commands::render::run(config_handle, output, cli.format).await,
        Commands::Init { force, write_config } => {
            let config_file = write_config.then_some(config_path);
            commands::init::run(config_handle, force, config_file, cli.format).await
        }
        Commands::Setup { action } => commands::setup::run(config_handle, action, cli.format).await,
    }
}
