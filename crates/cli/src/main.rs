//! clawloop CLI: the main entry point.
//!
//! Usage:
//! - `clawloop`             : interactive session
//! - `clawloop -p "<text>"` : one turn, then exit
//! - `clawloop config show` : print the effective configuration
//! - `clawloop config path` : print the config file location
//! - `clawloop doctor`      : diagnose setup

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "clawloop",
    about = "clawloop — a tool-calling coding agent for the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (default: ~/.clawloop/config.toml)
    #[arg(short, long, global = true, env = "CLAWLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Send a single prompt instead of entering interactive mode
    #[arg(short, long)]
    prompt: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup: config, API key, endpoint, tools, instructions
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so streamed answers on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        None => commands::agent::run(config_path, cli.prompt).await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
        },
        Some(Commands::Doctor) => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
