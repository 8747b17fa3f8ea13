mod commands;
mod local;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use calsync_core::config::SyncConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Mirror busy time between two calendars over email")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/calsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send local busy time and mirror the remote busy time
    Run {
        /// Skip the send branch
        #[arg(long)]
        no_send: bool,

        /// Skip the receive branch
        #[arg(long)]
        no_receive: bool,
    },
    /// Create the sync folder and folder rule if missing
    Setup,
    /// Show what the next run would do
    Status {
        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            no_send,
            no_receive,
        } => {
            if !commands::run::run(&config, no_send, no_receive)? {
                anyhow::bail!("Sync run finished with errors");
            }
            Ok(())
        }
        Commands::Setup => commands::setup::run(&config),
        Commands::Status { json } => commands::status::run(&config, json),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "calsync=debug,calsync_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
