//! Gazette command-line interface.
//!
//! `gazette fetch` pushes topic stories into the pipeline; `gazette run`
//! starts the full set of automation loops until interrupted.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Gazette — satirical newspaper pipeline.
#[derive(Parser)]
#[command(name = "gazette", version, about)]
struct Cli {
    /// Path to the gazette configuration file.
    #[arg(long, global = true, default_value = "~/.gazette/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch articles for a topic and add them to the pipeline.
    Fetch {
        /// Search term, e.g. "barack obama" or "climate summit".
        query: String,

        /// Maximum stories to save.
        #[arg(long, default_value_t = 3)]
        max: u32,

        /// Include lower-tier sources.
        #[arg(long)]
        no_priority: bool,
    },

    /// Run the fetch, subvert, and tournament loops until ctrl-c.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config_path = std::path::PathBuf::from(&cli.config);
    let config = gazette_core::config::Config::load(Some(&config_path))?;

    match cli.command {
        Command::Fetch {
            query,
            max,
            no_priority,
        } => commands::fetch::run(&config, &query, max, !no_priority).await,
        Command::Run => commands::run::run(&config).await,
    }
}
