//! Gazette API server binary.
//!
//! Serves editions over HTTP from the shared SQLite store.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gazette_core::config::Config;
use gazette_core::reader::Reader;
use gazette_core::storage;
use gazette_core::wordbank::WordBank;
use gazette_server::state::AppState;

/// Gazette API server — serves the reader-facing edition API.
#[derive(Parser)]
#[command(name = "gazette-server", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Host address to bind to. Use 0.0.0.0 for LAN access.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Path to the gazette configuration file.
    #[arg(long, default_value = "~/.gazette/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(Some(std::path::Path::new(&cli.config)))?;

    let pool = storage::init_db(&config.storage.db_path).await?;
    let words = Arc::new(WordBank::new(pool.clone()));
    let reader = Reader::new(pool.clone(), words);

    let state = Arc::new(AppState { db: pool, reader });
    let router = gazette_server::build_router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "gazette server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
