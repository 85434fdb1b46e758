//! The pipeline runner: fetch, subvert, and tournament loops in one process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use gazette_core::automation::{FetchLoop, SubvertLoop, TournamentLoop};
use gazette_core::config::Config;
use gazette_core::llm::ModelGateway;
use gazette_core::news::NewsClient;
use gazette_core::secrets::{EnvSecrets, SecretStore};
use gazette_core::storage;
use gazette_core::storage::llm_usage::StorageUsageSink;
use gazette_core::subvert::SubvertWorker;
use gazette_core::tournament::TournamentEngine;
use gazette_core::wordbank::WordBank;

/// Start every loop and block until ctrl-c.
pub async fn run(config: &Config) -> Result<()> {
    let secrets = Arc::new(EnvSecrets::new());
    let api_key = secrets
        .get(&config.news.api_key_secret)
        .context("news API key not configured")?;

    let pool = storage::init_db(&config.storage.db_path).await?;
    let words = Arc::new(WordBank::new(pool.clone()));
    words.load().await?;

    let gateway = Arc::new(
        ModelGateway::new(config.llm.clone(), secrets)
            .with_usage_sink(Arc::new(StorageUsageSink::new(pool.clone()))),
    );

    let client = Arc::new(NewsClient::new(
        config.news.endpoint.clone(),
        api_key,
        config.news.country.clone(),
        config.news.language.clone(),
    ));

    let fetch_loop = FetchLoop::new(pool.clone(), client, config.news.clone());
    let subvert_loop = SubvertLoop::new(
        pool.clone(),
        SubvertWorker::new(pool.clone(), gateway.clone(), words.clone()),
        &config.intervals,
    );
    let tournament_loop = TournamentLoop::new(
        pool.clone(),
        TournamentEngine::new(pool.clone(), gateway, config.tournament.clone()),
        &config.intervals,
    );

    let cancel = CancellationToken::new();
    let intervals = config.intervals.clone();

    let fetch_cancel = cancel.clone();
    let fetch_task = tokio::spawn(async move {
        fetch_loop
            .run(fetch_cancel, Duration::from_secs(intervals.fetch_secs))
            .await;
    });
    let subvert_cancel = cancel.clone();
    let subvert_secs = config.intervals.subvert_poll_secs;
    let subvert_task = tokio::spawn(async move {
        subvert_loop
            .run(subvert_cancel, Duration::from_secs(subvert_secs))
            .await;
    });
    let tournament_cancel = cancel.clone();
    let tournament_secs = config.intervals.tournament_poll_secs;
    let tournament_task = tokio::spawn(async move {
        tournament_loop
            .run(tournament_cancel, Duration::from_secs(tournament_secs))
            .await;
    });

    tracing::info!("pipeline running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();

    let _ = tokio::join!(fetch_task, subvert_task, tournament_task);
    Ok(())
}
