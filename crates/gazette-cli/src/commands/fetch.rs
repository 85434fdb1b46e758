//! The topic-fetch tool: pull stories for a query into the pipeline.

use anyhow::{Context, Result};
use gazette_core::config::Config;
use gazette_core::news::{fetch_topic, NewsClient};
use gazette_core::secrets::{EnvSecrets, SecretStore};
use gazette_core::storage;

/// Fetch stories matching `query` and save them. The subvert loop picks
/// them up from the change outbox automatically.
pub async fn run(config: &Config, query: &str, max: u32, priority: bool) -> Result<()> {
    println!("Searching for: {query}");
    println!("Max stories: {max}");
    println!("Priority sources only: {priority}");
    println!();

    let secrets = EnvSecrets::new();
    let api_key = secrets
        .get(&config.news.api_key_secret)
        .context("news API key not configured")?;

    let pool = storage::init_db(&config.storage.db_path).await?;
    let client = NewsClient::new(
        config.news.endpoint.clone(),
        api_key,
        config.news.country.clone(),
        config.news.language.clone(),
    );

    let summary = fetch_topic(&pool, &client, &config.news, query, max, priority).await?;

    println!();
    println!(
        "Done! Saved {}/{} stories for '{query}'",
        summary.saved, summary.processed
    );
    if summary.saved > 0 {
        println!("Stories will be processed by the subvert pipeline automatically.");
    }
    Ok(())
}
