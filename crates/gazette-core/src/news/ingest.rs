//! The story ingestor: scheduled category fetches and the topic fetch tool.

use super::client::{NewsClient, RawStory};
use crate::config::NewsConfig;
use crate::error::NewsError;
use crate::model::{day_key_from_published, new_record_id, Story};
use crate::storage::{stories, DbPool};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Summary of one fetch run.
#[derive(Debug, Default)]
pub struct FetchSummary {
    /// Stories seen across all pages.
    pub processed: u32,
    /// Stories actually written.
    pub saved: u32,
    /// `(category, saved)` per slot, wildcard last.
    pub per_category: Vec<(String, u32)>,
}

/// Run one scheduled ingest: every configured category plus a wildcard
/// slot with no category or priority filter, for diversity.
///
/// A category that fails upstream is logged and skipped; the other
/// categories still run. The summary is the run's return value.
pub async fn run_fetch(
    pool: &DbPool,
    client: &NewsClient,
    config: &NewsConfig,
) -> Result<FetchSummary, NewsError> {
    let mut summary = FetchSummary::default();

    let mut slots: Vec<(String, Option<String>, bool)> = config
        .categories
        .iter()
        .map(|c| (c.clone(), Some(c.clone()), true))
        .collect();
    slots.push(("wildcard".to_string(), None, false));

    for (label, category, priority) in slots {
        match fetch_category_slot(pool, client, config, &label, category.as_deref(), priority)
            .await
        {
            Ok((processed, saved)) => {
                summary.processed += processed;
                summary.saved += saved;
                summary.per_category.push((label, saved));
            }
            Err(e) => {
                tracing::warn!(category = %label, error = %e, "category fetch failed");
                summary.per_category.push((label, 0));
            }
        }
    }

    tracing::info!(
        processed = summary.processed,
        saved = summary.saved,
        "fetch run complete",
    );
    Ok(summary)
}

/// Fetch stories matching a topic query and feed them into the pipeline.
/// Backs the CLI tool; upstream errors propagate.
pub async fn fetch_topic(
    pool: &DbPool,
    client: &NewsClient,
    config: &NewsConfig,
    query: &str,
    max: u32,
    priority: bool,
) -> Result<FetchSummary, NewsError> {
    let mut summary = FetchSummary::default();
    let fetch_category = format!("manual:{query}");
    let mut page_token: Option<String> = None;

    for _ in 0..config.max_pages_per_category {
        let page = client
            .fetch_by_query(query, priority, page_token.as_deref())
            .await?;

        for raw in &page.results {
            summary.processed += 1;
            if save_story(pool, raw, &fetch_category).await? {
                summary.saved += 1;
            }
            if summary.saved >= max {
                break;
            }
        }

        if summary.saved >= max || page.next_page.is_none() {
            break;
        }
        page_token = page.next_page;
    }

    summary.per_category.push((fetch_category, summary.saved));
    Ok(summary)
}

async fn fetch_category_slot(
    pool: &DbPool,
    client: &NewsClient,
    config: &NewsConfig,
    label: &str,
    category: Option<&str>,
    priority: bool,
) -> Result<(u32, u32), NewsError> {
    let mut processed = 0;
    let mut saved = 0;
    let mut page_token: Option<String> = None;

    for _ in 0..config.max_pages_per_category {
        let page = client
            .fetch_by_category(category, priority, page_token.as_deref())
            .await?;

        for raw in &page.results {
            processed += 1;
            tracing::debug!(
                category = %label,
                source = raw.source_id.as_deref().unwrap_or("unknown"),
                title = %raw.title,
                "processing story",
            );
            if save_story(pool, raw, label).await? {
                saved += 1;
            }
            if saved >= config.max_saved_per_category {
                break;
            }
        }

        if saved >= config.max_saved_per_category || page.next_page.is_none() {
            break;
        }
        page_token = page.next_page;
    }

    Ok((processed, saved))
}

/// Convert and write one raw story. Returns whether it was saved; stories
/// without an image and `(day, title)` conflicts are skipped.
async fn save_story(pool: &DbPool, raw: &RawStory, fetch_category: &str) -> Result<bool, NewsError> {
    let Some(image_url) = raw.image_url.as_deref().filter(|u| !u.is_empty()) else {
        tracing::debug!(title = %raw.title, "skipped story with no image");
        return Ok(false);
    };

    let Some(published) = parse_pub_date(&raw.pub_date) else {
        tracing::debug!(title = %raw.title, pub_date = %raw.pub_date, "skipped story with bad pubDate");
        return Ok(false);
    };

    let story = Story {
        year_month_day: day_key_from_published(&published),
        story_id: new_record_id(),
        title: raw.title.clone(),
        description: raw.description.clone().unwrap_or_default(),
        published_at: raw.pub_date.clone(),
        image_url: image_url.to_string(),
        url: raw.link.clone().unwrap_or_default(),
        source: raw.source_id.clone(),
        fetch_category: Some(fetch_category.to_string()),
        keywords: raw
            .keywords
            .as_ref()
            .and_then(|k| serde_json::to_string(k).ok()),
        language: raw.language.clone(),
        country: raw.country.as_ref().and_then(|c| c.first().cloned()),
        retrieved_at: Utc::now().to_rfc3339(),
    };

    let saved = stories::insert_story(pool, &story).await?;
    if !saved {
        tracing::debug!(title = %story.title, "skipped story that already exists");
    }
    Ok(saved)
}

/// Parse the feed's publish timestamp: RFC 3339, or the feed's bare
/// `YYYY-MM-DD HH:MM:SS` form (treated as UTC).
fn parse_pub_date(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
