//! The reader selector: assembles the four-story front page an edition
//! serves, plus the ranked top-headline list.

mod selector;

pub use selector::{is_ai_apology, select_headlines, sort_by_rank, FRONT_PAGE_SLOTS};

use crate::error::StorageError;
use crate::model::{day_before, editorial_today, Headline};
use crate::storage::{headlines, stories, DbPool};
use crate::wordbank::WordBank;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Most entries in the edition's top-headline list.
const TOP_HEADLINES_LIMIT: usize = 64;

/// Chance a served headline also reveals the real one.
const SHOW_ORIGINAL_P: f64 = 0.25;

/// A complete edition response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Edition {
    /// The randomly composed masthead.
    pub paper_name: String,
    /// The four front-page stories.
    pub stories: Vec<FrontPageStory>,
    /// The day's ranked list, best first.
    pub top_headlines: Vec<TopHeadline>,
}

/// One selected headline joined with its story.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FrontPageStory {
    /// Selected headline id.
    pub headline_id: String,
    /// The satirical text being served.
    pub headline: String,
    /// The real headline it subverts.
    pub original_headline: String,
    /// Whether the UI should reveal the original.
    pub show_original: bool,
    /// Day key of the story.
    pub year_month_day: String,
    /// The owning story id.
    pub story_id: String,
    /// Story image.
    pub image_url: String,
    /// Link to the real article.
    pub url: String,
    /// Feed source id.
    pub source: Option<String>,
    /// Story description.
    pub description: String,
    /// Publish timestamp.
    pub published_at: String,
    /// Other headlines of the same story, for cross-linking.
    pub siblings: Vec<SiblingHeadline>,
}

/// A sibling headline of a served story.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiblingHeadline {
    /// Headline id.
    pub headline_id: String,
    /// Headline text.
    pub headline: String,
}

/// One entry of the ranked top list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopHeadline {
    /// Headline id.
    pub headline_id: String,
    /// Headline text.
    pub headline: String,
    /// Day key.
    pub year_month_day: String,
    /// Owning story.
    pub story_id: String,
    /// Daily rank, when assigned.
    pub rank: Option<i64>,
    /// Cross-day rank, when assigned.
    pub cross_day_rank: Option<i64>,
}

impl TopHeadline {
    fn from_headline(h: &Headline) -> Self {
        Self {
            headline_id: h.headline_id.clone(),
            headline: h.headline.clone(),
            year_month_day: h.year_month_day.clone(),
            story_id: h.story_id.clone(),
            rank: h.rank,
            cross_day_rank: h.cross_day_rank,
        }
    }
}

/// Assembles editions from the store.
pub struct Reader {
    pool: DbPool,
    words: Arc<WordBank>,
}

impl Reader {
    /// Create a reader over the shared resources.
    pub fn new(pool: DbPool, words: Arc<WordBank>) -> Self {
        Self { pool, words }
    }

    /// Assemble an edition.
    ///
    /// A specific `day` scopes to that day (with yesterday as filler when
    /// it holds fewer than four headlines); no day means the rolling
    /// three-day "today" view, ranked by cross-day rank when present.
    /// The reader never hard-fails on a missing ranking — unranked
    /// headlines sort last and insertion order breaks ties.
    pub async fn select(
        &self,
        day: Option<&str>,
        slug: Option<&str>,
        query: Option<&str>,
        seen: &HashSet<String>,
    ) -> Result<Edition, StorageError> {
        let (mut candidates, use_cross_day) = self.scope_headlines(day).await?;
        candidates.retain(|h| !is_ai_apology(&h.headline));
        sort_by_rank(&mut candidates, use_cross_day);

        let picks = select_headlines(&candidates, slug, query, seen, &mut rand::thread_rng());

        let mut front_page = Vec::with_capacity(picks.len());
        for pick in picks {
            let Some(story) =
                stories::get_story(&self.pool, &pick.year_month_day, &pick.story_id).await?
            else {
                tracing::warn!(
                    day = %pick.year_month_day,
                    story_id = %pick.story_id,
                    "selected headline has no story, dropping",
                );
                continue;
            };

            let siblings = headlines::headlines_for_story(
                &self.pool,
                &pick.year_month_day,
                &pick.story_id,
            )
            .await?
            .into_iter()
            .filter(|h| h.headline_id != pick.headline_id)
            .map(|h| SiblingHeadline {
                headline_id: h.headline_id,
                headline: h.headline,
            })
            .collect();

            let pinned = slug == Some(pick.headline_id.as_str());
            let show_original = !pinned && rand::thread_rng().gen_bool(SHOW_ORIGINAL_P);

            front_page.push(FrontPageStory {
                headline_id: pick.headline_id.clone(),
                headline: pick.headline.clone(),
                original_headline: pick.original_headline.clone(),
                show_original,
                year_month_day: story.year_month_day.clone(),
                story_id: story.story_id.clone(),
                image_url: story.image_url.clone(),
                url: story.url.clone(),
                source: story.source.clone(),
                description: story.description.clone(),
                published_at: story.published_at.clone(),
                siblings,
            });
        }

        let top_headlines = candidates
            .iter()
            .take(TOP_HEADLINES_LIMIT)
            .map(TopHeadline::from_headline)
            .collect();

        Ok(Edition {
            paper_name: self.words.paper_name().await?,
            stories: front_page,
            top_headlines,
        })
    }

    /// Collect the candidate headlines for the requested scope and decide
    /// which rank field orders them.
    async fn scope_headlines(
        &self,
        day: Option<&str>,
    ) -> Result<(Vec<Headline>, bool), StorageError> {
        match day {
            Some(day) => {
                let mut candidates = headlines::headlines_for_day(&self.pool, day).await?;
                if candidates.len() < FRONT_PAGE_SLOTS {
                    if let Some(yesterday) = day_before(day, 1) {
                        candidates
                            .extend(headlines::headlines_for_day(&self.pool, &yesterday).await?);
                    }
                }
                Ok((candidates, false))
            }
            None => {
                let today = editorial_today();
                let mut candidates = Vec::new();
                for days_back in 0..=2 {
                    if let Some(scoped_day) = day_before(&today, days_back) {
                        candidates
                            .extend(headlines::headlines_for_day(&self.pool, &scoped_day).await?);
                    }
                }
                let use_cross_day = candidates.iter().any(|h| h.cross_day_rank.is_some());
                Ok((candidates, use_cross_day))
            }
        }
    }
}
