//! The subvert worker: turns fresh stories into satirical headline candidates.
//!
//! Consumes story change events and runs the two-stage generation
//! pipeline per story: angle brainstorming, then per-angle headline
//! drafting. Stage transitions are all-or-nothing per story; one story
//! failing never poisons the rest of the batch.

mod parser;
mod prompts;

pub use prompts::{BRAINSTORM_SYSTEM, GENERATE_SYSTEM};

use crate::error::SubvertError;
use crate::llm::{ModelGateway, Stage};
use crate::model::{ChangeEvent, EventKind, Headline, Story};
use crate::storage::{headlines, stories, DbPool};
use crate::wordbank::WordBank;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Most angles kept from stage 1.
const MAX_ANGLES: usize = 5;

/// Most headlines kept per angle from stage 2.
const MAX_HEADLINES_PER_ANGLE: usize = 4;

/// Random word-bank words offered as stage-1 inspiration.
const INSPIRATION_WORDS: usize = 8;

/// A comedic strategy chosen for a story before drafting headlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngleSpec {
    /// Short slug naming the strategy.
    pub angle_name: String,
    /// One-sentence setup a writer can run with.
    pub setup: String,
    /// Words the drafts should play on.
    pub keywords: Vec<String>,
}

/// Outcome of processing one event batch.
#[derive(Debug, Default)]
pub struct SubvertSummary {
    /// Distinct stories seen in the batch.
    pub stories_seen: usize,
    /// Stories skipped by the dedup guard.
    pub stories_skipped: usize,
    /// Stories that produced headlines.
    pub stories_subverted: usize,
    /// Headlines written in total.
    pub headlines_written: usize,
    /// Stories that failed a stage.
    pub failed: usize,
}

/// The subvert worker. Cheap to clone; one clone runs per story task.
#[derive(Clone)]
pub struct SubvertWorker {
    pool: DbPool,
    gateway: Arc<ModelGateway>,
    words: Arc<WordBank>,
}

impl SubvertWorker {
    /// Create a worker over the shared resources.
    pub fn new(pool: DbPool, gateway: Arc<ModelGateway>, words: Arc<WordBank>) -> Self {
        Self { pool, gateway, words }
    }

    /// Process one batch of story change events, one concurrent task per
    /// distinct story. Remove events are ignored; replays are caught by
    /// the dedup guard.
    pub async fn process_events(&self, events: &[ChangeEvent]) -> SubvertSummary {
        let mut summary = SubvertSummary::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut tasks = JoinSet::new();

        for event in events {
            if event.event == EventKind::Remove {
                continue;
            }
            let key = (event.year_month_day.clone(), event.record_id.clone());
            if !seen.insert(key.clone()) {
                continue;
            }
            let worker = self.clone();
            tasks.spawn(async move { worker.process_story(&key.0, &key.1).await });
        }

        summary.stories_seen = seen.len();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(written))) => {
                    summary.stories_subverted += 1;
                    summary.headlines_written += written;
                }
                Ok(Ok(None)) => summary.stories_skipped += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    tracing::warn!(error = %e, "story subversion failed");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(error = %e, "story task panicked");
                }
            }
        }

        tracing::info!(
            seen = summary.stories_seen,
            subverted = summary.stories_subverted,
            skipped = summary.stories_skipped,
            headlines = summary.headlines_written,
            failed = summary.failed,
            "subvert batch complete",
        );
        summary
    }

    /// Run the full pipeline for one story. Returns the number of
    /// headlines written, or `None` when the dedup guard skipped it.
    async fn process_story(
        &self,
        year_month_day: &str,
        story_id: &str,
    ) -> Result<Option<usize>, SubvertError> {
        // Idempotency guard: at-least-once delivery must not produce a
        // second headline set for the same story.
        if headlines::story_has_headlines(&self.pool, year_month_day, story_id).await? {
            tracing::debug!(day = year_month_day, story_id, "story already subverted");
            return Ok(None);
        }

        let Some(story) = stories::get_story(&self.pool, year_month_day, story_id).await? else {
            tracing::warn!(day = year_month_day, story_id, "event for unknown story");
            return Ok(None);
        };

        let angles = self.brainstorm(&story).await?;
        let mut written = 0;

        for angle in &angles {
            let drafts = self.generate_for_angle(&story, angle).await?;
            for draft in drafts {
                let headline = Headline {
                    year_month_day: story.year_month_day.clone(),
                    headline_id: crate::model::new_record_id(),
                    headline: draft,
                    original_headline: story.title.clone(),
                    original_subverted: None,
                    angle: angle.angle_name.clone(),
                    angle_setup: angle.setup.clone(),
                    story_id: story.story_id.clone(),
                    create_time: Utc::now().to_rfc3339(),
                    rank: None,
                    cross_day_rank: None,
                    tournament_batch: None,
                    survived: None,
                };
                headlines::insert_headline(&self.pool, &headline).await?;
                written += 1;
            }
        }

        tracing::info!(
            day = %story.year_month_day,
            story_id = %story.story_id,
            angles = angles.len(),
            headlines = written,
            "story subverted",
        );
        Ok(Some(written))
    }

    /// Stage 1: brainstorm comedic angles. Parse failures fall back to
    /// the hard-coded angle set; call failures abort the story.
    async fn brainstorm(&self, story: &Story) -> Result<Vec<AngleSpec>, SubvertError> {
        let inspiration = self.words.random_words(INSPIRATION_WORDS).await?;
        let prompt = prompts::brainstorm_prompt(story, &inspiration);

        let response = self
            .gateway
            .call(Stage::Brainstorm, Some(BRAINSTORM_SYSTEM), &prompt, 1024, 1.0)
            .await?;

        let angles = parser::parse_angles(&response.text, MAX_ANGLES);
        if angles.is_empty() {
            tracing::warn!(
                day = %story.year_month_day,
                story_id = %story.story_id,
                "brainstorm unparseable, using fallback angles",
            );
            return Ok(prompts::fallback_angles());
        }
        Ok(angles)
    }

    /// Stage 2: draft headlines for one angle. An unparseable response
    /// contributes nothing; the other angles still run.
    async fn generate_for_angle(
        &self,
        story: &Story,
        angle: &AngleSpec,
    ) -> Result<Vec<String>, SubvertError> {
        let prompt = prompts::generate_prompt(story, angle);
        let response = self
            .gateway
            .call(Stage::Generate, Some(GENERATE_SYSTEM), &prompt, 512, 1.0)
            .await?;

        let drafts = parser::parse_headlines(&response.text, MAX_HEADLINES_PER_ANGLE);
        if drafts.is_empty() {
            tracing::warn!(
                angle = %angle.angle_name,
                story_id = %story.story_id,
                "generate stage unparseable for angle",
            );
        }
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::error::LlmError;
    use crate::llm::{GenerationParams, LlmProvider, LlmResponse, TokenUsage};
    use crate::secrets::StaticSecrets;
    use crate::storage::init_test_db;

    struct CannedProvider {
        text: String,
    }

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                text: self.text.clone(),
                usage: TokenUsage::default(),
                model: "fake".to_string(),
            })
        }
    }

    fn gateway(brainstorm: &str, generate: &str) -> Arc<ModelGateway> {
        let secrets = Arc::new(StaticSecrets::new::<[(&str, &str); 0], _>([]));
        Arc::new(
            ModelGateway::new(LlmConfig::default(), secrets)
                .with_provider(
                    Stage::Brainstorm,
                    Arc::new(CannedProvider {
                        text: brainstorm.to_string(),
                    }),
                )
                .with_provider(
                    Stage::Generate,
                    Arc::new(CannedProvider {
                        text: generate.to_string(),
                    }),
                ),
        )
    }

    async fn seeded_pool() -> DbPool {
        let pool = init_test_db().await.expect("init db");
        let story = Story {
            year_month_day: "20240101".to_string(),
            story_id: "abc01".to_string(),
            title: "Mars Rover Phones Home".to_string(),
            description: "NASA reports contact".to_string(),
            published_at: "2024-01-01T09:00:00Z".to_string(),
            image_url: "https://example.com/a.jpg".to_string(),
            url: String::new(),
            source: None,
            fetch_category: None,
            keywords: None,
            language: None,
            country: None,
            retrieved_at: "2024-01-01T10:00:00Z".to_string(),
        };
        stories::insert_story(&pool, &story).await.unwrap();
        pool
    }

    fn insert_event(day: &str, story_id: &str) -> ChangeEvent {
        ChangeEvent {
            seq: 1,
            event: EventKind::Insert,
            year_month_day: day.to_string(),
            record_id: story_id.to_string(),
        }
    }

    const TWO_ANGLES: &str = r#"[
        {"angle_name": "wordplay", "setup": "rover puns", "keywords": ["rover"]},
        {"angle_name": "absurdist", "setup": "rover is homesick", "keywords": []}
    ]"#;

    const THREE_DRAFTS: &str =
        r#"["Rover Calls Collect", "Red Planet, Red Phone Bill", "NASA Accepts the Charges"]"#;

    #[tokio::test]
    async fn subverts_a_fresh_story() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker = SubvertWorker::new(pool.clone(), gateway(TWO_ANGLES, THREE_DRAFTS), words);

        let summary = worker
            .process_events(&[insert_event("20240101", "abc01")])
            .await;

        assert_eq!(summary.stories_subverted, 1);
        assert_eq!(summary.headlines_written, 6); // 2 angles x 3 drafts

        let written = headlines::headlines_for_story(&pool, "20240101", "abc01")
            .await
            .unwrap();
        assert_eq!(written.len(), 6);
        let ids: HashSet<&str> = written.iter().map(|h| h.headline_id.as_str()).collect();
        assert_eq!(ids.len(), 6, "headline ids are unique");
        assert!(written.iter().all(|h| h.rank.is_none()
            && h.tournament_batch.is_none()
            && h.survived.is_none()));
        assert!(written
            .iter()
            .all(|h| h.original_headline == "Mars Rover Phones Home"));
    }

    #[tokio::test]
    async fn replayed_event_is_idempotent() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker = SubvertWorker::new(pool.clone(), gateway(TWO_ANGLES, THREE_DRAFTS), words);

        worker
            .process_events(&[insert_event("20240101", "abc01")])
            .await;
        let replay = worker
            .process_events(&[insert_event("20240101", "abc01")])
            .await;

        assert_eq!(replay.stories_skipped, 1);
        assert_eq!(replay.headlines_written, 0);
        let written = headlines::headlines_for_story(&pool, "20240101", "abc01")
            .await
            .unwrap();
        assert_eq!(written.len(), 6);
    }

    #[tokio::test]
    async fn duplicate_events_in_one_batch_collapse() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker = SubvertWorker::new(pool.clone(), gateway(TWO_ANGLES, THREE_DRAFTS), words);

        let summary = worker
            .process_events(&[
                insert_event("20240101", "abc01"),
                insert_event("20240101", "abc01"),
            ])
            .await;

        assert_eq!(summary.stories_seen, 1);
        assert_eq!(summary.headlines_written, 6);
    }

    #[tokio::test]
    async fn unparseable_brainstorm_falls_back_to_default_angles() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker =
            SubvertWorker::new(pool.clone(), gateway("banana", THREE_DRAFTS), words);

        let summary = worker
            .process_events(&[insert_event("20240101", "abc01")])
            .await;

        // 3 fallback angles x 3 drafts each.
        assert_eq!(summary.headlines_written, 9);
        let written = headlines::headlines_for_story(&pool, "20240101", "abc01")
            .await
            .unwrap();
        let angles: HashSet<&str> = written.iter().map(|h| h.angle.as_str()).collect();
        assert_eq!(angles, HashSet::from(["wordplay", "rhyme", "absurdist"]));
    }

    #[tokio::test]
    async fn unparseable_generate_contributes_nothing_but_does_not_fail() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker = SubvertWorker::new(pool.clone(), gateway(TWO_ANGLES, "no json"), words);

        let summary = worker
            .process_events(&[insert_event("20240101", "abc01")])
            .await;

        assert_eq!(summary.failed, 0);
        assert_eq!(summary.stories_subverted, 1);
        assert_eq!(summary.headlines_written, 0);
    }

    #[tokio::test]
    async fn event_for_unknown_story_is_skipped() {
        let pool = seeded_pool().await;
        let words = Arc::new(WordBank::new(pool.clone()));
        let worker = SubvertWorker::new(pool.clone(), gateway(TWO_ANGLES, THREE_DRAFTS), words);

        let summary = worker
            .process_events(&[insert_event("20240101", "nope1")])
            .await;
        assert_eq!(summary.stories_skipped, 1);
        assert_eq!(summary.failed, 0);
    }
}
