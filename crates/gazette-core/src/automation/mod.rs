//! Automation loops: scheduled fetch, and the two change-event consumers.
//!
//! Each loop owns one concern and runs until cancellation. The event
//! consumers drain their outbox through a named cursor; the cursor only
//! advances after a fully successful iteration, so a crashed or failed
//! batch is redelivered (consumers are idempotent).

use crate::config::{IntervalsConfig, NewsConfig};
use crate::model::editorial_today;
use crate::news::{run_fetch, NewsClient};
use crate::storage::{events, DbPool};
use crate::subvert::SubvertWorker;
use crate::tournament::TournamentEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Consumer name for the subvert worker's story-event cursor.
const SUBVERT_CONSUMER: &str = "subvert";

/// Consumer name for the tournament engine's headline-event cursor.
const TOURNAMENT_CONSUMER: &str = "tournament";

/// Pauses a loop after too many consecutive failures.
struct ConsecutiveErrorTracker {
    consecutive: u32,
    threshold: u32,
    pause: Duration,
}

impl ConsecutiveErrorTracker {
    fn new(threshold: u32, pause: Duration) -> Self {
        Self {
            consecutive: 0,
            threshold,
            pause,
        }
    }

    fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Record a failure; returns an extra pause when the threshold hits.
    fn record_failure(&mut self) -> Option<Duration> {
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            self.consecutive = 0;
            Some(self.pause)
        } else {
            None
        }
    }
}

/// Scheduled story ingest.
pub struct FetchLoop {
    pool: DbPool,
    client: Arc<NewsClient>,
    config: NewsConfig,
}

impl FetchLoop {
    /// Create the loop.
    pub fn new(pool: DbPool, client: Arc<NewsClient>, config: NewsConfig) -> Self {
        Self { pool, client, config }
    }

    /// Run fetch cycles until cancellation.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "fetch loop started");
        let mut errors = ConsecutiveErrorTracker::new(5, Duration::from_secs(1800));

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match run_fetch(&self.pool, &self.client, &self.config).await {
                Ok(summary) => {
                    errors.record_success();
                    tracing::info!(saved = summary.saved, "fetch iteration complete");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "fetch iteration failed");
                    if let Some(pause) = errors.record_failure() {
                        tracing::warn!(pause_secs = pause.as_secs(), "fetch loop backing off");
                        sleep_or_cancel(&cancel, pause).await;
                    }
                }
            }

            sleep_or_cancel(&cancel, interval).await;
        }
        tracing::info!("fetch loop stopped");
    }
}

/// Story-event consumer driving the subvert worker.
pub struct SubvertLoop {
    pool: DbPool,
    worker: SubvertWorker,
    batch_size: u32,
}

impl SubvertLoop {
    /// Create the loop.
    pub fn new(pool: DbPool, worker: SubvertWorker, intervals: &IntervalsConfig) -> Self {
        Self {
            pool,
            worker,
            batch_size: intervals.event_batch_size,
        }
    }

    /// Drain and process one batch. Returns how many events were handled.
    pub async fn run_once(&self) -> usize {
        let batch = match events::drain_story_events(&self.pool, SUBVERT_CONSUMER, self.batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "failed to drain story events");
                return 0;
            }
        };
        if batch.is_empty() {
            return 0;
        }

        let summary = self.worker.process_events(&batch).await;
        if summary.failed > 0 {
            // Leave the cursor; the dedup guard makes redelivery cheap.
            tracing::warn!(failed = summary.failed, "subvert batch left for redelivery");
            return batch.len();
        }

        let last = batch.last().expect("non-empty batch").seq;
        if let Err(e) = events::set_cursor(&self.pool, SUBVERT_CONSUMER, last).await {
            tracing::warn!(error = %e, "failed to advance subvert cursor");
        }
        batch.len()
    }

    /// Poll the outbox until cancellation.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "subvert loop started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_once().await;
            sleep_or_cancel(&cancel, interval).await;
        }
        tracing::info!("subvert loop stopped");
    }
}

/// Headline-event consumer driving the tournament engine.
///
/// One serialized consumer per store is the single-writer discipline the
/// engine's per-day updates rely on.
pub struct TournamentLoop {
    pool: DbPool,
    engine: TournamentEngine,
    batch_size: u32,
}

impl TournamentLoop {
    /// Create the loop.
    pub fn new(pool: DbPool, engine: TournamentEngine, intervals: &IntervalsConfig) -> Self {
        Self {
            pool,
            engine,
            batch_size: intervals.event_batch_size,
        }
    }

    /// Drain one batch and run the engine when anything arrived.
    /// Returns how many events were handled.
    pub async fn run_once(&self) -> usize {
        let batch = match events::drain_headline_events(
            &self.pool,
            TOURNAMENT_CONSUMER,
            self.batch_size,
        )
        .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "failed to drain headline events");
                return 0;
            }
        };
        if batch.is_empty() {
            return 0;
        }

        // The engine ranks whatever is new for today; the event batch is
        // just the trigger. Replays are benign — a run with no new
        // headlines is a no-op.
        match self.engine.run(&editorial_today()).await {
            Ok(_summary) => {
                let last = batch.last().expect("non-empty batch").seq;
                if let Err(e) = events::set_cursor(&self.pool, TOURNAMENT_CONSUMER, last).await {
                    tracing::warn!(error = %e, "failed to advance tournament cursor");
                }
                batch.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "tournament run failed, batch left for redelivery");
                batch.len()
            }
        }
    }

    /// Poll the outbox until cancellation.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "tournament loop started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_once().await;
            sleep_or_cancel(&cancel, interval).await;
        }
        tracing::info!("tournament loop stopped");
    }
}

async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(duration) => {}
    }
}
