//! LLM usage tracking — stores per-call token counts by stage.

use super::DbPool;
use crate::error::StorageError;
use crate::llm::{Stage, TokenUsage, UsageSink};

/// Insert a new LLM usage record.
pub async fn insert_llm_usage(
    pool: &DbPool,
    stage: &str,
    provider: &str,
    model: &str,
    usage: &TokenUsage,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO llm_usage (stage, provider, model, input_tokens, output_tokens, \
         cache_creation_input_tokens, cache_read_input_tokens) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(stage)
    .bind(provider)
    .bind(model)
    .bind(usage.input_tokens)
    .bind(usage.output_tokens)
    .bind(usage.cache_creation_input_tokens)
    .bind(usage.cache_read_input_tokens)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Aggregated usage for one stage.
#[derive(Debug, serde::Serialize)]
pub struct StageUsageSummary {
    /// Stage name.
    pub stage: String,
    /// Number of calls recorded.
    pub calls: i64,
    /// Total input tokens.
    pub input_tokens: i64,
    /// Total output tokens.
    pub output_tokens: i64,
    /// Total tokens served from the prompt cache.
    pub cache_read_input_tokens: i64,
}

/// Per-stage usage aggregation over all recorded calls.
pub async fn usage_by_stage(pool: &DbPool) -> Result<Vec<StageUsageSummary>, StorageError> {
    let rows: Vec<(String, i64, i64, i64, i64)> = sqlx::query_as(
        "SELECT stage, COUNT(*), SUM(input_tokens), SUM(output_tokens), \
         SUM(cache_read_input_tokens) \
         FROM llm_usage GROUP BY stage ORDER BY stage",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(rows
        .into_iter()
        .map(|(stage, calls, input_tokens, output_tokens, cache_read_input_tokens)| {
            StageUsageSummary {
                stage,
                calls,
                input_tokens,
                output_tokens,
                cache_read_input_tokens,
            }
        })
        .collect())
}

/// Usage sink that persists every gateway call.
pub struct StorageUsageSink {
    pool: DbPool,
}

impl StorageUsageSink {
    /// Create a sink writing to the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UsageSink for StorageUsageSink {
    async fn record(&self, stage: Stage, provider: &str, model: &str, usage: &TokenUsage) {
        if let Err(e) = insert_llm_usage(&self.pool, stage.as_str(), provider, model, usage).await {
            // Accounting must never take down a generation call.
            tracing::warn!(error = %e, "failed to record LLM usage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn records_and_aggregates_by_stage() {
        let pool = init_test_db().await.expect("init db");
        let sink = StorageUsageSink::new(pool.clone());

        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 80,
        };
        sink.record(Stage::Brainstorm, "anthropic", "claude-sonnet-4-5", &usage)
            .await;
        sink.record(Stage::Brainstorm, "anthropic", "claude-sonnet-4-5", &usage)
            .await;
        sink.record(Stage::TournamentElim, "google", "gemini-2.5-flash", &usage)
            .await;

        let summary = usage_by_stage(&pool).await.unwrap();
        assert_eq!(summary.len(), 2);
        let brainstorm = summary.iter().find(|s| s.stage == "brainstorm").unwrap();
        assert_eq!(brainstorm.calls, 2);
        assert_eq!(brainstorm.input_tokens, 200);
        assert_eq!(brainstorm.cache_read_input_tokens, 160);
    }
}
