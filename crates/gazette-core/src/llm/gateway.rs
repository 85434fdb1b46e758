//! The model gateway: one choke point for all provider traffic.
//!
//! Every pipeline stage calls LLMs through here. The gateway owns the
//! stage→(provider, model) bindings, lazily constructs one client per
//! stage, retries transient failures with exponential backoff, enforces a
//! per-call timeout, and reports token usage through a pluggable sink.

use super::factory::create_provider;
use super::{GenerationParams, LlmProvider, LlmResponse, TokenUsage};
use crate::config::{LlmConfig, StageBinding};
use crate::error::LlmError;
use crate::secrets::SecretStore;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Retries after the first attempt.
const MAX_RETRIES: u32 = 4;

/// Base delay for exponential backoff.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// A pipeline stage with its own model binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Stage-1 angle brainstorming.
    Brainstorm,
    /// Stage-2 headline drafting.
    Generate,
    /// Bulk judge for tournament elimination rounds.
    TournamentElim,
    /// Judge for the tournament final round.
    TournamentFinal,
    /// Punch-up pass on finalists.
    Polish,
}

impl Stage {
    /// Stable name used in logs and usage records.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Brainstorm => "brainstorm",
            Stage::Generate => "generate",
            Stage::TournamentElim => "tournament-elim",
            Stage::TournamentFinal => "tournament-final",
            Stage::Polish => "polish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook receiving per-call usage after each successful completion.
#[async_trait::async_trait]
pub trait UsageSink: Send + Sync {
    /// Record one completed call.
    async fn record(&self, stage: Stage, provider: &str, model: &str, usage: &TokenUsage);
}

/// Default sink: structured log line per call.
pub struct TracingUsageSink;

#[async_trait::async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, stage: Stage, provider: &str, model: &str, usage: &TokenUsage) {
        tracing::info!(
            stage = %stage,
            provider,
            model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cache_creation = usage.cache_creation_input_tokens,
            cache_read = usage.cache_read_input_tokens,
            "LLM usage",
        );
    }
}

/// Uniform access to every stage's model.
pub struct ModelGateway {
    llm: LlmConfig,
    secrets: Arc<dyn SecretStore>,
    providers: Mutex<HashMap<Stage, Arc<dyn LlmProvider>>>,
    sink: Arc<dyn UsageSink>,
}

impl ModelGateway {
    /// Create a gateway over the configured bindings. Providers are
    /// constructed on first use per stage.
    pub fn new(llm: LlmConfig, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            llm,
            secrets,
            providers: Mutex::new(HashMap::new()),
            sink: Arc::new(TracingUsageSink),
        }
    }

    /// Replace the usage sink.
    pub fn with_usage_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Pin a stage to a pre-built provider. Used by tests and embedders
    /// that want to bypass the factory.
    pub fn with_provider(self, stage: Stage, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers
            .lock()
            .expect("provider map poisoned")
            .insert(stage, provider);
        self
    }

    fn binding(&self, stage: Stage) -> &StageBinding {
        match stage {
            Stage::Brainstorm => &self.llm.brainstorm,
            Stage::Generate => &self.llm.generate,
            Stage::TournamentElim => &self.llm.tournament,
            // The polish pass shares the finals model.
            Stage::TournamentFinal | Stage::Polish => &self.llm.tournament_finals,
        }
    }

    fn provider_for(&self, stage: Stage) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let mut providers = self.providers.lock().expect("provider map poisoned");
        if let Some(provider) = providers.get(&stage) {
            return Ok(provider.clone());
        }
        let provider = create_provider(self.binding(stage), self.secrets.as_ref())?;
        providers.insert(stage, provider.clone());
        Ok(provider)
    }

    /// Call the stage's model.
    ///
    /// A supplied system prompt is marked cacheable; the caller must keep
    /// its bytes stable across calls for the cache to pay off. Transient
    /// failures (429, 5xx, transport, timeout) are retried with
    /// exponential backoff and jitter; anything else surfaces immediately.
    pub async fn call(
        &self,
        stage: Stage,
        system: Option<&str>,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse, LlmError> {
        let provider = self.provider_for(stage)?;
        let model = self.binding(stage).model.clone();
        let params = GenerationParams {
            max_tokens,
            temperature,
            cache_system: system.is_some(),
        };
        let system = system.unwrap_or("");
        let timeout = Duration::from_secs(self.llm.call_timeout_secs);

        for attempt in 0..=MAX_RETRIES {
            let outcome =
                tokio::time::timeout(timeout, provider.complete(system, prompt, &params)).await;

            let err = match outcome {
                Ok(Ok(response)) => {
                    self.sink
                        .record(stage, provider.name(), &model, &response.usage)
                        .await;
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => LlmError::Timeout {
                    seconds: timeout.as_secs(),
                },
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt == MAX_RETRIES {
                return Err(LlmError::RetriesExhausted {
                    attempts: MAX_RETRIES + 1,
                    message: err.to_string(),
                });
            }

            let delay = RETRY_BASE_DELAY * 2u32.pow(attempt)
                + Duration::from_secs_f64(rand::thread_rng().gen::<f64>());
            tracing::warn!(
                stage = %stage,
                attempt = attempt + 1,
                max_retries = MAX_RETRIES,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying LLM call",
            );
            tokio::time::sleep(delay).await;
        }

        unreachable!("retry loop always returns")
    }
}
