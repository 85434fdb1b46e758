//! Configuration management for the Gazette pipeline.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults (mirroring the production deployment)
//! 2. TOML config file (`~/.gazette/config.toml` or an explicit path)
//! 3. Environment variable overrides (stage bindings keep their
//!    original unprefixed names, e.g. `TOURNAMENT_FINALS_MODEL`)

mod env_overrides;


use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// News feed client and ingestor settings.
    #[serde(default)]
    pub news: NewsConfig,

    /// Per-stage LLM bindings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Data storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tournament engine knobs.
    #[serde(default)]
    pub tournament: TournamentConfig,

    /// Automation loop intervals.
    #[serde(default)]
    pub intervals: IntervalsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news: NewsConfig::default(),
            llm: LlmConfig::default(),
            storage: StorageConfig::default(),
            tournament: TournamentConfig::default(),
            intervals: IntervalsConfig::default(),
        }
    }
}

/// News feed client and story ingestor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsConfig {
    /// Feed endpoint.
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,

    /// Name of the secret holding the feed API key.
    #[serde(default = "default_news_api_key_secret")]
    pub api_key_secret: String,

    /// Categories fetched every run, in addition to the wildcard slot.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Stories saved per category before moving on.
    #[serde(default = "default_max_saved_per_category")]
    pub max_saved_per_category: u32,

    /// Upstream page fetches per category.
    #[serde(default = "default_max_pages_per_category")]
    pub max_pages_per_category: u32,

    /// Country filter.
    #[serde(default = "default_country")]
    pub country: String,

    /// Language filter.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_news_endpoint(),
            api_key_secret: default_news_api_key_secret(),
            categories: default_categories(),
            max_saved_per_category: default_max_saved_per_category(),
            max_pages_per_category: default_max_pages_per_category(),
            country: default_country(),
            language: default_language(),
        }
    }
}

/// A stage's `(provider, model)` binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageBinding {
    /// Provider name: `anthropic`, `openai`, `google`, or `ollama`.
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
}

impl StageBinding {
    fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }
}

/// Per-stage LLM bindings.
///
/// The polish pass shares the finals binding: punching up a finalist is
/// worth the same model as judging one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Stage-1 angle brainstorming.
    #[serde(default = "default_brainstorm_binding")]
    pub brainstorm: StageBinding,

    /// Stage-2 headline drafting.
    #[serde(default = "default_generate_binding")]
    pub generate: StageBinding,

    /// Bulk judge for elimination rounds.
    #[serde(default = "default_tournament_binding")]
    pub tournament: StageBinding,

    /// Judge for final rounds and the polish pass.
    #[serde(default = "default_finals_binding")]
    pub tournament_finals: StageBinding,

    /// Per-call timeout in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            brainstorm: default_brainstorm_binding(),
            generate: default_generate_binding(),
            tournament: default_tournament_binding(),
            tournament_finals: default_finals_binding(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Data storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Tournament engine knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TournamentConfig {
    /// Survivor cohort size (`TOURNAMENT_FINALS_CUTOFF`).
    #[serde(default = "default_finals_cutoff")]
    pub finals_cutoff: usize,

    /// Ask the judge for explanation text after the ranking line.
    #[serde(default)]
    pub verbose: bool,

    /// A run is final once this many batches have completed.
    #[serde(default = "default_final_batch_threshold")]
    pub final_batch_threshold: i64,

    /// A run is also final at or after this editorial-timezone hour.
    #[serde(default = "default_final_hour")]
    pub final_hour: u32,

    /// How many top survivors the polish pass touches.
    #[serde(default = "default_polish_cohort")]
    pub polish_cohort: usize,

    /// Top-N of each prior day pulled into the cross-day pool.
    #[serde(default = "default_carry_over_per_prior_day")]
    pub carry_over_per_prior_day: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            finals_cutoff: default_finals_cutoff(),
            verbose: false,
            final_batch_threshold: default_final_batch_threshold(),
            final_hour: default_final_hour(),
            polish_cohort: default_polish_cohort(),
            carry_over_per_prior_day: default_carry_over_per_prior_day(),
        }
    }
}

/// Automation loop intervals.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntervalsConfig {
    /// Seconds between fetch runs.
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,

    /// Seconds between subvert-loop polls of the story outbox.
    #[serde(default = "default_subvert_poll_secs")]
    pub subvert_poll_secs: u64,

    /// Seconds between tournament-loop polls of the headline outbox.
    /// The production stream batched roughly five minutes of headlines
    /// per invocation; this mirrors that cadence.
    #[serde(default = "default_tournament_poll_secs")]
    pub tournament_poll_secs: u64,

    /// Maximum events drained per loop iteration.
    #[serde(default = "default_event_batch_size")]
    pub event_batch_size: u32,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            fetch_secs: default_fetch_secs(),
            subvert_poll_secs: default_subvert_poll_secs(),
            tournament_poll_secs: default_tournament_poll_secs(),
            event_batch_size: default_event_batch_size(),
        }
    }
}

// --- serde default functions ---

fn default_news_endpoint() -> String {
    "https://newsdata.io/api/1/news".to_string()
}

fn default_news_api_key_secret() -> String {
    "NEWS_DATA_API_KEY".to_string()
}

fn default_categories() -> Vec<String> {
    [
        "business",
        "entertainment",
        "politics",
        "science",
        "sports",
        "technology",
        "top",
        "world",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_max_saved_per_category() -> u32 {
    5
}

fn default_max_pages_per_category() -> u32 {
    3
}

fn default_country() -> String {
    "us".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_brainstorm_binding() -> StageBinding {
    StageBinding::new("anthropic", "claude-sonnet-4-5")
}

fn default_generate_binding() -> StageBinding {
    StageBinding::new("anthropic", "claude-sonnet-4-5")
}

fn default_tournament_binding() -> StageBinding {
    StageBinding::new("google", "gemini-2.5-flash")
}

fn default_finals_binding() -> StageBinding {
    StageBinding::new("anthropic", "claude-opus-4-6")
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_db_path() -> String {
    "~/.gazette/gazette.db".to_string()
}

fn default_finals_cutoff() -> usize {
    64
}

fn default_final_batch_threshold() -> i64 {
    4
}

fn default_final_hour() -> u32 {
    21
}

fn default_polish_cohort() -> usize {
    16
}

fn default_carry_over_per_prior_day() -> usize {
    16
}

fn default_fetch_secs() -> u64 {
    3600
}

fn default_subvert_poll_secs() -> u64 {
    60
}

fn default_tournament_poll_secs() -> u64 {
    300
}

fn default_event_batch_size() -> u32 {
    25
}

impl Config {
    /// Load configuration: defaults, then the TOML file when present,
    /// then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|e| ConfigError::InvalidValue {
                    field: "config_path".to_string(),
                    message: format!("failed to read {}: {e}", p.display()),
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::ParseError { source })?
            }
            _ => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, binding) in [
            ("llm.brainstorm", &self.llm.brainstorm),
            ("llm.generate", &self.llm.generate),
            ("llm.tournament", &self.llm.tournament),
            ("llm.tournament_finals", &self.llm.tournament_finals),
        ] {
            if !matches!(
                binding.provider.as_str(),
                "anthropic" | "openai" | "google" | "ollama"
            ) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{field}.provider"),
                    message: format!(
                        "unknown provider '{}', expected anthropic, openai, google, or ollama",
                        binding.provider
                    ),
                });
            }
            if binding.model.is_empty() {
                return Err(ConfigError::MissingField {
                    field: format!("{field}.model"),
                });
            }
        }

        if self.tournament.finals_cutoff == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tournament.finals_cutoff".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.tournament.final_hour > 23 {
            return Err(ConfigError::InvalidValue {
                field: "tournament.final_hour".to_string(),
                message: "must be an hour 0-23".to_string(),
            });
        }

        Ok(())
    }
}
