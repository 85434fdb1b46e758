//! Error types for the Gazette core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A secret required by the configuration could not be resolved.
    #[error("secret not found: {name}")]
    SecretNotFound {
        /// The name of the missing secret.
        name: String,
    },
}

/// Errors from interacting with LLM providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The call did not complete within the per-call timeout.
    #[error("LLM call timed out after {seconds}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// No provider is bound to the requested stage.
    #[error("no LLM provider configured for stage '{stage}'")]
    NotConfigured {
        /// The stage with no binding.
        stage: String,
    },

    /// All retries were exhausted.
    #[error("LLM call failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Total attempts made.
        attempts: u32,
        /// The final error message.
        message: String,
    },

    /// Provider construction failed (bad binding, missing secret).
    #[error("LLM provider configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LlmError {
    /// Whether the gateway should retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Request(_) | LlmError::Timeout { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors from the news source client and story ingestor.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    /// HTTP request to the news feed failed.
    #[error("news API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The feed returned a non-success status payload.
    #[error("news API error ({code}): {message}")]
    Api {
        /// The error code from the feed.
        code: String,
        /// The error message from the feed.
        message: String,
    },

    /// The feed returned a status the client does not recognize.
    #[error("unexpected news API response status: {status}")]
    UnexpectedStatus {
        /// The unrecognized status string.
        status: String,
    },

    /// A story record is missing a field the pipeline requires.
    #[error("story '{title}' rejected: {reason}")]
    InvalidStory {
        /// The story title, for log context.
        title: String,
        /// Why the story was rejected.
        reason: String,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the subvert worker.
#[derive(Debug, thiserror::Error)]
pub enum SubvertError {
    /// A generation stage failed after gateway retries.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the tournament engine.
#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    /// A judge call failed after gateway retries.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from SQLite storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to SQLite database.
    #[error("database connection error: {source}")]
    Connection {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// Database migration failed.
    #[error("database migration error: {source}")]
    Migration {
        /// The underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A database query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_missing_field_message() {
        let err = ConfigError::MissingField {
            field: "news.api_key".to_string(),
        };
        assert_eq!(err.to_string(), "missing required config field: news.api_key");
    }

    #[test]
    fn config_error_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            field: "llm.brainstorm_provider".to_string(),
            message: "must be anthropic or openai-compat".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for config field 'llm.brainstorm_provider': must be anthropic or openai-compat"
        );
    }

    #[test]
    fn llm_error_rate_limited_message() {
        let err = LlmError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.to_string(), "LLM rate limited, retry after 30 seconds");
    }

    #[test]
    fn llm_error_not_configured_message() {
        let err = LlmError::NotConfigured {
            stage: "brainstorm".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no LLM provider configured for stage 'brainstorm'"
        );
    }

    #[test]
    fn llm_error_retryable_classification() {
        assert!(LlmError::RateLimited {
            retry_after_secs: 1
        }
        .is_retryable());
        assert!(LlmError::Timeout { seconds: 30 }.is_retryable());
        assert!(LlmError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!LlmError::Parse("garbage".into()).is_retryable());
    }

    #[test]
    fn news_error_api_message() {
        let err = NewsError::Api {
            code: "TooManyRequests".to_string(),
            message: "rate limit exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "news API error (TooManyRequests): rate limit exceeded"
        );
    }

    #[test]
    fn news_error_invalid_story_message() {
        let err = NewsError::InvalidStory {
            title: "Mars Rover Phones Home".to_string(),
            reason: "no image".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "story 'Mars Rover Phones Home' rejected: no image"
        );
    }
}
