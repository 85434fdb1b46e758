//! LLM provider abstraction and implementations.
//!
//! Provides a trait-based abstraction for LLM providers (Anthropic native,
//! plus any OpenAI-compatible endpoint) with typed responses, token usage
//! tracking including prompt-cache counters, and a stage-routing gateway.

pub mod anthropic;
pub mod factory;
pub mod gateway;
pub mod openai_compat;

use crate::error::LlmError;

pub use gateway::{ModelGateway, Stage, UsageSink};

/// Token usage information from an LLM completion.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
    /// Tokens written to the provider's prompt cache, when reported.
    pub cache_creation_input_tokens: u32,
    /// Tokens served from the provider's prompt cache, when reported.
    pub cache_read_input_tokens: u32,
}

impl TokenUsage {
    /// Accumulate token counts from another usage record (e.g. across retries).
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
    }
}

/// Response from an LLM completion request.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,
    /// Token usage for this completion.
    pub usage: TokenUsage,
    /// The model that produced this response.
    pub model: String,
}

/// Parameters controlling LLM generation behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic, 1.0+ = creative).
    pub temperature: f32,
    /// Mark the system prompt as cacheable on providers that support
    /// ephemeral prompt caching. The caller must keep the system bytes
    /// stable across calls for the cache to hit.
    pub cache_system: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            cache_system: false,
        }
    }
}

/// Trait abstracting all LLM provider operations.
///
/// Implementations include `AnthropicProvider` and `OpenAiCompatProvider`
/// (which covers OpenAI, Gemini's OpenAI-compatible endpoint, and Ollama).
/// The trait is object-safe for use as `Arc<dyn LlmProvider>`.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the display name of this provider (e.g., "anthropic", "google").
    fn name(&self) -> &str;

    /// Send a completion request to the LLM.
    ///
    /// An empty `system` is omitted from the request.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;
}
