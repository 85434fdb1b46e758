//! Provider construction from stage bindings.

use super::anthropic::AnthropicProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::LlmProvider;
use crate::config::StageBinding;
use crate::error::ConfigError;
use crate::secrets::SecretStore;
use std::sync::Arc;

/// Gemini's OpenAI-compatible endpoint.
const GEMINI_COMPAT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// OpenAI's API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Local Ollama default.
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Build a provider for a stage binding, resolving its API key.
pub fn create_provider(
    binding: &StageBinding,
    secrets: &dyn SecretStore,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    match binding.provider.as_str() {
        "anthropic" => {
            let api_key = secrets.get("ANTHROPIC_API_KEY")?;
            Ok(Arc::new(AnthropicProvider::new(api_key, binding.model.clone())))
        }
        "google" => {
            let api_key = secrets.get("GEMINI_API_KEY")?;
            Ok(Arc::new(OpenAiCompatProvider::new(
                GEMINI_COMPAT_BASE_URL.to_string(),
                api_key,
                binding.model.clone(),
                "google".to_string(),
            )))
        }
        "openai" => {
            let api_key = secrets.get("OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAiCompatProvider::new(
                OPENAI_BASE_URL.to_string(),
                api_key,
                binding.model.clone(),
                "openai".to_string(),
            )))
        }
        "ollama" => Ok(Arc::new(OpenAiCompatProvider::new(
            OLLAMA_BASE_URL.to_string(),
            "ollama".to_string(),
            binding.model.clone(),
            "ollama".to_string(),
        ))),
        other => Err(ConfigError::InvalidValue {
            field: "provider".to_string(),
            message: format!("unknown provider '{other}'"),
        }),
    }
}
