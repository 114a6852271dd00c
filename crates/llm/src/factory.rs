//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a ready client.

use crate::client::LlmClient;
use crate::providers::gemini::DEFAULT_GEMINI_URL;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use lexchat_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// `timeout` bounds each HTTP request at the transport level; the caller's
/// call policy still applies on top of it.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required API
/// key is missing, and `AppError::Llm` if the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    tracing::debug!("Creating LLM client for provider '{}'", provider_type);

    let api_key = api_key.filter(|k| !k.is_empty());
    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(AppError::Config(format!(
            "{} provider requires an API key",
            provider_type
        )));
    }

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client = match timeout {
                Some(timeout) => OllamaClient::with_timeout(base_url, timeout)?,
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Gemini => {
            let api_key = api_key.unwrap_or_default();
            let base_url = endpoint.unwrap_or(DEFAULT_GEMINI_URL);
            let client = match timeout {
                Some(timeout) => GeminiClient::with_timeout(base_url, api_key, timeout)?,
                None => GeminiClient::with_base_url(base_url, api_key),
            };
            Ok(Arc::new(client))
        }
    }
}
