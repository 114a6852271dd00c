//! Embedding provider settings resolved from the application config.

use lexchat_core::AppConfig;
use std::time::Duration;

/// Everything needed to construct an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "gemini", "ollama", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// API key for providers that need one
    pub api_key: Option<String>,

    /// Transport-level request timeout
    pub timeout: Option<Duration>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            timeout: None,
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the embedding settings from the retrieval section and the
    /// provider table.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = config.retrieval.embedding_provider.clone();

        Self {
            model: config.retrieval.embedding_model.clone(),
            dimensions: config.retrieval.embedding_dimensions,
            endpoint: config.resolve_endpoint(&provider),
            api_key: config.resolve_api_key(&provider),
            timeout: config.provider_timeout(&provider),
            provider,
        }
    }
}
