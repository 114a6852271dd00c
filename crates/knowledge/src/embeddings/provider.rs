//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{GeminiProvider, MockProvider, OllamaProvider};
use lexchat_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations make one request per call; timeouts and retries are
/// applied by the caller.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "gemini", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        "Creating embedding provider: provider={}, model={}, dimensions={}",
        config.provider,
        config.model,
        config.dimensions
    );

    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        "gemini" => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AppError::Config("Gemini embedding provider requires an API key".to_string())
                })?;
            Ok(Arc::new(GeminiProvider::new(config, api_key)?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama, mock",
            config.provider
        ))),
    }
}
