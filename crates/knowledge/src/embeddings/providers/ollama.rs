//! Ollama embedding provider (`/api/embeddings`).

use crate::embeddings::providers::check_dimensions;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use lexchat_core::{is_retryable_status, AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embed.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::unavailable("ollama", format!("Failed to send request to Ollama: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            let message = format!("Ollama API error ({}): {}", status, message);
            if is_retryable_status(status.as_u16()) {
                return Err(AppError::unavailable("ollama", message));
            }
            return Err(AppError::Embedding(message));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        check_dimensions("Ollama", &body.embedding, self.dimensions)?;

        debug!("Generated {} dimensional embedding", body.embedding.len());
        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        // No batch endpoint; embed sequentially
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: endpoint.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new(&config(None)).unwrap();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_custom_endpoint() {
        let provider = OllamaProvider::new(&config(Some("http://gpu-box:11434/"))).unwrap();
        assert_eq!(provider.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_request_body() {
        let json = serde_json::to_value(EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "What is Section 420?",
        })
        .unwrap();
        assert_eq!(json["model"], "nomic-embed-text");
        assert_eq!(json["prompt"], "What is Section 420?");
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        // Unroutable endpoint: any request would fail
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"))).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
