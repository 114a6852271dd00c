//! Gemini embedding provider (`embedContent` / `batchEmbedContents`).

use crate::embeddings::providers::check_dimensions;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use lexchat_core::{is_retryable_status, AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";

/// Gemini embedding provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Gemini: {}", e))
        })?;

        // The API addresses models as "models/<name>"
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model,
            dimensions: config.dimensions,
        })
    }

    fn batch_body<'a>(&'a self, texts: &'a [String]) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: [Part { text: text.as_str() }],
                    },
                    task_type: "RETRIEVAL_QUERY",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/{}/{}:batchEmbedContents",
            self.base_url, API_VERSION, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.batch_body(texts))
            .send()
            .await
            .map_err(|e| {
                AppError::unavailable("gemini", format!("Failed to send request to Gemini: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Gemini API error ({}): {}", status, error_text);
            if is_retryable_status(status.as_u16()) {
                return Err(AppError::unavailable("gemini", message));
            }
            return Err(AppError::Embedding(message));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Gemini response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} texts",
                body.embeddings.len(),
                texts.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = body.embeddings.into_iter().map(|e| e.values).collect();
        for embedding in &embeddings {
            check_dimensions("Gemini", embedding, self.dimensions)?;
        }

        debug!("Generated {} Gemini embeddings", embeddings.len());
        Ok(embeddings)
    }
}
