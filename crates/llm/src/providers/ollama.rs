//! Ollama chat-completion provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::line_stream;
use lexchat_core::{is_retryable_status, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama `/api/generate` request body.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

/// Ollama `/api/generate` response body (also one line of a stream).
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama chat-completion client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for the default local endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a client for a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose HTTP requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Ollama: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.user.clone(),
            system: request.system.clone(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream,
        }
    }

    async fn send(&self, body: &OllamaRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::unavailable("ollama", format!("Failed to send request to Ollama: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Ollama API error ({}): {}", status, error_text);
            if is_retryable_status(status.as_u16()) {
                return Err(AppError::unavailable("ollama", message));
            }
            return Err(AppError::Llm(message));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_stream_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let parsed = serde_json::from_str::<OllamaResponse>(line)
        .map_err(|e| AppError::Llm(format!("Failed to parse Ollama chunk: {}", e)))
        .map(|response| LlmStreamChunk {
            usage: response.done.then(|| response.usage()),
            done: response.done,
            content: response.response,
        });
    Some(parsed)
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama (model: {})", request.model);

        let response = self.send(&self.to_ollama_request(request, false)).await?;

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Received completion from Ollama ({} chars)",
            ollama_response.response.len()
        );

        Ok(LlmResponse {
            usage: ollama_response.usage(),
            content: ollama_response.response,
            model: ollama_response.model,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!("Starting streaming request to Ollama (model: {})", request.model);

        let response = self.send(&self.to_ollama_request(request, true)).await?;

        // Ollama streams newline-delimited JSON objects
        Ok(line_stream(response.bytes_stream(), parse_stream_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("What is theft?", "llama3.2")
            .with_system("Answer from context.")
            .with_temperature(0.2)
            .with_max_tokens(200);

        let body = client.to_ollama_request(&request, false);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["prompt"], "What is theft?");
        assert_eq!(json["system"], "Answer from context.");
        assert_eq!(json["options"]["num_predict"], 200);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_ollama_request_omits_empty_options() {
        let client = OllamaClient::new();
        let body = client.to_ollama_request(&LlmRequest::new("hi", "llama3.2"), true);
        let json = serde_json::to_value(&body).unwrap();

        assert!(json.get("options").is_none());
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_parse_stream_line() {
        let chunk = parse_stream_line(r#"{"model":"llama3.2","response":"Theft","done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.content, "Theft");
        assert!(!chunk.done);
        assert!(chunk.usage.is_none());

        let last = parse_stream_line(
            r#"{"model":"llama3.2","response":"","done":true,"prompt_eval_count":12,"eval_count":30}"#,
        )
        .unwrap()
        .unwrap();
        assert!(last.done);
        assert_eq!(last.usage.unwrap().total_tokens, 42);

        assert!(parse_stream_line("not json").unwrap().is_err());
    }
}
