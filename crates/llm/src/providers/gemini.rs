//! Google Gemini chat-completion provider.
//!
//! Gemini API: https://ai.google.dev/api/generate-content

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::line_stream;
use lexchat_core::{is_retryable_status, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

const API_VERSION: &str = "v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "GenerationConfig::is_empty")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_output_tokens.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> AppResult<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(AppError::Llm(format!("Gemini blocked the prompt: {}", reason)));
        }

        let Some(candidate) = self.candidates.first() else {
            return Ok(String::new());
        };

        let text: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate.finish_reason.as_deref() {
                if reason == "SAFETY" || reason == "RECITATION" {
                    return Err(AppError::Llm(format!(
                        "Gemini stopped without output: {}",
                        reason
                    )));
                }
            }
        }

        Ok(text)
    }

    fn usage(&self) -> LlmUsage {
        self.usage_metadata
            .as_ref()
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default()
    }

    fn finished(&self) -> bool {
        self.candidates
            .first()
            .is_some_and(|c| c.finish_reason.is_some())
    }
}

/// Gemini chat-completion client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client for the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GEMINI_URL, api_key)
    }

    /// Create a client for a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose HTTP requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Gemini: {}", e)))?;

        Ok(Self {
            client,
            ..Self::with_base_url(base_url, api_key)
        })
    }

    fn model_path(model: &str) -> &str {
        model.strip_prefix("models/").unwrap_or(model)
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url,
            API_VERSION,
            Self::model_path(model),
            method
        )
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GeminiRequest {
        // gemini-1.0 models reject `systemInstruction`
        let system_as_user = Self::model_path(&request.model).starts_with("gemini-1.0");

        let (system_instruction, user_text) = match &request.system {
            Some(system) if system_as_user => (None, format!("{}\n\n{}", system, request.user)),
            Some(system) => (
                Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart {
                        text: system.clone(),
                    }],
                }),
                request.user.clone(),
            ),
            None => (None, request.user.clone()),
        };

        GeminiRequest {
            system_instruction,
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: user_text }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    async fn send(&self, url: &str, body: &GeminiRequest) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
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
            return Err(AppError::Llm(message));
        }

        Ok(response)
    }
}

fn parse_sse_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<GeminiResponse>(data)
        .map_err(|e| AppError::Llm(format!("Failed to parse Gemini chunk: {}", e)))
        .and_then(|response| {
            let done = response.finished();
            Ok(LlmStreamChunk {
                content: response.text()?,
                done,
                usage: done.then(|| response.usage()),
            })
        });
    Some(parsed)
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Gemini (model: {})", request.model);

        let url = self.endpoint(&request.model, "generateContent");
        let response = self.send(&url, &self.to_gemini_request(request)).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let content = gemini_response.text()?;
        tracing::debug!("Received completion from Gemini ({} chars)", content.len());

        Ok(LlmResponse {
            content,
            usage: gemini_response.usage(),
            model: gemini_response
                .model_version
                .unwrap_or_else(|| request.model.clone()),
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!("Starting streaming request to Gemini (model: {})", request.model);

        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let response = self.send(&url, &self.to_gemini_request(request)).await?;

        Ok(line_stream(response.bytes_stream(), parse_sse_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let client = GeminiClient::with_base_url("http://localhost:8080/", "key");
        assert_eq!(
            client.endpoint("models/gemini-1.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            client.endpoint("gemini-1.5-flash", "streamGenerateContent"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:streamGenerateContent"
        );
    }

    #[test]
    fn test_request_uses_system_instruction() {
        let client = GeminiClient::new("key");
        let request = LlmRequest::new("What is theft?", "gemini-1.5-flash")
            .with_system("Use the context.")
            .with_temperature(0.0)
            .with_max_tokens(512);

        let json = serde_json::to_value(client.to_gemini_request(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Use the context.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is theft?");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_request_folds_system_for_legacy_models() {
        let client = GeminiClient::new("key");
        let request = LlmRequest::new("What is theft?", "models/gemini-1.0-pro")
            .with_system("Use the context.");

        let json = serde_json::to_value(client.to_gemini_request(&request)).unwrap();

        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("generationConfig").is_none());
        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "Use the context.\n\nWhat is theft?"
        );
    }

    #[test]
    fn test_response_text_and_usage() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Theft is "}, {"text": "defined in Section 378."}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 100, "candidatesTokenCount": 8, "totalTokenCount": 108}
            }"#,
        )
        .unwrap();

        assert_eq!(response.text().unwrap(), "Theft is defined in Section 378.");
        assert_eq!(response.usage().total_tokens, 108);
        assert!(response.finished());
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.text().is_err());
    }

    #[test]
    fn test_no_candidates_yields_empty_text() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(response.text().unwrap(), "");
    }

    #[test]
    fn test_parse_sse_line() {
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("data:").is_none());

        let chunk = parse_sse_line(
            r#"data: {"candidates":[{"content":{"parts":[{"text":"Sec"}]}}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.content, "Sec");
        assert!(!chunk.done);

        let last = parse_sse_line(
            r#"data: {"candidates":[{"content":{"parts":[{"text":"tion"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":2}}"#,
        )
        .unwrap()
        .unwrap();
        assert!(last.done);
        assert_eq!(last.usage.unwrap().total_tokens, 5);
    }
}
