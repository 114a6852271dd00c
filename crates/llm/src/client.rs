//! LLM client abstraction and request/response types.

use futures::Stream;
use lexchat_core::AppResult;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A chat completion request: one system message and one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier (e.g., "gemini-1.5-flash", "llama3.2")
    pub model: String,

    /// System message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User message
    pub user: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Ask the provider for a streaming response
    #[serde(default)]
    pub stream: bool,
}

impl LlmRequest {
    /// Create a new request with required fields.
    pub fn new(user: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            user: user.into(),
            max_tokens: None,
            temperature: None,
            stream: false,
        }
    }

    /// Enable streaming for this request.
    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system message.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A fragment of a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmStreamChunk {
    /// Incremental text content
    pub content: String,

    /// Whether this is the final fragment
    #[serde(default)]
    pub done: bool,

    /// Usage statistics (final fragment only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

/// Stream of response fragments.
pub type LlmStream = Pin<Box<dyn Stream<Item = AppResult<LlmStreamChunk>> + Send>>;

/// Trait for chat-completion services.
///
/// Implementations translate [`LlmRequest`] into the provider's wire format.
/// They make exactly one HTTP attempt per call; timeouts and retries belong to
/// the caller.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "gemini", "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Perform a streaming completion.
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream>;
}
