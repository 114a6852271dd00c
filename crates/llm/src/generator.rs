//! Answer generation over an [`LlmClient`].

use crate::client::{LlmClient, LlmRequest};
use futures::StreamExt;
use lexchat_core::{AppError, AppResult, CallPolicy, GenerationRequest};
use std::sync::Arc;

/// How the generator talks to the service. Both modes return the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// One non-streaming completion
    #[default]
    Complete,
    /// Streamed fragments, concatenated before returning
    Stream,
}

/// Turns an assembled [`GenerationRequest`] into answer text.
pub struct Generator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    mode: GenerationMode,
    policy: CallPolicy,
}

impl Generator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            mode: GenerationMode::default(),
            policy: CallPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    fn to_llm_request(&self, request: &GenerationRequest) -> LlmRequest {
        let mut llm_request = LlmRequest::new(request.query.clone(), self.model.clone())
            .with_system(request.instructions.clone());
        llm_request.temperature = self.temperature;
        llm_request.max_tokens = self.max_tokens;
        if self.mode == GenerationMode::Stream {
            llm_request = llm_request.with_streaming();
        }
        llm_request
    }

    async fn attempt(&self, request: &LlmRequest) -> AppResult<String> {
        match self.mode {
            GenerationMode::Complete => Ok(self.client.complete(request).await?.content),
            GenerationMode::Stream => {
                let mut stream = self.client.stream(request).await?;
                let mut text = String::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    text.push_str(&chunk.content);
                    if chunk.done {
                        break;
                    }
                }
                Ok(text)
            }
        }
    }

    /// Generate the answer for one turn.
    ///
    /// Every failure, including a timeout or an empty answer, is reported as
    /// [`AppError::Generation`].
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let llm_request = self.to_llm_request(request);

        tracing::debug!(
            "Generating answer with {} (model: {}, {} context chunks)",
            self.client.provider_name(),
            self.model,
            request.context.len()
        );

        let text = self
            .policy
            .run("generate", || self.attempt(&llm_request))
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(AppError::Generation(format!(
                "{} returned an empty response",
                self.client.provider_name()
            )));
        }

        Ok(text)
    }
}
