//! LLM integration crate for LexChat.
//!
//! This crate provides a provider-agnostic abstraction for chat-completion
//! services and the [`Generator`] that turns an assembled prompt into an
//! answer.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use lexchat_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is Section 378?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generator;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use generator::{GenerationMode, Generator};
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
