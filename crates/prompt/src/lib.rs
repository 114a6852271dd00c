//! Prompt system for LexChat.
//!
//! This crate provides:
//! - YAML-based system prompt definitions
//! - Handlebars rendering of the retrieved context into the system template
//! - Assembly of the [`GenerationRequest`](lexchat_core::GenerationRequest)

pub mod assembler;
pub mod loader;
pub mod types;

// Re-export main types
pub use assembler::{PromptAssembler, CONTEXT_SEPARATOR, DEFAULT_SYSTEM_TEMPLATE};
pub use loader::{list_prompts, load_prompt, validate_template};
pub use types::PromptDefinition;
