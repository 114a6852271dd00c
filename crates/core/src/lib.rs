//! LexChat Core Library
//!
//! This crate provides the foundational utilities shared by every LexChat crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Timeout and retry policy for external calls
//! - Domain types for a question-answering turn

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use retry::{is_retryable_status, CallPolicy};
pub use types::{AnswerPath, AnswerResult, GenerationRequest, Message, RetrievedChunk, Role};
