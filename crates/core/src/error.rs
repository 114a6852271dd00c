//! Error types for LexChat.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! model services, the vector index, prompt assembly, and the
//! retrieval/generation failures surfaced by the response router.

use thiserror::Error;

/// Unified error type for LexChat.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM transport and provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index load and search errors
    #[error("Index error: {0}")]
    Index(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Context retrieval failed (embedder, index, or empty query)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Answer generation failed (service error, timeout, empty response)
    #[error("Generation error: {0}")]
    Generation(String),

    /// An external service failed in a way worth retrying
    /// (network error, rate limit, server error)
    #[error("{service} is unavailable: {message}")]
    Unavailable { service: String, message: String },

    /// An external call did not finish in time
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// The RAG path of a turn failed
    #[error("Could not answer the question: {0}")]
    RetrievalOrGeneration(#[source] Box<AppError>),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Wrap a RAG-path failure for the caller of the router.
    pub fn rag(cause: AppError) -> Self {
        AppError::RetrievalOrGeneration(Box::new(cause))
    }

    /// A transient failure from `service`.
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt of the same call could succeed.
    ///
    /// Only timeouts, [`AppError::Unavailable`] and I/O errors qualify;
    /// rejected requests, parse failures and invalid input do not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Timeout { .. } | AppError::Unavailable { .. } | AppError::Io(_)
        )
    }

    /// The underlying cause of a `RetrievalOrGeneration` error, if any.
    pub fn rag_cause(&self) -> Option<&AppError> {
        match self {
            AppError::RetrievalOrGeneration(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
