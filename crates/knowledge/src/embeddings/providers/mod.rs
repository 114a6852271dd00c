//! Embedding provider implementations.

pub mod gemini;
pub mod mock;
pub mod ollama;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;

/// Check that a returned vector has the configured size.
pub(crate) fn check_dimensions(
    provider: &str,
    embedding: &[f32],
    expected: usize,
) -> lexchat_core::AppResult<()> {
    if embedding.len() != expected {
        return Err(lexchat_core::AppError::Embedding(format!(
            "{} returned {} dimensions, expected {}",
            provider,
            embedding.len(),
            expected
        )));
    }
    Ok(())
}
