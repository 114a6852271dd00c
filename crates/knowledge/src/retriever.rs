//! Query-time retrieval: embed the query, then search the index.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::VectorIndex;
use lexchat_core::{AppError, AppResult, CallPolicy, RetrievedChunk};
use std::sync::Arc;

/// Wraps an embedder and a vector index.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    policy: CallPolicy,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            policy: CallPolicy::default(),
            min_score: None,
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drop chunks scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Fails with [`AppError::Retrieval`] for an empty query, `k == 0`, an
    /// embedding of the wrong size or with non-finite values, or an
    /// embedder/index failure.
    pub async fn fetch(&self, query: &str, k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Retrieval("Query is empty".to_string()));
        }
        if k == 0 {
            return Err(AppError::Retrieval("k must be at least 1".to_string()));
        }

        let embedding = self
            .policy
            .run("embed", || self.embedder.embed(query))
            .await
            .map_err(|e| AppError::Retrieval(e.to_string()))?;

        if embedding.len() != self.index.dimensions() {
            return Err(AppError::Retrieval(format!(
                "Embedding from {} has {} dimensions but the index has {}",
                self.embedder.model_name(),
                embedding.len(),
                self.index.dimensions()
            )));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Retrieval(format!(
                "Embedding from {} contains non-finite values",
                self.embedder.model_name()
            )));
        }

        let embedding = Arc::new(embedding);
        let mut chunks = self
            .policy
            .run("search", || {
                let index = Arc::clone(&self.index);
                let embedding = Arc::clone(&embedding);
                async move {
                    tokio::task::spawn_blocking(move || index.search(&embedding, k))
                        .await
                        .map_err(|e| AppError::Index(format!("Search task failed: {}", e)))?
                }
            })
            .await
            .map_err(|e| AppError::Retrieval(e.to_string()))?;

        chunks.truncate(k);
        if let Some(min_score) = self.min_score {
            chunks.retain(|chunk| chunk.score >= min_score);
        }

        tracing::debug!("Retrieved {} chunks (k = {})", chunks.len(), k);

        Ok(chunks)
    }
}
