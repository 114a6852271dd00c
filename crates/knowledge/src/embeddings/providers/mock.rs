//! Deterministic offline embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use lexchat_core::AppResult;
use std::collections::{BTreeMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "how",
];

/// Hashes word trigrams into a unit vector.
///
/// Same text, same vector; texts sharing vocabulary land close together.
/// Useful for working against an index without a network service.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, bytes: &[u8], seed: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(*b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let lower = text.to_lowercase();

        // BTreeMap keeps accumulation order, and so float rounding, stable
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = self.bucket(trigram.as_bytes(), 37);
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = self.bucket(word.as_bytes(), 31);
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_mock_provider_embed_single() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("punishment for theft").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(384);
        let first = provider.embed("criminal breach of trust").await.unwrap();
        let second = provider.embed("criminal breach of trust").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = MockProvider::new(384);
        let query = provider.embed("punishment for theft").await.unwrap();
        let related = provider.embed("Whoever commits theft shall be punished").await.unwrap();
        let unrelated = provider.embed("Marriage registration procedure").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_mock_provider_empty_text() {
        let provider = MockProvider::new(16);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 16);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_mock_provider_utf8_safety() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("धारा 378 चोरी की परिभाषा").await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
