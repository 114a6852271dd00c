//! Vector index abstraction and the in-memory flat index.

use lexchat_core::{AppError, AppResult, RetrievedChunk};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Similarity measure of an index. Higher scores are always more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    InnerProduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::InnerProduct => "inner_product",
        }
    }

    /// Score `b` against `a`. Both slices must have the same length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::InnerProduct => dot(a, b),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "inner_product" | "dot" | "ip" => Ok(Self::InnerProduct),
            other => Err(AppError::Index(format!("Unknown distance metric: {}", other))),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}

/// Trait for read-only nearest-neighbour lookup.
///
/// `search` returns at most `k` chunks in descending score order; chunks with
/// equal scores keep the order in which they were added to the index.
pub trait VectorIndex: Send + Sync {
    /// Top-k most similar chunks to `query`.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of every stored embedding.
    fn dimensions(&self) -> usize;

    fn metric(&self) -> DistanceMetric;
}

/// One stored chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub embedding: Vec<f32>,
}

/// Exhaustive-scan index held in memory.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl FlatIndex {
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            entries: Vec::new(),
            dimensions,
            metric,
        }
    }

    /// Append an entry. Insertion order is the tie-break order for search.
    pub fn push(&mut self, entry: IndexEntry) -> AppResult<()> {
        if entry.embedding.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Embedding has {} dimensions, index expects {}",
                entry.embedding.len(),
                self.dimensions
            )));
        }

        if entry.embedding.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Index(
                "Embedding contains non-finite values".to_string(),
            ));
        }

        self.entries.push(entry);
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>> {
        if query.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let score = self.metric.score(query, &entry.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        // Stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        tracing::debug!(
            "Flat search over {} chunks returned {} (requested top-{})",
            self.entries.len(),
            scored.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                RetrievedChunk::new(entry.text.clone(), score).with_metadata(entry.metadata.clone())
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
