//! Knowledge retrieval for LexChat.
//!
//! Loads a pre-built, read-only vector index and answers similarity queries
//! against it using a query-time embedding provider.

pub mod embeddings;
pub mod retriever;
pub mod store;
pub mod vector_index;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use retriever::Retriever;
pub use store::{load_index, StoredIndex};
pub use vector_index::{DistanceMetric, FlatIndex, IndexEntry, VectorIndex};
