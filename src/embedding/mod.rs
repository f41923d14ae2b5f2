//! Embedding generation for semantic search and retrieval.

mod batch;
mod openai;

pub use batch::{BatchEmbedder, ChunkFailure, EmbeddingBatch, DEFAULT_EMBED_CONCURRENCY};
pub use openai::{OpenAIEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Implementations call a remote model, so every call may be slow, rate
/// limited or fail transiently.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
