//! Bounded-concurrency batch embedding.
//!
//! Chunks are embedded through a worker pool of configurable width. Results
//! are keyed by the chunk's original index, so completion order never affects
//! which vector belongs to which chunk, and a failed chunk only removes itself
//! from the output.

use super::Embedder;
use crate::error::{Result, WayfindError};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of in-flight embedding requests.
pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// A chunk that could not be embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    /// Original index of the chunk.
    pub index: usize,
    /// Error message.
    pub error: String,
}

/// Result of embedding a batch of chunks.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBatch {
    /// Embeddings keyed by original chunk index.
    pub embeddings: BTreeMap<usize, Vec<f32>>,
    /// Chunks that failed, ordered by index.
    pub failures: Vec<ChunkFailure>,
}

impl EmbeddingBatch {
    /// Whether every chunk was embedded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether no chunk was embedded.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Embeds many texts with a bounded number of concurrent requests.
#[derive(Clone)]
pub struct BatchEmbedder {
    embedder: Arc<dyn Embedder>,
    concurrency: usize,
}

impl BatchEmbedder {
    /// Wrap an embedder with the default concurrency.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            concurrency: DEFAULT_EMBED_CONCURRENCY,
        }
    }

    /// Set the worker pool width. Use 1 when the provider enforces strict
    /// per-key rate limits.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Embed a single text, rejecting vectors of the wrong length.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(text).await?;
        let expected = self.embedder.dimensions();

        if embedding.len() != expected {
            return Err(WayfindError::Embedding(format!(
                "Expected {} dimensions, got {}",
                expected,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    /// Embed every text. Never fails as a whole; per-text failures are
    /// recorded in [`EmbeddingBatch::failures`].
    #[instrument(skip(self, texts), fields(count = texts.len(), concurrency = self.concurrency))]
    pub async fn embed_all(&self, texts: &[String]) -> EmbeddingBatch {
        let mut batch = EmbeddingBatch::default();

        let mut stream = stream::iter(texts.iter().enumerate())
            .map(|(index, text)| async move { (index, self.embed_query(text).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = stream.next().await {
            match result {
                Ok(embedding) => {
                    batch.embeddings.insert(index, embedding);
                }
                Err(e) => {
                    warn!("Embedding failed for chunk {}: {}", index, e);
                    batch.failures.push(ChunkFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        batch.failures.sort_by_key(|f| f.index);
        debug!(
            "Embedded {}/{} chunks",
            batch.embeddings.len(),
            texts.len()
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbedder;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("chunk number {}", i)).collect()
    }

    #[tokio::test]
    async fn test_all_chunks_embedded_in_index_order() {
        let fake = Arc::new(FakeEmbedder::new(8).with_delay_ms(5));
        let batcher = BatchEmbedder::new(fake.clone()).with_concurrency(3);
        let inputs = texts(6);

        let batch = batcher.embed_all(&inputs).await;

        assert!(batch.is_complete());
        assert_eq!(batch.embeddings.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
        for (index, embedding) in &batch.embeddings {
            assert_eq!(embedding, &FakeEmbedder::vector_for(&inputs[*index], 8));
        }
    }

    #[tokio::test]
    async fn test_slow_first_chunk_keeps_its_index() {
        let inputs = texts(5);
        let fake = Arc::new(FakeEmbedder::new(8).with_delay_for(&inputs[0], 50));
        let batcher = BatchEmbedder::new(fake.clone()).with_concurrency(4);

        let batch = batcher.embed_all(&inputs).await;

        assert_eq!(fake.completion_order().last(), Some(&inputs[0]));
        assert!(batch.is_complete());
        assert_eq!(batch.embeddings.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        for (index, embedding) in &batch.embeddings {
            assert_eq!(embedding, &FakeEmbedder::vector_for(&inputs[*index], 8));
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let fake = Arc::new(FakeEmbedder::new(4).failing_on(["chunk number 2", "chunk number 4"]));
        let batcher = BatchEmbedder::new(fake);

        let batch = batcher.embed_all(&texts(5)).await;

        assert_eq!(batch.embeddings.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(
            batch.failures.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert!(!batch.is_complete());
        assert!(!batch.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimensions_are_rejected() {
        let fake = Arc::new(FakeEmbedder::new(4).with_reported_dimensions(16));
        let batcher = BatchEmbedder::new(fake);

        let err = batcher.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, WayfindError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batcher = BatchEmbedder::new(Arc::new(FakeEmbedder::new(4)));
        let batch = batcher.embed_all(&[]).await;

        assert!(batch.is_empty());
        assert!(batch.is_complete());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let batcher = BatchEmbedder::new(Arc::new(FakeEmbedder::new(4))).with_concurrency(0);
        assert_eq!(batcher.concurrency(), 1);
    }
}
