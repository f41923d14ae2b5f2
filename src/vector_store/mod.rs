//! Vector index abstraction for Wayfind.
//!
//! Provides a trait-based interface over namespace-partitioned vector
//! backends. A namespace isolates one content domain: a query against one
//! namespace never sees vectors from another.
//!
//! Ordering: matches are sorted by descending score. The local backends
//! break ties by write recency, most recent first. Pinecone keeps whatever
//! order the service returns for equal scores.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorStore;

use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Denormalized fields stored next to each vector.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the embedded chunk text.
pub const TEXT_KEY: &str = "text";
/// Metadata key holding the content item title.
pub const TITLE_KEY: &str = "title";
/// Metadata key holding the content item URL.
pub const URL_KEY: &str = "url";
/// Metadata key holding the content item identifier.
pub const CONTENT_ID_KEY: &str = "content_id";
/// Metadata key holding the content kind.
pub const KIND_KEY: &str = "kind";
/// Metadata key holding the chunk index (chunked items only).
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// The unit stored in a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    /// Vector identifier, unique within a namespace.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Denormalized metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexedVector {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }
}

/// A query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Vector identifier.
    pub id: String,
    /// Similarity score (higher is more similar).
    pub score: f32,
    /// Copy of the stored metadata; empty when metadata was not requested.
    #[serde(default)]
    pub metadata: Metadata,
}

impl SearchMatch {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The stored chunk text.
    pub fn text(&self) -> Option<&str> {
        self.metadata_str(TEXT_KEY)
    }

    /// The content item title.
    pub fn title(&self) -> Option<&str> {
        self.metadata_str(TITLE_KEY)
    }

    /// The content item URL.
    pub fn url(&self) -> Option<&str> {
        self.metadata_str(URL_KEY)
    }
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite vectors by id. Existing values and metadata are
    /// replaced wholesale, never merged. Returns the number written.
    async fn upsert(&self, namespace: &str, vectors: &[IndexedVector]) -> Result<usize>;

    /// Return up to `top_k` matches ordered by descending score.
    ///
    /// `top_k` must be positive. A `top_k` larger than the namespace returns
    /// every vector in it.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>>;

    /// Delete vectors by id. Returns the number of ids processed.
    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize>;

    /// List vector ids starting with `prefix`.
    async fn list_ids(&self, namespace: &str, prefix: &str) -> Result<Vec<String>>;

    /// Number of vectors in a namespace.
    async fn count(&self, namespace: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

pub(crate) fn validate_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(WayfindError::InvalidInput(
            "top_k must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Sort candidates by score, newest write first on ties, and keep `top_k`.
///
/// Each candidate carries the write sequence number of its vector.
pub(crate) fn rank(mut candidates: Vec<(u64, SearchMatch)>, top_k: usize) -> Vec<SearchMatch> {
    candidates.sort_by(|(seq_a, a), (seq_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| seq_b.cmp(seq_a))
    });
    candidates.truncate(top_k);
    candidates.into_iter().map(|(_, m)| m).collect()
}
