//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, rank, validate_top_k, IndexedVector, Metadata, SearchMatch, VectorIndex,
};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Entry {
    values: Vec<f32>,
    metadata: Metadata,
    seq: u64,
}

type Namespaces = HashMap<String, HashMap<String, Entry>>;

/// In-memory vector store.
pub struct MemoryVectorStore {
    namespaces: RwLock<Namespaces>,
    next_seq: AtomicU64,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Namespaces>> {
        self.namespaces
            .read()
            .map_err(|e| WayfindError::Index(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Namespaces>> {
        self.namespaces
            .write()
            .map_err(|e| WayfindError::Index(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorStore {
    async fn upsert(&self, namespace: &str, vectors: &[IndexedVector]) -> Result<usize> {
        let mut namespaces = self.write()?;
        let store = namespaces.entry(namespace.to_string()).or_default();

        for vector in vectors {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            store.insert(
                vector.id.clone(),
                Entry {
                    values: vector.values.clone(),
                    metadata: vector.metadata.clone(),
                    seq,
                },
            );
        }

        Ok(vectors.len())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        validate_top_k(top_k)?;
        let namespaces = self.read()?;

        let Some(store) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let candidates = store
            .iter()
            .map(|(id, entry)| {
                let score = cosine_similarity(vector, &entry.values);
                let metadata = if include_metadata {
                    entry.metadata.clone()
                } else {
                    Metadata::new()
                };
                (
                    entry.seq,
                    SearchMatch {
                        id: id.clone(),
                        score,
                        metadata,
                    },
                )
            })
            .collect();

        Ok(rank(candidates, top_k))
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
        let mut namespaces = self.write()?;
        let Some(store) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };

        Ok(ids.iter().filter(|id| store.remove(id.as_str()).is_some()).count())
    }

    async fn list_ids(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
        let namespaces = self.read()?;
        let mut ids: Vec<String> = namespaces
            .get(namespace)
            .map(|store| {
                store
                    .keys()
                    .filter(|id| id.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let namespaces = self.read()?;
        Ok(namespaces.get(namespace).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn vector(id: &str, values: Vec<f32>, text: &str) -> IndexedVector {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), Value::from(text));
        IndexedVector::new(id, values, metadata)
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        store
            .upsert(
                "videos",
                &[
                    vector("v1_chunk_0", vec![1.0, 0.0, 0.0], "Hello world"),
                    vector("v1_chunk_1", vec![0.0, 1.0, 0.0], "Goodbye world"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.count("videos").await.unwrap(), 2);

        let results = store.query("videos", &[1.0, 0.0, 0.0], 10, true).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].text(), Some("Hello world"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_wholesale() {
        let store = MemoryVectorStore::new();
        let mut first = vector("a", vec![1.0, 0.0], "first");
        first
            .metadata
            .insert("extra".to_string(), Value::from("only in first"));

        store.upsert("ns", &[first]).await.unwrap();
        store
            .upsert("ns", &[vector("a", vec![0.0, 1.0], "second")])
            .await
            .unwrap();

        assert_eq!(store.count("ns").await.unwrap(), 1);
        let results = store.query("ns", &[0.0, 1.0], 1, true).await.unwrap();
        assert_eq!(results[0].text(), Some("second"));
        assert!(!results[0].metadata.contains_key("extra"));
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = MemoryVectorStore::new();
        store
            .upsert("youtube-subtitles", &[vector("v", vec![1.0, 0.0], "video")])
            .await
            .unwrap();
        store
            .upsert("travel-data", &[vector("t", vec![1.0, 0.0], "travel")])
            .await
            .unwrap();

        let results = store.query("travel-data", &[1.0, 0.0], 10, true).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "t");

        assert!(store.query("missing", &[1.0, 0.0], 10, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_top_k_and_metadata_flag() {
        let store = MemoryVectorStore::new();
        let vectors: Vec<IndexedVector> = (0..5)
            .map(|i| vector(&format!("id{}", i), vec![1.0, i as f32], "t"))
            .collect();
        store.upsert("ns", &vectors).await.unwrap();

        let results = store.query("ns", &[1.0, 0.0], 3, false).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|m| m.metadata.is_empty()));

        let all = store.query("ns", &[1.0, 0.0], 50, true).await.unwrap();
        assert_eq!(all.len(), 5);

        assert!(store.query("ns", &[1.0, 0.0], 0, true).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_list_ids() {
        let store = MemoryVectorStore::new();
        store
            .upsert(
                "ns",
                &[
                    vector("abc_chunk_0", vec![1.0], "a"),
                    vector("abc_chunk_1", vec![1.0], "b"),
                    vector("abcd_chunk_0", vec![1.0], "c"),
                ],
            )
            .await
            .unwrap();

        let ids = store.list_ids("ns", "abc_chunk_").await.unwrap();
        assert_eq!(ids, vec!["abc_chunk_0", "abc_chunk_1"]);

        let deleted = store
            .delete("ns", &["abc_chunk_0".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count("ns").await.unwrap(), 2);
    }
}
