//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large datasets, use the Pinecone backend.

use super::{
    cosine_similarity, rank, validate_top_k, IndexedVector, Metadata, SearchMatch, VectorIndex,
};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vectors (
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (namespace, id)
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| WayfindError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorStore {
    #[instrument(skip(self, vectors), fields(count = vectors.len()))]
    async fn upsert(&self, namespace: &str, vectors: &[IndexedVector]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for vector in vectors {
            let metadata = serde_json::to_string(&vector.metadata)?;

            // REPLACE deletes the old row, so the rowid doubles as write recency
            tx.execute(
                r#"
                INSERT OR REPLACE INTO vectors (namespace, id, embedding, metadata, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    namespace,
                    vector.id,
                    Self::embedding_to_bytes(&vector.values),
                    metadata,
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} vectors into {}", vectors.len(), namespace);
        Ok(vectors.len())
    }

    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        validate_top_k(top_k)?;
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT rowid, id, embedding, metadata FROM vectors WHERE namespace = ?1",
        )?;

        let rows = stmt.query_map(params![namespace], |row| {
            let rowid: i64 = row.get(0)?;
            let id: String = row.get(1)?;
            let embedding: Vec<u8> = row.get(2)?;
            let metadata: String = row.get(3)?;
            Ok((rowid, id, embedding, metadata))
        })?;

        let mut candidates = Vec::new();
        for row in rows {
            let (rowid, id, embedding, metadata_json) = row?;
            let score = cosine_similarity(vector, &Self::bytes_to_embedding(&embedding));
            let metadata = if include_metadata {
                serde_json::from_str::<Metadata>(&metadata_json)?
            } else {
                Metadata::new()
            };
            candidates.push((rowid as u64, SearchMatch { id, score, metadata }));
        }

        let results = rank(candidates, top_k);
        debug!("Found {} matching vectors", results.len());
        Ok(results)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM vectors WHERE namespace = ?1 AND id = ?2",
                params![namespace, id],
            )?;
        }

        tx.commit()?;
        info!("Deleted {} vectors from {}", deleted, namespace);
        Ok(deleted)
    }

    async fn list_ids(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id FROM vectors
            WHERE namespace = ?1 AND substr(id, 1, length(?2)) = ?2
            ORDER BY id
            "#,
        )?;

        let ids = stmt
            .query_map(params![namespace, prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vectors WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
