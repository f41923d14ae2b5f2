//! Ingestion pipeline for Wayfind.
//!
//! Coordinates one content item through parse, chunk, embed and upsert.
//! Per-item problems never escape as errors: every call returns an
//! [`IngestReport`] describing how far the item got and what went wrong.

use crate::chunking::{Chunk, Chunker};
use crate::config::NamespaceSettings;
use crate::content::{ContentItem, ContentSource};
use crate::embedding::{BatchEmbedder, ChunkFailure};
use crate::error::{Result, WayfindError};
use crate::metadata::MetadataStore;
use crate::subtitles::{is_timed_transcript, parse_cues};
use crate::vector_store::{
    IndexedVector, Metadata, VectorIndex, CHUNK_INDEX_KEY, CONTENT_ID_KEY, KIND_KEY, TEXT_KEY,
    TITLE_KEY, URL_KEY,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of items ingested concurrently.
pub const DEFAULT_ITEM_CONCURRENCY: usize = 2;

/// Pipeline stage. On failure, the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Fetched,
    Parsed,
    Chunked,
    Embedded,
    Upserted,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Fetched => "fetched",
            IngestStage::Parsed => "parsed",
            IngestStage::Chunked => "chunked",
            IngestStage::Embedded => "embedded",
            IngestStage::Upserted => "upserted",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    /// Every chunk was upserted.
    Complete,
    /// Some chunks failed to embed; the rest were upserted.
    Partial,
    /// Nothing was upserted.
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Complete => "complete",
            IngestStatus::Partial => "partial",
            IngestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestStatus {
    type Err = WayfindError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "complete" => Ok(IngestStatus::Complete),
            "partial" => Ok(IngestStatus::Partial),
            "failed" => Ok(IngestStatus::Failed),
            other => Err(WayfindError::InvalidInput(format!(
                "Unknown ingest status: {}",
                other
            ))),
        }
    }
}

/// Outcome of ingesting one content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub content_id: String,
    /// Target namespace; unknown when the item could not be fetched.
    pub namespace: Option<String>,
    pub status: IngestStatus,
    pub stage: IngestStage,
    /// Identifiers of the vectors that were upserted.
    pub vector_ids: Vec<String>,
    pub total_chunks: usize,
    pub failures: Vec<ChunkFailure>,
    pub error: Option<String>,
}

impl IngestReport {
    fn started(content_id: &str, namespace: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            namespace: Some(namespace.to_string()),
            status: IngestStatus::Failed,
            stage: IngestStage::Fetched,
            vector_ids: Vec::new(),
            total_chunks: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    /// A report for an item that could not be obtained.
    pub fn fetch_failed(content_id: &str, error: &WayfindError) -> Self {
        Self {
            content_id: content_id.to_string(),
            namespace: None,
            status: IngestStatus::Failed,
            stage: IngestStage::Fetched,
            vector_ids: Vec::new(),
            total_chunks: 0,
            failures: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == IngestStatus::Failed
    }
}

/// Per-run ingestion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Delete every existing vector of the item before upserting, so a
    /// shrinking chunk count leaves no stale vectors behind.
    pub replace_existing: bool,
}

/// Vector identifier for a chunk. Chunked items get `{id}_chunk_{index}`,
/// single-chunk items keep the bare content id.
pub fn vector_id(content_id: &str, chunk_index: Option<usize>) -> String {
    match chunk_index {
        Some(index) => format!("{}_chunk_{}", content_id, index),
        None => content_id.to_string(),
    }
}

/// Denormalized metadata stored with each vector.
pub fn build_metadata(item: &ContentItem, chunk: &Chunk, chunked: bool) -> Metadata {
    let mut metadata = item.attributes();

    metadata.insert(CONTENT_ID_KEY.to_string(), Value::from(item.id.as_str()));
    metadata.insert(KIND_KEY.to_string(), Value::from(item.kind().as_str()));
    metadata.insert(TITLE_KEY.to_string(), Value::from(item.title.as_str()));
    if let Some(url) = &item.url {
        metadata.insert(URL_KEY.to_string(), Value::from(url.as_str()));
    }
    metadata.insert(TEXT_KEY.to_string(), Value::from(chunk.text.as_str()));
    if chunked {
        metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(chunk.index));
    }

    metadata
}

struct PreparedChunks {
    chunks: Vec<Chunk>,
    /// Whether the item was split from a transcript.
    chunked: bool,
}

/// Runs content items through parse, chunk, embed and upsert.
pub struct IngestionPipeline {
    embedder: BatchEmbedder,
    index: Arc<dyn VectorIndex>,
    metadata: Option<Arc<dyn MetadataStore>>,
    chunker: Chunker,
    namespaces: NamespaceSettings,
    item_concurrency: usize,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(embedder: BatchEmbedder, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            metadata: None,
            chunker: Chunker::default(),
            namespaces: NamespaceSettings::default(),
            item_concurrency: DEFAULT_ITEM_CONCURRENCY,
            options: IngestOptions::default(),
        }
    }

    /// Record items and outcomes in a metadata store.
    pub fn with_metadata_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(store);
        self
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceSettings) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set how many items are ingested at once.
    pub fn with_item_concurrency(mut self, concurrency: usize) -> Self {
        self.item_concurrency = concurrency.max(1);
        self
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn namespaces(&self) -> &NamespaceSettings {
        &self.namespaces
    }

    /// Split an item into the chunks that will be embedded.
    fn prepare(&self, item: &ContentItem) -> Result<PreparedChunks> {
        if is_timed_transcript(&item.body) {
            let cues: Vec<_> = parse_cues(&item.body).collect();
            if cues.is_empty() {
                return Err(WayfindError::Parse(format!(
                    "Transcript for {} contains no cues",
                    item.id
                )));
            }

            return Ok(PreparedChunks {
                chunks: self.chunker.chunk(&cues),
                chunked: true,
            });
        }

        let body = item.body.trim();
        let text = if body.is_empty() {
            item.summary()
        } else {
            body.to_string()
        };

        if text.trim().is_empty() {
            return Err(WayfindError::Parse(format!("Item {} has no text", item.id)));
        }

        Ok(PreparedChunks {
            chunks: vec![Chunk::new(0, text.trim())],
            chunked: false,
        })
    }

    /// Delete every vector belonging to an item.
    async fn remove_existing(&self, item: &ContentItem, namespace: &str) -> Result<usize> {
        let mut ids = self
            .index
            .list_ids(namespace, &format!("{}_chunk_", item.id))
            .await?;
        ids.push(vector_id(&item.id, None));

        let removed = self.index.delete(namespace, &ids).await?;
        debug!("Removed {} existing vectors for {}", removed, item.id);
        Ok(removed)
    }

    async fn run(
        &self,
        item: &ContentItem,
        namespace: &str,
        report: &mut IngestReport,
    ) -> Result<()> {
        report.stage = IngestStage::Parsed;
        let prepared = self.prepare(item)?;

        report.stage = IngestStage::Chunked;
        report.total_chunks = prepared.chunks.len();
        debug!("Prepared {} chunks", report.total_chunks);

        report.stage = IngestStage::Embedded;
        let texts: Vec<String> = prepared.chunks.iter().map(|c| c.text.clone()).collect();
        let batch = self.embedder.embed_all(&texts).await;
        report.failures = batch.failures.clone();

        if batch.is_empty() {
            return Err(WayfindError::Embedding(format!(
                "All {} chunks failed to embed",
                prepared.chunks.len()
            )));
        }

        let vectors: Vec<IndexedVector> = batch
            .embeddings
            .into_iter()
            .map(|(index, values)| {
                let chunk = &prepared.chunks[index];
                IndexedVector::new(
                    vector_id(&item.id, prepared.chunked.then_some(index)),
                    values,
                    build_metadata(item, chunk, prepared.chunked),
                )
            })
            .collect();

        report.stage = IngestStage::Upserted;
        if self.options.replace_existing {
            self.remove_existing(item, namespace).await?;
        }
        self.index.upsert(namespace, &vectors).await?;

        report.vector_ids = vectors.into_iter().map(|v| v.id).collect();
        report.status = if report.failures.is_empty() {
            IngestStatus::Complete
        } else {
            IngestStatus::Partial
        };
        Ok(())
    }

    /// Ingest one item that is already in hand.
    #[instrument(skip(self, item), fields(content_id = %item.id, kind = %item.kind()))]
    pub async fn ingest_item(&self, item: &ContentItem) -> IngestReport {
        let namespace = self.namespaces.for_kind(item.kind());
        let mut report = IngestReport::started(&item.id, namespace);

        if let Some(store) = &self.metadata {
            if let Err(e) = store.upsert_item(item).await {
                warn!("Failed to store item {}: {}", item.id, e);
            }
        }

        if let Err(e) = self.run(item, namespace, &mut report).await {
            warn!("Ingestion of {} failed at {}: {}", item.id, report.stage, e);
            report.status = IngestStatus::Failed;
            report.vector_ids.clear();
            report.error = Some(e.to_string());
        } else {
            info!(
                "Ingested {} ({}): {}/{} chunks into {}",
                item.id,
                report.status,
                report.vector_ids.len(),
                report.total_chunks,
                namespace
            );
        }

        self.record(&report).await;
        report
    }

    async fn record(&self, report: &IngestReport) {
        if let Some(store) = &self.metadata {
            if let Err(e) = store.record_ingestion(report).await {
                warn!("Failed to record ingestion of {}: {}", report.content_id, e);
            }
        }
    }

    /// Ingest many items with bounded concurrency. Reports come back in input
    /// order.
    #[instrument(skip(self, items), fields(count = items.len(), concurrency = self.item_concurrency))]
    pub async fn ingest_items(&self, items: &[ContentItem]) -> Vec<IngestReport> {
        stream::iter(items)
            .map(|item| self.ingest_item(item))
            .buffered(self.item_concurrency)
            .collect()
            .await
    }

    /// Fetch an item from a source and ingest it.
    #[instrument(skip(self, source), fields(source_name = source.name()))]
    pub async fn ingest_from_source(&self, source: &dyn ContentSource, id: &str) -> IngestReport {
        match source.fetch(id).await {
            Ok(item) => self.ingest_item(&item).await,
            Err(e) => {
                warn!("Failed to fetch {} from {}: {}", id, source.name(), e);
                let report = IngestReport::fetch_failed(id, &e);
                self.record(&report).await;
                report
            }
        }
    }

    /// Search a source and ingest every item found.
    ///
    /// A failed search is an error, so it cannot be mistaken for an empty
    /// result. Once items are in hand, per-item failures only show up in
    /// their reports.
    #[instrument(skip(self, source), fields(source_name = source.name()))]
    pub async fn ingest_search(
        &self,
        source: &dyn ContentSource,
        query: &str,
        limit: usize,
    ) -> Result<Vec<IngestReport>> {
        let items = source.search(query, limit).await.map_err(|e| {
            warn!("Search for '{}' on {} failed: {}", query, source.name(), e);
            e
        })?;

        if items.is_empty() {
            info!("No items found for '{}'", query);
        }
        Ok(self.ingest_items(&items).await)
    }
}
