//! Durable bookkeeping of content items and ingestion outcomes.
//!
//! The metadata store sits beside the vector pipeline. Retrieval never
//! consults it, so a failing store degrades bookkeeping only.

mod sqlite;

pub use sqlite::{SqliteMetadataStore, DEFAULT_INGESTION_HISTORY};

use crate::content::{ContentItem, ContentKind};
use crate::error::Result;
use crate::ingest::{IngestReport, IngestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A stored item with its latest ingestion outcome.
#[derive(Debug, Clone)]
pub struct StoredItem {
    pub item: ContentItem,
    pub updated_at: DateTime<Utc>,
    /// Status of the most recent ingestion, if any was recorded.
    pub last_status: Option<IngestStatus>,
    /// Vectors written by the most recent ingestion.
    pub vector_count: usize,
}

/// Trait for metadata store implementations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or replace an item row.
    async fn upsert_item(&self, item: &ContentItem) -> Result<()>;

    /// Append an ingestion outcome. Stores may prune older outcomes of the
    /// same item.
    async fn record_ingestion(&self, report: &IngestReport) -> Result<()>;

    /// Get an item by identifier.
    async fn get_item(&self, id: &str) -> Result<Option<StoredItem>>;

    /// List items, most recently updated first.
    async fn list_items(&self, kind: Option<ContentKind>, limit: usize) -> Result<Vec<StoredItem>>;
}
