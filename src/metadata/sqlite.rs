//! SQLite metadata store.

use super::{MetadataStore, StoredItem};
use crate::content::{ContentDetails, ContentItem, ContentKind};
use crate::error::{Result, WayfindError};
use crate::ingest::{IngestReport, IngestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS content_items (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        url TEXT,
        details TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_content_items_kind ON content_items(kind);

    CREATE TABLE IF NOT EXISTS ingestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id TEXT NOT NULL,
        namespace TEXT,
        status TEXT NOT NULL,
        stage TEXT NOT NULL,
        vector_count INTEGER NOT NULL,
        total_chunks INTEGER NOT NULL,
        failed_chunks INTEGER NOT NULL,
        error TEXT,
        ingested_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_ingestions_content_id ON ingestions(content_id);
"#;

const SELECT_ITEMS: &str = r#"
    SELECT c.id, c.title, c.body, c.url, c.details, c.updated_at,
           i.status, COALESCE(i.vector_count, 0)
    FROM content_items c
    LEFT JOIN ingestions i ON i.id = (
        SELECT MAX(id) FROM ingestions WHERE content_id = c.id
    )
"#;

/// Ingestion rows kept per content item by default.
pub const DEFAULT_INGESTION_HISTORY: usize = 10;

/// SQLite-backed metadata store.
///
/// Only the latest `history_limit` ingestion rows of each item are kept;
/// older rows are pruned whenever a new outcome is recorded.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
    history_limit: usize,
}

impl SqliteMetadataStore {
    /// Open (or create) the store at `path`.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized metadata store at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
            history_limit: DEFAULT_INGESTION_HISTORY,
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            history_limit: DEFAULT_INGESTION_HISTORY,
        })
    }

    /// Keep at most `limit` ingestion rows per item (at least one).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| WayfindError::MetadataStore(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<(ContentItemRow, Option<String>, i64)> {
        Ok((
            ContentItemRow {
                id: row.get(0)?,
                title: row.get(1)?,
                body: row.get(2)?,
                url: row.get(3)?,
                details: row.get(4)?,
                updated_at: row.get(5)?,
            },
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn into_stored(
        (row, status, vector_count): (ContentItemRow, Option<String>, i64),
    ) -> Result<StoredItem> {
        let details: ContentDetails = serde_json::from_str(&row.details)?;
        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| WayfindError::MetadataStore(format!("Bad timestamp: {}", e)))?;

        Ok(StoredItem {
            item: ContentItem {
                id: row.id,
                title: row.title,
                body: row.body,
                url: row.url,
                details,
            },
            updated_at,
            last_status: status
                .as_deref()
                .map(str::parse::<IngestStatus>)
                .transpose()?,
            vector_count: vector_count as usize,
        })
    }
}

struct ContentItemRow {
    id: String,
    title: String,
    body: String,
    url: Option<String>,
    details: String,
    updated_at: String,
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn upsert_item(&self, item: &ContentItem) -> Result<()> {
        let conn = self.lock()?;
        let details = serde_json::to_string(&item.details)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO content_items (id, kind, title, body, url, details, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                item.id,
                item.kind().as_str(),
                item.title,
                item.body,
                item.url,
                details,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Stored item {}", item.id);
        Ok(())
    }

    async fn record_ingestion(&self, report: &IngestReport) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO ingestions
                (content_id, namespace, status, stage, vector_count, total_chunks,
                 failed_chunks, error, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                report.content_id,
                report.namespace,
                report.status.as_str(),
                report.stage.as_str(),
                report.vector_ids.len() as i64,
                report.total_chunks as i64,
                report.failures.len() as i64,
                report.error,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let pruned = conn.execute(
            r#"
            DELETE FROM ingestions
            WHERE content_id = ?1 AND id NOT IN (
                SELECT id FROM ingestions WHERE content_id = ?1 ORDER BY id DESC LIMIT ?2
            )
            "#,
            params![report.content_id, self.history_limit as i64],
        )?;
        if pruned > 0 {
            debug!("Pruned {} old ingestions of {}", pruned, report.content_id);
        }

        Ok(())
    }

    async fn get_item(&self, id: &str) -> Result<Option<StoredItem>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                &format!("{} WHERE c.id = ?1", SELECT_ITEMS),
                params![id],
                Self::row_to_stored,
            )
            .optional()?;

        row.map(Self::into_stored).transpose()
    }

    async fn list_items(&self, kind: Option<ContentKind>, limit: usize) -> Result<Vec<StoredItem>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR c.kind = ?1) ORDER BY c.updated_at DESC, c.rowid DESC LIMIT ?2",
            SELECT_ITEMS
        ))?;

        let rows = stmt
            .query_map(
                params![kind.map(|k| k.as_str()), limit as i64],
                Self::row_to_stored,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::into_stored).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestStage;

    fn report(content_id: &str, status: IngestStatus, vectors: usize) -> IngestReport {
        IngestReport {
            content_id: content_id.to_string(),
            namespace: Some("travel-data".to_string()),
            status,
            stage: IngestStage::Upserted,
            vector_ids: (0..vectors).map(|i| format!("{}_chunk_{}", content_id, i)).collect(),
            total_chunks: vectors,
            failures: Vec::new(),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_item() {
        let store = SqliteMetadataStore::in_memory().unwrap();
        let item = ContentItem::restaurant("Chez Nous", "40.00", "EUR");

        store.upsert_item(&item).await.unwrap();
        store.upsert_item(&item).await.unwrap();

        let stored = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.item, item);
        assert_eq!(stored.last_status, None);
        assert!(store.get_item("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_ingestion_wins() {
        let store = SqliteMetadataStore::in_memory().unwrap();
        let item = ContentItem::restaurant("Chez Nous", "40.00", "EUR");
        store.upsert_item(&item).await.unwrap();

        store
            .record_ingestion(&report(&item.id, IngestStatus::Partial, 1))
            .await
            .unwrap();
        store
            .record_ingestion(&report(&item.id, IngestStatus::Complete, 3))
            .await
            .unwrap();

        let stored = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.last_status, Some(IngestStatus::Complete));
        assert_eq!(stored.vector_count, 3);
    }

    #[tokio::test]
    async fn test_ingestion_history_is_bounded_per_item() {
        let store = SqliteMetadataStore::in_memory()
            .unwrap()
            .with_history_limit(3);
        let item = ContentItem::restaurant("Chez Nous", "40.00", "EUR");
        let other = ContentItem::restaurant("Le Bistro", "30.00", "EUR");
        store.upsert_item(&item).await.unwrap();
        store.upsert_item(&other).await.unwrap();

        store
            .record_ingestion(&report(&other.id, IngestStatus::Complete, 1))
            .await
            .unwrap();
        for vectors in 1..=6 {
            store
                .record_ingestion(&report(&item.id, IngestStatus::Complete, vectors))
                .await
                .unwrap();
        }

        let count = |id: &str| -> i64 {
            store
                .lock()
                .unwrap()
                .query_row(
                    "SELECT COUNT(*) FROM ingestions WHERE content_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .unwrap()
        };
        assert_eq!(count(&item.id), 3);
        assert_eq!(count(&other.id), 1);

        let stored = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.vector_count, 6);
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMetadataStore::new(&dir.path().join("meta.db")).unwrap();

        store
            .upsert_item(&ContentItem::restaurant("A", "1", "EUR"))
            .await
            .unwrap();
        store
            .upsert_item(&ContentItem::restaurant("B", "2", "EUR"))
            .await
            .unwrap();

        let all = store.list_items(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);

        let restaurants = store
            .list_items(Some(ContentKind::Restaurant), 1)
            .await
            .unwrap();
        assert_eq!(restaurants.len(), 1);

        assert!(store
            .list_items(Some(ContentKind::Video), 10)
            .await
            .unwrap()
            .is_empty());
    }
}
