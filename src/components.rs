//! Client construction from settings.
//!
//! Every collaborator is built once here and handed to the pipelines as an
//! `Arc<dyn Trait>`.

use crate::chunking::Chunker;
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::content::{AmadeusSource, YoutubeSource};
use crate::embedding::{BatchEmbedder, Embedder, OpenAIEmbedder};
use crate::error::{Result, WayfindError};
use crate::generation::{Generator, OpenAIChat};
use crate::ingest::{IngestOptions, IngestionPipeline};
use crate::metadata::{MetadataStore, SqliteMetadataStore};
use crate::openai::create_client_with_timeout;
use crate::rag::RetrievalPipeline;
use crate::vector_store::{MemoryVectorStore, PineconeIndex, SqliteVectorStore, VectorIndex};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The shared clients of one Wayfind process.
pub struct Components {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Arc<dyn VectorIndex>,
    metadata: Option<Arc<dyn MetadataStore>>,
}

impl Components {
    /// Build every client described by `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client =
            create_client_with_timeout(Duration::from_secs(settings.openai.timeout_secs))?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            client.clone(),
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let generator: Arc<dyn Generator> = Arc::new(
            OpenAIChat::new(client, &settings.rag.model).with_temperature(settings.rag.temperature),
        );

        let index = build_index(&settings)?;
        let metadata = build_metadata_store(&settings)?;

        Ok(Self::with_components(
            settings, prompts, embedder, generator, index, metadata,
        ))
    }

    /// Assemble from already-built clients.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
        metadata: Option<Arc<dyn MetadataStore>>,
    ) -> Self {
        Self {
            settings,
            prompts,
            embedder,
            generator,
            index,
            metadata,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        Arc::clone(&self.index)
    }

    pub fn metadata_store(&self) -> Option<Arc<dyn MetadataStore>> {
        self.metadata.clone()
    }

    /// A YouTube source, or a config error when no API key is available.
    pub fn youtube_source(&self) -> Result<YoutubeSource> {
        let youtube = &self.settings.youtube;
        let api_key = youtube.resolved_api_key().ok_or_else(|| {
            WayfindError::Config(
                "YouTube API key not configured. Set youtube.api_key or YOUTUBE_API_KEY."
                    .to_string(),
            )
        })?;

        let mut source = YoutubeSource::new(api_key)?.with_base_url(&youtube.base_url)?;
        if let Some(dir) = self.settings.subtitles_dir() {
            source = source.with_subtitles_dir(dir);
        }
        Ok(source)
    }

    /// An Amadeus source, or a config error when credentials are missing.
    pub fn amadeus_source(&self) -> Result<AmadeusSource> {
        let amadeus = &self.settings.amadeus;
        let (client_id, client_secret) = amadeus.resolved_credentials().ok_or_else(|| {
            WayfindError::Config(
                "Amadeus credentials not configured. Set amadeus.client_id and amadeus.client_secret, or AMADEUS_CLIENT_ID and AMADEUS_CLIENT_SECRET."
                    .to_string(),
            )
        })?;

        AmadeusSource::new(client_id, client_secret)?.with_base_url(&amadeus.base_url)
    }

    pub fn ingestion_pipeline(&self) -> IngestionPipeline {
        let embedder = BatchEmbedder::new(Arc::clone(&self.embedder))
            .with_concurrency(self.settings.embedding.concurrency);

        let mut pipeline = IngestionPipeline::new(embedder, self.index())
            .with_chunker(Chunker::with_max_chars(self.settings.chunking.max_chars))
            .with_namespaces(self.settings.namespaces.clone())
            .with_item_concurrency(self.settings.ingestion.item_concurrency)
            .with_options(IngestOptions {
                replace_existing: self.settings.ingestion.replace_existing,
            });

        if let Some(store) = self.metadata_store() {
            pipeline = pipeline.with_metadata_store(store);
        }
        pipeline
    }

    pub fn retrieval_pipeline(&self) -> RetrievalPipeline {
        RetrievalPipeline::new(
            Arc::clone(&self.embedder),
            self.index(),
            Arc::clone(&self.generator),
        )
        .with_prompts(self.prompts.clone())
        .with_namespaces(self.settings.namespaces.clone())
        .with_top_k(self.settings.rag.top_k)
        .with_min_score(self.settings.rag.min_score)
    }
}

/// Build the configured vector index.
pub fn build_index(settings: &Settings) -> Result<Arc<dyn VectorIndex>> {
    let store = &settings.vector_store;
    info!("Using {} vector store", store.provider);

    Ok(match store.provider {
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Pinecone => {
            let host = store.pinecone_host.as_deref().ok_or_else(|| {
                WayfindError::Config("vector_store.pinecone_host is not set".to_string())
            })?;
            let api_key = store.resolved_pinecone_api_key().ok_or_else(|| {
                WayfindError::Config(
                    "Pinecone API key not configured. Set vector_store.pinecone_api_key or PINECONE_API_KEY."
                        .to_string(),
                )
            })?;
            Arc::new(PineconeIndex::new(host, api_key)?)
        }
    })
}

/// Build the metadata store, or `None` when disabled.
pub fn build_metadata_store(settings: &Settings) -> Result<Option<Arc<dyn MetadataStore>>> {
    if !settings.metadata.enabled {
        return Ok(None);
    }
    let store = SqliteMetadataStore::new(&settings.metadata_path())?
        .with_history_limit(settings.metadata.history_limit);
    Ok(Some(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use crate::ingest::IngestStatus;
    use crate::rag::AnswerStatus;
    use crate::testing::{FakeEmbedder, FakeGenerator};

    fn settings_in(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.vector_store.sqlite_path = dir.join("vectors.db").display().to_string();
        settings.metadata.sqlite_path = dir.join("metadata.db").display().to_string();
        settings
    }

    #[test]
    fn test_pinecone_requires_host() {
        let mut settings = Settings::default();
        settings.vector_store.provider = VectorStoreProvider::Pinecone;
        settings.vector_store.pinecone_api_key = Some("key".to_string());

        let err = build_index(&settings).err().unwrap();
        assert!(matches!(err, WayfindError::Config(_)));
    }

    #[test]
    fn test_metadata_store_can_be_disabled() {
        let mut settings = Settings::default();
        settings.metadata.enabled = false;
        assert!(build_metadata_store(&settings).unwrap().is_none());
    }

    #[test]
    fn test_youtube_source_requires_key() {
        let mut settings = Settings::default();
        settings.youtube.api_key = Some("yt-key".to_string());
        settings.vector_store.provider = VectorStoreProvider::Memory;
        settings.metadata.enabled = false;

        let components = Components::with_components(
            settings,
            Prompts::default(),
            Arc::new(FakeEmbedder::new(4)),
            Arc::new(FakeGenerator::new("ok")),
            Arc::new(MemoryVectorStore::new()),
            None,
        );
        assert!(components.youtube_source().is_ok());
    }

    #[test]
    fn test_amadeus_source_uses_configured_credentials() {
        let mut settings = Settings::default();
        settings.amadeus.client_id = Some("amadeus-id".to_string());
        settings.amadeus.client_secret = Some("amadeus-secret".to_string());
        settings.metadata.enabled = false;

        let components = Components::with_components(
            settings,
            Prompts::default(),
            Arc::new(FakeEmbedder::new(4)),
            Arc::new(FakeGenerator::new("ok")),
            Arc::new(MemoryVectorStore::new()),
            None,
        );
        assert!(components.amadeus_source().is_ok());
    }

    #[tokio::test]
    async fn test_pipelines_share_one_index() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let index = build_index(&settings).unwrap();
        let metadata = build_metadata_store(&settings).unwrap();

        let components = Components::with_components(
            settings,
            Prompts::default(),
            Arc::new(FakeEmbedder::new(8)),
            Arc::new(FakeGenerator::new("Eat at Chez Nous.")),
            index,
            metadata,
        );

        let item = ContentItem::restaurant("Chez Nous", "40.00", "EUR");
        let report = components.ingestion_pipeline().ingest_item(&item).await;
        assert_eq!(report.status, IngestStatus::Complete);

        let response = components
            .retrieval_pipeline()
            .ask_in("travel-data", "Where should I eat?")
            .await;
        assert_eq!(response.status, AnswerStatus::Answered);
        assert_eq!(response.matches[0].id, item.id);

        let stored = components
            .metadata_store()
            .unwrap()
            .get_item(&item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.vector_count, 1);
    }
}
