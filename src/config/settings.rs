//! Configuration settings for Wayfind.

use crate::chunking::DEFAULT_MAX_CHARS;
use crate::content::{ContentKind, DEFAULT_AMADEUS_API_URL, DEFAULT_YOUTUBE_API_URL};
use crate::embedding::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBED_CONCURRENCY};
use crate::error::{Result, WayfindError};
use crate::generation::DEFAULT_CHAT_MODEL;
use crate::ingest::DEFAULT_ITEM_CONCURRENCY;
use crate::metadata::DEFAULT_INGESTION_HISTORY;
use crate::openai::DEFAULT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable consulted when no Pinecone key is configured.
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";

/// Environment variable consulted when no YouTube key is configured.
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Environment variables consulted when no Amadeus credentials are configured.
pub const AMADEUS_CLIENT_ID_ENV: &str = "AMADEUS_CLIENT_ID";
pub const AMADEUS_CLIENT_SECRET_ENV: &str = "AMADEUS_CLIENT_SECRET";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub namespaces: NamespaceSettings,
    pub ingestion: IngestionSettings,
    pub rag: RagSettings,
    pub youtube: YoutubeSettings,
    pub amadeus: AmadeusSettings,
    pub metadata: MetadataSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.wayfind".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// OpenAI client settings. The API key is read from `OPENAI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Concurrent embedding requests per item. Use 1 for strict rate limits.
    pub concurrency: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS as u32,
            concurrency: DEFAULT_EMBED_CONCURRENCY,
        }
    }
}

/// Content chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub max_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// In-process store, lost on exit.
    Memory,
    #[default]
    Sqlite,
    Pinecone,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(VectorStoreProvider::Memory),
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Memory => write!(f, "memory"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Index data-plane host (for pinecone provider).
    pub pinecone_host: Option<String>,
    /// Pinecone API key; falls back to `PINECONE_API_KEY`.
    pub pinecone_api_key: Option<String>,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.wayfind/vectors.db".to_string(),
            pinecone_host: None,
            pinecone_api_key: None,
        }
    }
}

impl VectorStoreSettings {
    /// The configured Pinecone key, or the environment fallback.
    pub fn resolved_pinecone_api_key(&self) -> Option<String> {
        non_empty(self.pinecone_api_key.clone())
            .or_else(|| non_empty(std::env::var(PINECONE_API_KEY_ENV).ok()))
    }
}

/// Namespace per content domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceSettings {
    /// Video subtitles.
    pub videos: String,
    /// Flight offers, hotel offers, tours and restaurants.
    pub travel: String,
    /// Place descriptions.
    pub places: String,
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            videos: "youtube-subtitles".to_string(),
            travel: "travel-data".to_string(),
            places: "places".to_string(),
        }
    }
}

impl NamespaceSettings {
    pub fn for_kind(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::Video => &self.videos,
            ContentKind::Place => &self.places,
            ContentKind::Tour
            | ContentKind::FlightOffer
            | ContentKind::HotelOffer
            | ContentKind::Restaurant => &self.travel,
        }
    }

    /// Whether a namespace holds travel offers.
    pub fn is_travel(&self, namespace: &str) -> bool {
        namespace == self.travel
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Items ingested concurrently.
    pub item_concurrency: usize,
    /// Delete an item's existing vectors before upserting.
    pub replace_existing: bool,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            item_concurrency: DEFAULT_ITEM_CONCURRENCY,
            replace_existing: false,
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Number of matches used as context.
    pub top_k: usize,
    pub temperature: f32,
    /// Drop matches scoring below this value.
    pub min_score: Option<f32>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            top_k: 10,
            temperature: 0.7,
            min_score: None,
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key; falls back to `YOUTUBE_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Directory holding `{video_id}.srt` subtitle files.
    pub subtitles_dir: Option<String>,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_YOUTUBE_API_URL.to_string(),
            subtitles_dir: Some("~/.wayfind/subtitles".to_string()),
        }
    }
}

impl YoutubeSettings {
    /// The configured key, or the environment fallback.
    pub fn resolved_api_key(&self) -> Option<String> {
        non_empty(self.api_key.clone())
            .or_else(|| non_empty(std::env::var(YOUTUBE_API_KEY_ENV).ok()))
    }
}

/// Amadeus Self-Service API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmadeusSettings {
    /// Falls back to `AMADEUS_CLIENT_ID`.
    pub client_id: Option<String>,
    /// Falls back to `AMADEUS_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    pub base_url: String,
}

impl Default for AmadeusSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: DEFAULT_AMADEUS_API_URL.to_string(),
        }
    }
}

impl AmadeusSettings {
    /// The configured `(client_id, client_secret)` pair, with environment
    /// fallbacks for each half.
    pub fn resolved_credentials(&self) -> Option<(String, String)> {
        let id = non_empty(self.client_id.clone())
            .or_else(|| non_empty(std::env::var(AMADEUS_CLIENT_ID_ENV).ok()))?;
        let secret = non_empty(self.client_secret.clone())
            .or_else(|| non_empty(std::env::var(AMADEUS_CLIENT_SECRET_ENV).ok()))?;
        Some((id, secret))
    }
}

/// Metadata store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Record items and ingestion outcomes.
    pub enabled: bool,
    pub sqlite_path: String,
    /// Ingestion outcomes kept per item; older ones are pruned.
    pub history_limit: usize,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: "~/.wayfind/metadata.db".to_string(),
            history_limit: DEFAULT_INGESTION_HISTORY,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WayfindError::Config(e.to_string()))
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wayfind")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite vector database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    pub fn metadata_path(&self) -> PathBuf {
        Self::expand_path(&self.metadata.sqlite_path)
    }

    pub fn subtitles_dir(&self) -> Option<PathBuf> {
        self.youtube.subtitles_dir.as_deref().map(Self::expand_path)
    }
}
