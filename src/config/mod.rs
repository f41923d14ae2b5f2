//! Configuration module for Wayfind.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    AmadeusSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestionSettings, MetadataSettings,
    NamespaceSettings, OpenAISettings, PromptSettings, RagSettings, Settings, VectorStoreProvider,
    VectorStoreSettings, YoutubeSettings, AMADEUS_CLIENT_ID_ENV, AMADEUS_CLIENT_SECRET_ENV,
    PINECONE_API_KEY_ENV, YOUTUBE_API_KEY_ENV,
};
