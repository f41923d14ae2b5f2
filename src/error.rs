//! Error types for Wayfind.

use thiserror::Error;

/// Library-level error type for Wayfind operations.
#[derive(Error, Debug)]
pub enum WayfindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content fetch failed: {0}")]
    Fetch(String),

    #[error("Transcript parse failed: {0}")]
    Parse(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Metadata store error: {0}")]
    MetadataStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Wayfind operations.
pub type Result<T> = std::result::Result<T, WayfindError>;
