//! Wayfind - content ingestion and retrieval-augmented answers
//!
//! Wayfind turns video subtitles and travel offers into namespaced vector
//! indexes and answers questions from them.
//!
//! # Overview
//!
//! - Parse timed subtitle files into cues and pack them into bounded chunks
//! - Embed chunks with bounded concurrency, isolating per-chunk failures
//! - Store vectors in memory, SQLite or Pinecone, one namespace per domain
//! - Answer questions from retrieved context with a chat model
//!
//! # Architecture
//!
//! - `subtitles` - SRT-style cue parsing
//! - `chunking` - greedy size-bounded chunking
//! - `embedding` - `Embedder` trait, OpenAI embedder, batch embedding
//! - `vector_store` - `VectorIndex` trait and backends
//! - `content` - content items, YouTube, Amadeus and JSON export sources
//! - `metadata` - item and ingestion bookkeeping
//! - `ingest` - the ingestion pipeline
//! - `generation` - `Generator` trait and OpenAI chat
//! - `rag` - the retrieval pipeline
//! - `components` - client construction from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use wayfind::components::Components;
//! use wayfind::config::Settings;
//! use wayfind::content::ContentItem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let components = Components::from_settings(Settings::load()?)?;
//!
//!     let item = ContentItem::restaurant("Taberna da Rua", "35.00", "EUR");
//!     let report = components.ingestion_pipeline().ingest_item(&item).await;
//!     println!("{}: {} vectors", report.status, report.vector_ids.len());
//!
//!     let response = components
//!         .retrieval_pipeline()
//!         .ask_in("travel-data", "Where can I eat in Lisbon?")
//!         .await;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod components;
pub mod config;
pub mod content;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod metadata;
pub mod openai;
pub mod rag;
pub mod subtitles;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, WayfindError};
