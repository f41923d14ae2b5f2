//! Text generation for answering questions over retrieved context.

mod openai;

pub use openai::{OpenAIChat, DEFAULT_CHAT_MODEL};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for chat-style generation models.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete a conversation made of one system instruction and one user
    /// message. Returns the model's reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
