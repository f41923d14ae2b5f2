//! Chunking of cues and text fragments into embeddable pieces.

mod greedy;

pub use greedy::Chunker;

use serde::{Deserialize, Serialize};

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// A contiguous block of text submitted for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position of this chunk within its content item.
    pub index: usize,
    /// Chunk text, never with leading or trailing whitespace.
    pub text: String,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters. A single fragment longer than
    /// this is still emitted whole.
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}
