//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Embeds a question, retrieves similar chunks from one namespace, and asks
//! the generation model to answer from them. Per-query failures degrade into
//! an [`AnswerStatus`] instead of an error.

pub mod context;
mod response;

pub use context::{assemble_context, format_sources_for_display};
pub use response::{
    RetrievalPipeline, GENERATION_FALLBACK_ANSWER, NO_MATCHES_ANSWER, UNAVAILABLE_ANSWER,
};

use crate::vector_store::SearchMatch;
use serde::Serialize;

/// How a question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The model answered from retrieved context.
    Answered,
    /// The namespace returned no matches; the model was not called.
    NoMatches,
    /// Embedding or index lookup failed.
    Unavailable,
    /// Retrieval worked but generation failed.
    GenerationFailed,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Answered => "answered",
            AnswerStatus::NoMatches => "no_matches",
            AnswerStatus::Unavailable => "unavailable",
            AnswerStatus::GenerationFailed => "generation_failed",
        }
    }
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer, or a static message when degraded.
    pub answer: String,
    /// Matches used as context, in descending score order.
    pub matches: Vec<SearchMatch>,
    pub status: AnswerStatus,
}

impl RagResponse {
    pub(crate) fn degraded(status: AnswerStatus, answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            matches: Vec::new(),
            status,
        }
    }

    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.matches.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            output.push_str(&format_sources_for_display(&self.matches));
        }

        output
    }
}
