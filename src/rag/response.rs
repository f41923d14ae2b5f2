//! RAG response generation.

use super::{assemble_context, AnswerStatus, RagResponse};
use crate::config::{NamespaceSettings, Prompts};
use crate::embedding::{BatchEmbedder, Embedder};
use crate::error::Result;
use crate::generation::Generator;
use crate::vector_store::{SearchMatch, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Answer returned when the query cannot be embedded or the index is down.
pub const UNAVAILABLE_ANSWER: &str =
    "The assistant is temporarily unavailable. Please try again later.";

/// Answer returned when the namespace has nothing relevant.
pub const NO_MATCHES_ANSWER: &str = "I couldn't find any relevant information for this question.";

/// Answer returned when the generation model fails.
pub const GENERATION_FALLBACK_ANSWER: &str =
    "Sorry, I couldn't process your request at the moment.";

const DEFAULT_TOP_K: usize = 10;

/// Query embedding, similarity search and answer generation.
pub struct RetrievalPipeline {
    embedder: BatchEmbedder,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    namespaces: NamespaceSettings,
    top_k: usize,
    min_score: Option<f32>,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder: BatchEmbedder::new(embedder),
            index,
            generator,
            prompts: Prompts::default(),
            namespaces: NamespaceSettings::default(),
            top_k: DEFAULT_TOP_K,
            min_score: None,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceSettings) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Number of matches used as context.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Drop matches scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn namespaces(&self) -> &NamespaceSettings {
        &self.namespaces
    }

    /// Embed `query` and return the closest matches in `namespace`.
    ///
    /// Unlike [`ask_in`](Self::ask_in), failures are returned as errors.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn search(
        &self,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchMatch>> {
        let vector = self.embedder.embed_query(query).await?;
        let matches = self.index.query(namespace, &vector, top_k, true).await?;

        Ok(match self.min_score {
            Some(min) => matches.into_iter().filter(|m| m.score >= min).collect(),
            None => matches,
        })
    }

    /// Answer a question from the video subtitles namespace.
    pub async fn ask(&self, question: &str) -> RagResponse {
        let namespace = self.namespaces.videos.clone();
        self.ask_in(&namespace, question).await
    }

    /// Answer a question from one namespace.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn ask_in(&self, namespace: &str, question: &str) -> RagResponse {
        info!("Processing question: {}", question);

        let vector = match self.embedder.embed_query(question).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Query embedding failed: {}", e);
                return RagResponse::degraded(AnswerStatus::Unavailable, UNAVAILABLE_ANSWER);
            }
        };

        let matches = match self.index.query(namespace, &vector, self.top_k, true).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Index query failed: {}", e);
                return RagResponse::degraded(AnswerStatus::Unavailable, UNAVAILABLE_ANSWER);
            }
        };

        let matches: Vec<SearchMatch> = match self.min_score {
            Some(min) => matches.into_iter().filter(|m| m.score >= min).collect(),
            None => matches,
        };

        if matches.is_empty() {
            return RagResponse::degraded(AnswerStatus::NoMatches, NO_MATCHES_ANSWER);
        }

        let context = assemble_context(&matches);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);
        let system = if self.namespaces.is_travel(namespace) {
            &self.prompts.rag.travel_system
        } else {
            &self.prompts.rag.system
        };

        let answer = match self.generator.complete(system, &user_prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Generation returned an empty answer");
                return RagResponse {
                    answer: GENERATION_FALLBACK_ANSWER.to_string(),
                    matches,
                    status: AnswerStatus::GenerationFailed,
                };
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                return RagResponse {
                    answer: GENERATION_FALLBACK_ANSWER.to_string(),
                    matches,
                    status: AnswerStatus::GenerationFailed,
                };
            }
        };

        debug!("Generated response with {} sources", matches.len());

        RagResponse {
            answer,
            matches,
            status: AnswerStatus::Answered,
        }
    }
}
