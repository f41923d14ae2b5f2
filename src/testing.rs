//! Test doubles for the embedding and generation seams.

use crate::embedding::Embedder;
use crate::error::{Result, WayfindError};
use crate::generation::Generator;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic embedder: the same text always maps to the same vector.
pub struct FakeEmbedder {
    dimensions: usize,
    reported_dimensions: Option<usize>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    fail_all: bool,
    overrides: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    completed: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            reported_dimensions: None,
            delay: None,
            delays: HashMap::new(),
            failing: HashSet::new(),
            fail_all: false,
            overrides: HashMap::new(),
            calls: AtomicUsize::new(0),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, so concurrent calls complete out of order.
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// Sleep `ms` before answering for `text` only. Overrides the default delay.
    pub fn with_delay_for(mut self, text: &str, ms: u64) -> Self {
        self.delays.insert(text.to_string(), Duration::from_millis(ms));
        self
    }

    /// Fail for these exact texts.
    pub fn failing_on<'a>(mut self, texts: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(texts.into_iter().map(str::to_string));
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Report a different dimension count than the vectors actually have.
    pub fn with_reported_dimensions(mut self, dimensions: usize) -> Self {
        self.reported_dimensions = Some(dimensions);
        self
    }

    /// Return `vector` for `text` instead of the derived one.
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts in the order their calls finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    /// The vector this fake produces for `text`.
    pub fn vector_for(text: &str, dimensions: usize) -> Vec<f32> {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }

        (0..dimensions)
            .map(|i| {
                let mixed = hash.rotate_left((i % 64) as u32) ^ (i as u64).wrapping_mul(0x9e3779b97f4a7c15);
                (mixed % 1000) as f32 / 1000.0 + 0.001
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(text).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.completed.lock().unwrap().push(text.to_string());

        if self.fail_all || self.failing.contains(text) {
            return Err(WayfindError::Embedding(format!("Fake failure for '{}'", text)));
        }

        Ok(self
            .overrides
            .get(text)
            .cloned()
            .unwrap_or_else(|| Self::vector_for(text, self.dimensions)))
    }

    fn dimensions(&self) -> usize {
        self.reported_dimensions.unwrap_or(self.dimensions)
    }
}

/// Generator that returns a canned reply and records every prompt.
pub struct FakeGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Recorded `(system, user)` prompt pairs.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        self.reply
            .clone()
            .ok_or_else(|| WayfindError::Generation("Fake generation failure".to_string()))
    }
}
