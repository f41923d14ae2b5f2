//! Timed-caption transcripts (SRT / WebVTT).
//!
//! Turns a raw subtitle file into an ordered sequence of plain-text cues that
//! the chunker can pack.

mod parser;

pub use parser::{is_timed_transcript, parse_cues, Cues};

use serde::{Deserialize, Serialize};

/// A single caption cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Zero-based position among the cues that were kept.
    pub position: usize,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Trimmed cue text, multi-line bodies joined with a single space.
    pub text: String,
}

impl AsRef<str> for Cue {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
