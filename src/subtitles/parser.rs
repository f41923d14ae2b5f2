//! Lazy cue parser.
//!
//! Blocks look like:
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:02,000
//! Hello world
//!
//! ```
//!
//! The index line is optional (WebVTT omits it). Blocks without a timing line
//! are skipped so a partially corrupt file still yields every valid cue.

use super::Cue;
use regex::{Match, Regex};
use std::str::Lines;
use std::sync::LazyLock;
use tracing::debug;

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+):)?(\d{1,2}):(\d{2})[,.](\d{1,3})\s*-->\s*(?:(\d+):)?(\d{1,2}):(\d{2})[,.](\d{1,3})(?:\s.*)?$",
    )
    .expect("Invalid cue timing regex")
});

/// Parse a transcript into cues.
///
/// Nothing is parsed until the iterator is advanced. Clone the returned
/// iterator (or call this again) to restart from the first cue.
pub fn parse_cues(transcript: &str) -> Cues<'_> {
    Cues {
        lines: transcript.lines(),
        position: 0,
    }
}

/// Whether `body` looks like a timed-caption transcript.
pub fn is_timed_transcript(body: &str) -> bool {
    body.lines().any(|line| parse_timing(line).is_some())
}

/// Iterator over the cues of a transcript.
#[derive(Debug, Clone)]
pub struct Cues<'a> {
    lines: Lines<'a>,
    position: usize,
}

impl<'a> Cues<'a> {
    fn next_line(&mut self) -> Option<&'a str> {
        self.lines.next().map(str::trim)
    }

    /// True when the upcoming lines open a new block without a blank separator.
    fn at_block_start(&self) -> bool {
        let mut ahead = self.lines.clone();
        match ahead.next().map(str::trim) {
            Some(line) if parse_timing(line).is_some() => true,
            Some(line) if is_index(line) => ahead
                .next()
                .map(str::trim)
                .is_some_and(|next| parse_timing(next).is_some()),
            _ => false,
        }
    }

    /// Discard the rest of the current block.
    fn skip_block(&mut self) {
        loop {
            if self.at_block_start() {
                return;
            }
            match self.next_line() {
                Some(line) if !line.is_empty() => {}
                _ => return,
            }
        }
    }
}

impl<'a> Iterator for Cues<'a> {
    type Item = Cue;

    fn next(&mut self) -> Option<Cue> {
        loop {
            let first = loop {
                let line = self.next_line()?;
                if !line.is_empty() {
                    break line;
                }
            };

            let timing_line = if is_index(first) {
                match self.next_line() {
                    Some(line) if !line.is_empty() => line,
                    _ => {
                        debug!("Skipping cue block {} with no timing line", first);
                        continue;
                    }
                }
            } else {
                first
            };

            let Some((start_seconds, end_seconds)) = parse_timing(timing_line) else {
                debug!("Skipping malformed cue block starting with {:?}", first);
                self.skip_block();
                continue;
            };

            let mut parts = Vec::new();
            while !self.at_block_start() {
                match self.next_line() {
                    Some(line) if !line.is_empty() => parts.push(line),
                    _ => break,
                }
            }

            let text = parts.join(" ");
            if text.is_empty() {
                continue;
            }

            let cue = Cue {
                position: self.position,
                start_seconds,
                end_seconds,
                text,
            };
            self.position += 1;
            return Some(cue);
        }
    }
}

fn is_index(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a `start --> end` line into seconds.
fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let caps = TIMING.captures(line.trim())?;
    let start = timestamp_seconds(caps.get(1), &caps[2], &caps[3], &caps[4]);
    let end = timestamp_seconds(caps.get(5), &caps[6], &caps[7], &caps[8]);
    Some((start, end))
}

fn timestamp_seconds(hours: Option<Match<'_>>, minutes: &str, seconds: &str, millis: &str) -> f64 {
    let hours: f64 = hours.and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    let minutes: f64 = minutes.parse().unwrap_or(0.0);
    let seconds: f64 = seconds.parse().unwrap_or(0.0);
    // "5" after the separator means 500ms, not 5ms
    let millis: f64 = format!("{:0<3}", millis).parse().unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_CUES: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello world\n\n2\n00:00:02,000 --> 00:00:04,500\nThis spans\ntwo lines\n\n3\n00:00:04,500 --> 00:00:06,000\nGoodbye\n";

    fn texts(transcript: &str) -> Vec<String> {
        parse_cues(transcript).map(|c| c.text).collect()
    }

    #[test]
    fn test_three_well_formed_cues() {
        let cues: Vec<Cue> = parse_cues(THREE_CUES).collect();

        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "Hello world");
        assert_eq!(cues[1].text, "This spans two lines");
        assert_eq!(cues[2].text, "Goodbye");
        assert_eq!(cues[2].position, 2);
        assert!((cues[1].end_seconds - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let transcript = "1\n00:00:00,000 --> 00:00:01,000\nFirst\n\n2\nNo timing here\n\n3\n00:00:02,000 --> 00:00:03,000\nThird\n";

        assert_eq!(texts(transcript), vec!["First", "Third"]);
    }

    #[test]
    fn test_empty_cue_text_is_dropped() {
        let transcript = "1\n00:00:00,000 --> 00:00:01,000\n   \n\n2\n00:00:01,000 --> 00:00:02,000\nKept\n";

        let cues: Vec<Cue> = parse_cues(transcript).collect();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Kept");
        assert_eq!(cues[0].position, 0);
    }

    #[test]
    fn test_missing_blank_separator() {
        let transcript = "1\n00:00:00,000 --> 00:00:01,000\nFirst\n2\n00:00:01,000 --> 00:00:02,000\nSecond\n";

        assert_eq!(texts(transcript), vec!["First", "Second"]);
    }

    #[test]
    fn test_webvtt_and_crlf() {
        let transcript = "WEBVTT\r\n\r\n00:01.000 --> 00:02.500 align:start\r\nBonjour\r\n\r\n01:00:00.000 --> 01:00:01.000\r\nAu revoir\r\n";

        let cues: Vec<Cue> = parse_cues(transcript).collect();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Bonjour");
        assert!((cues[0].start_seconds - 1.0).abs() < 1e-9);
        assert!((cues[1].start_seconds - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let cues = parse_cues(THREE_CUES);
        let first_pass: Vec<String> = cues.clone().map(|c| c.text).collect();
        let second_pass: Vec<String> = cues.map(|c| c.text).collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(texts("").is_empty());
        assert!(texts("just some words\nand more words").is_empty());
    }

    #[test]
    fn test_is_timed_transcript() {
        assert!(is_timed_transcript(THREE_CUES));
        assert!(!is_timed_transcript("A plain description of a hotel."));
    }
}
