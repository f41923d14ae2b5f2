//! Greedy length-bounded packing.
//!
//! Fragments are appended to a running buffer, separated by a single space.
//! When the next fragment would push the buffer past the limit the buffer is
//! closed and the fragment starts a new one. Fragments are never split.

use super::{Chunk, ChunkingConfig};

/// Greedy chunker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Create a chunker with a custom maximum length.
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self::new(ChunkingConfig { max_chars })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Pack fragments into chunks, preserving their order.
    pub fn chunk<I, S>(&self, fragments: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let max = self.config.max_chars;
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for fragment in fragments {
            let fragment = fragment.as_ref().trim();
            if fragment.is_empty() {
                continue;
            }
            let fragment_len = fragment.chars().count();

            if buffer.is_empty() {
                buffer.push_str(fragment);
                buffer_len = fragment_len;
                continue;
            }

            if buffer_len + 1 + fragment_len > max {
                chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut buffer)));
                buffer.push_str(fragment);
                buffer_len = fragment_len;
            } else {
                buffer.push(' ');
                buffer.push_str(fragment);
                buffer_len += 1 + fragment_len;
            }
        }

        if !buffer.is_empty() {
            chunks.push(Chunk::new(chunks.len(), buffer));
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, len: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let c = (b'a' + (i % 26) as u8) as char;
                std::iter::repeat(c).take(len).collect()
            })
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.chunk(Vec::<String>::new()).is_empty());
        assert!(chunker.chunk(["", "   "]).is_empty());
    }

    #[test]
    fn test_small_fragments_share_a_chunk() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk(["Hello world", "Goodbye"]);

        assert_eq!(chunks, vec![Chunk::new(0, "Hello world Goodbye")]);
    }

    #[test]
    fn test_chunks_respect_max_length() {
        let chunker = Chunker::with_max_chars(50);
        let fragments = words(40, 9);
        let chunks = chunker.chunk(&fragments);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 50, "chunk too long: {}", chunk.char_len());
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_order_and_content_are_preserved() {
        let chunker = Chunker::with_max_chars(30);
        let fragments = words(25, 7);
        let chunks = chunker.chunk(&fragments);

        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.text.split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect();
        assert_eq!(rejoined, fragments);
    }

    #[test]
    fn test_oversized_fragment_is_kept_whole() {
        let chunker = Chunker::with_max_chars(10);
        let long = "x".repeat(25);
        let chunks = chunker.chunk(["short", long.as_str(), "tail"]);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "short");
        assert_eq!(chunks[1].text, long);
        assert_eq!(chunks[2].text, "tail");
    }

    #[test]
    fn test_exact_fit_boundary() {
        // "aaaa bbbb" is 9 characters: fits in 9, not in 8
        assert_eq!(Chunker::with_max_chars(9).chunk(["aaaa", "bbbb"]).len(), 1);
        assert_eq!(Chunker::with_max_chars(8).chunk(["aaaa", "bbbb"]).len(), 2);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = Chunker::with_max_chars(40);
        let fragments = words(30, 6);

        assert_eq!(chunker.chunk(&fragments), chunker.chunk(&fragments));
    }

    #[test]
    fn test_no_leading_or_trailing_whitespace() {
        let chunker = Chunker::with_max_chars(12);
        for chunk in chunker.chunk(["  alpha ", "beta", " gamma  ", "delta"]) {
            assert_eq!(chunk.text, chunk.text.trim());
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // each fragment is 4 characters but 8 bytes
        let chunker = Chunker::with_max_chars(9);
        let chunks = chunker.chunk(["ßßßß", "éééé"]);

        assert_eq!(chunks.len(), 1);
    }
}
