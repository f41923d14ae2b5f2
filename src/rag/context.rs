//! Context assembly for RAG responses.

use crate::vector_store::SearchMatch;

/// Join the matches' chunk text with newlines, keeping their order.
///
/// Matches without text metadata contribute nothing.
pub fn assemble_context(matches: &[SearchMatch]) -> String {
    matches
        .iter()
        .filter_map(SearchMatch::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format matches for display to the user.
pub fn format_sources_for_display(matches: &[SearchMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let url_part = m
                .url()
                .map(|u| format!("\n  Link: {}", u))
                .unwrap_or_default();

            format!(
                "[{}] {} (score: {:.2}){}",
                i + 1,
                m.title().unwrap_or(&m.id),
                m.score,
                url_part
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Metadata, TEXT_KEY, TITLE_KEY, URL_KEY};
    use serde_json::json;

    fn search_match(id: &str, score: f32, text: Option<&str>) -> SearchMatch {
        let mut metadata = Metadata::new();
        if let Some(text) = text {
            metadata.insert(TEXT_KEY.to_string(), json!(text));
        }
        SearchMatch {
            id: id.to_string(),
            score,
            metadata,
        }
    }

    #[test]
    fn test_context_keeps_match_order() {
        let matches = vec![
            search_match("a", 0.9, Some("first")),
            search_match("b", 0.5, None),
            search_match("c", 0.2, Some("second")),
        ];

        assert_eq!(assemble_context(&matches), "first\nsecond");
        assert_eq!(assemble_context(&[]), "");
    }

    #[test]
    fn test_display_falls_back_to_id() {
        let mut titled = search_match("v1_chunk_0", 0.87, Some("x"));
        titled.metadata.insert(TITLE_KEY.to_string(), json!("Lisbon walk"));
        titled
            .metadata
            .insert(URL_KEY.to_string(), json!("https://youtube.com/watch?v=v1"));
        let bare = search_match("T1", 0.5, Some("y"));

        let display = format_sources_for_display(&[titled, bare]);
        assert_eq!(
            display,
            "[1] Lisbon walk (score: 0.87)\n  Link: https://youtube.com/watch?v=v1\n[2] T1 (score: 0.50)"
        );
    }
}
