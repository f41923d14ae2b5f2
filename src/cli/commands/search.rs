//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::components::Components;
use crate::config::Settings;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    namespace: Option<String>,
    limit: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let components = Components::from_settings(settings)?;
    let pipeline = components.retrieval_pipeline();
    let namespace = namespace.unwrap_or_else(|| pipeline.namespaces().videos.clone());

    let spinner = Output::spinner("Searching...");
    let results = pipeline.search(&namespace, query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(matches) => {
            if matches.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results in {}", matches.len(), namespace));

                for m in &matches {
                    Output::search_result(
                        m.title().unwrap_or(&m.id),
                        m.score,
                        m.text().unwrap_or_default(),
                        m.url(),
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
