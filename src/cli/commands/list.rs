//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::components::build_metadata_store;
use crate::config::Settings;
use crate::content::ContentKind;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(kind: Option<String>, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::List, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let kind = kind.as_deref().map(str::parse::<ContentKind>).transpose()?;
    let store = build_metadata_store(&settings)?
        .ok_or_else(|| anyhow::anyhow!("Metadata store is disabled"))?;

    match store.list_items(kind, limit).await {
        Ok(items) => {
            if items.is_empty() {
                Output::info("Nothing ingested yet. Use 'wayfind ingest-video <url>' to add content.");
            } else {
                Output::header(&format!("Ingested Items ({})", items.len()));
                println!();

                for stored in &items {
                    Output::item_info(
                        &stored.item.title,
                        &stored.item.id,
                        stored.item.kind().as_str(),
                        stored.last_status.map(|s| s.as_str()),
                        stored.vector_count,
                    );
                }

                let total_vectors: usize = items.iter().map(|s| s.vector_count).sum();
                println!();
                Output::kv("Total items", &items.len().to_string());
                Output::kv("Total vectors", &total_vectors.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list items: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
