//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::components::Components;
use crate::config::Settings;
use crate::rag::AnswerStatus;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    namespace: Option<String>,
    top_k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let components = Components::from_settings(settings)?;
    let mut pipeline = components.retrieval_pipeline();
    if let Some(top_k) = top_k {
        pipeline = pipeline.with_top_k(top_k);
    }
    let namespace = namespace.unwrap_or_else(|| pipeline.namespaces().videos.clone());

    let spinner = Output::spinner("Searching knowledge base...");
    let response = pipeline.ask_in(&namespace, question).await;
    spinner.finish_and_clear();

    match response.status {
        AnswerStatus::Answered | AnswerStatus::NoMatches => {
            println!("\n{}\n", response.format_for_display());
        }
        AnswerStatus::GenerationFailed => {
            Output::warning(&response.answer);
        }
        AnswerStatus::Unavailable => {
            Output::error(&response.answer);
            return Err(anyhow::anyhow!("Retrieval unavailable"));
        }
    }

    Ok(())
}
