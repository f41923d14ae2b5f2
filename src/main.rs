//! Wayfind CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wayfind::cli::{commands, Cli, Commands};
use wayfind::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging; -v flags override the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("wayfind={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::IngestVideo { input } => {
            commands::run_ingest_video(input, settings).await?;
        }

        Commands::IngestSearch { query, limit } => {
            commands::run_ingest_search(query, *limit, settings).await?;
        }

        Commands::IngestChannel { channel_id, limit } => {
            commands::run_ingest_channel(channel_id, *limit, settings).await?;
        }

        Commands::IngestTravel { search } => {
            commands::run_ingest_travel(search, settings).await?;
        }

        Commands::IngestFile { path } => {
            commands::run_ingest_file(path, settings).await?;
        }

        Commands::Ask {
            question,
            namespace,
            top_k,
        } => {
            commands::run_ask(question, namespace.clone(), *top_k, settings).await?;
        }

        Commands::Search {
            query,
            namespace,
            limit,
        } => {
            commands::run_search(query, namespace.clone(), *limit, settings).await?;
        }

        Commands::List { kind, limit } => {
            commands::run_list(kind.clone(), *limit, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
