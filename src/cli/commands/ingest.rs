//! Ingest command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, TravelSearch};
use crate::components::Components;
use crate::config::Settings;
use crate::content::{
    extract_video_id, ActivitySearch, ContentSource, FlightSearch, HotelSearch, JsonFileSource,
};
use crate::ingest::IngestReport;
use anyhow::Result;
use std::path::Path;

fn preflight(operation: Operation, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(operation, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    Ok(())
}

/// Fail the command when nothing was ingested.
fn finish(reports: &[IngestReport]) -> Result<()> {
    if reports.len() > 1 {
        Output::report_summary(reports);
    }

    if !reports.is_empty() && reports.iter().all(IngestReport::is_failed) {
        return Err(anyhow::anyhow!("No items were ingested"));
    }
    Ok(())
}

/// Run the ingest-video command.
pub async fn run_ingest_video(input: &str, settings: Settings) -> Result<()> {
    preflight(Operation::IngestYoutube, &settings)?;

    let video_id = extract_video_id(input)
        .ok_or_else(|| anyhow::anyhow!("Not a YouTube URL or video id: {}", input))?;

    let components = Components::from_settings(settings)?;
    let source = components.youtube_source()?;
    let pipeline = components.ingestion_pipeline();

    Output::info(&format!("Processing: {}", video_id));
    let spinner = Output::spinner("Ingesting...");
    let report = pipeline.ingest_from_source(&source, &video_id).await;
    spinner.finish_and_clear();

    Output::report(&report);
    finish(&[report])
}

/// Run the ingest-search command.
pub async fn run_ingest_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    preflight(Operation::IngestYoutube, &settings)?;

    let components = Components::from_settings(settings)?;
    let source = components.youtube_source()?;
    let pipeline = components.ingestion_pipeline();

    let spinner = Output::spinner(&format!("Searching {} for '{}'...", source.name(), query));
    let reports = pipeline.ingest_search(&source, query, limit).await;
    spinner.finish_and_clear();

    let reports = match reports {
        Ok(reports) => reports,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if reports.is_empty() {
        Output::warning("No videos found.");
        return Ok(());
    }

    reports.iter().for_each(Output::report);
    finish(&reports)
}

/// Run the ingest-channel command.
pub async fn run_ingest_channel(channel_id: &str, limit: usize, settings: Settings) -> Result<()> {
    preflight(Operation::IngestYoutube, &settings)?;

    let components = Components::from_settings(settings)?;
    let source = components.youtube_source()?;
    let pipeline = components.ingestion_pipeline();

    let spinner = Output::spinner("Fetching channel uploads...");
    let items = source.list_channel(channel_id, limit).await;
    spinner.finish_and_clear();

    let items = match items {
        Ok(items) => items,
        Err(e) => {
            Output::error(&format!("Failed to list channel: {}", e));
            return Err(e.into());
        }
    };

    if items.is_empty() {
        Output::warning("No videos found in channel.");
        return Ok(());
    }

    Output::info(&format!("Found {} videos to ingest", items.len()));
    let spinner = Output::spinner("Ingesting...");
    let reports = pipeline.ingest_items(&items).await;
    spinner.finish_and_clear();

    reports.iter().for_each(Output::report);
    finish(&reports)
}

/// Run the ingest-travel command.
pub async fn run_ingest_travel(search: &TravelSearch, settings: Settings) -> Result<()> {
    preflight(Operation::IngestTravel, &settings)?;

    let components = Components::from_settings(settings)?;
    let source = components.amadeus_source()?;
    let pipeline = components.ingestion_pipeline();

    let spinner = Output::spinner("Searching Amadeus...");
    let items = match search {
        TravelSearch::Flights {
            origin,
            destination,
            departure_date,
            return_date,
            adults,
            limit,
        } => {
            let mut query = FlightSearch::new(origin, destination, departure_date);
            query.return_date = return_date.clone();
            query.adults = *adults;
            query.max = *limit;
            source.search_flights(&query).await
        }
        TravelSearch::Hotels {
            city_code,
            check_in,
            check_out,
            adults,
            limit,
        } => {
            let mut query = HotelSearch::in_city(city_code);
            query.check_in_date = check_in.clone();
            query.check_out_date = check_out.clone();
            query.adults = *adults;
            query.limit = *limit;
            source.search_hotels(&query).await
        }
        TravelSearch::Activities {
            latitude,
            longitude,
            radius,
        } => {
            source
                .search_activities(&ActivitySearch {
                    latitude: *latitude,
                    longitude: *longitude,
                    radius_km: *radius,
                })
                .await
        }
    };
    spinner.finish_and_clear();

    let items = match items {
        Ok(items) => items,
        Err(e) => {
            Output::error(&format!("Amadeus search failed: {}", e));
            return Err(e.into());
        }
    };

    if items.is_empty() {
        Output::warning("No travel offers found.");
        return Ok(());
    }

    Output::info(&format!("Found {} offers to ingest", items.len()));
    let spinner = Output::spinner("Ingesting...");
    let reports = pipeline.ingest_items(&items).await;
    spinner.finish_and_clear();

    reports.iter().for_each(Output::report);
    finish(&reports)
}

/// Run the ingest-file command.
pub async fn run_ingest_file(path: &str, settings: Settings) -> Result<()> {
    preflight(Operation::IngestFile, &settings)?;

    let source = JsonFileSource::load(&Settings::expand_path(path))?;
    if source.items().is_empty() {
        Output::warning(&format!("No items in {}", Path::new(path).display()));
        return Ok(());
    }

    let components = Components::from_settings(settings)?;
    let pipeline = components.ingestion_pipeline();

    Output::info(&format!("Ingesting {} items", source.items().len()));
    let spinner = Output::spinner("Ingesting...");
    let reports = pipeline.ingest_items(source.items()).await;
    spinner.finish_and_clear();

    reports.iter().for_each(Output::report);
    finish(&reports)
}
