//! CLI module for Wayfind.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Wayfind - content ingestion and retrieval-augmented answers
///
/// Indexes video subtitles and travel offers into a vector index and answers
/// questions from what it finds there.
#[derive(Parser, Debug)]
#[command(name = "wayfind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest one YouTube video by URL or id
    IngestVideo {
        /// YouTube URL or video id
        input: String,
    },

    /// Search YouTube and ingest every video found
    IngestSearch {
        /// Search keywords
        query: String,

        /// Maximum number of videos
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Ingest the latest uploads of a YouTube channel
    IngestChannel {
        /// Channel id
        channel_id: String,

        /// Maximum number of videos
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search Amadeus and ingest the travel offers found
    IngestTravel {
        #[command(subcommand)]
        search: TravelSearch,
    },

    /// Ingest a JSON travel export
    IngestFile {
        /// Path to the export
        path: String,
    },

    /// Ask a question and get an answer from the indexed content
    Ask {
        /// The question to ask
        question: String,

        /// Namespace to search (defaults to the video namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Number of context matches
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search for matching chunks without generating an answer
    Search {
        /// Search query
        query: String,

        /// Namespace to search (defaults to the video namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List ingested items
    List {
        /// Only items of this kind (video, place, tour, flight-offer, hotel-offer, restaurant)
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum number of items
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum TravelSearch {
    /// Flight offers between two airports or cities
    Flights {
        /// Origin IATA code
        origin: String,

        /// Destination IATA code
        destination: String,

        /// Departure date (YYYY-MM-DD)
        departure_date: String,

        /// Return date (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<String>,

        /// Number of adult travelers
        #[arg(short, long, default_value = "1")]
        adults: u32,

        /// Maximum number of offers
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Hotel offers in a city
    Hotels {
        /// IATA city code, e.g. PAR
        city_code: String,

        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        check_in: Option<String>,

        /// Check-out date (YYYY-MM-DD)
        #[arg(long)]
        check_out: Option<String>,

        /// Number of adult guests
        #[arg(short, long, default_value = "1")]
        adults: u32,

        /// Maximum number of hotels
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Tours and activities around a point
    Activities {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,

        /// Search radius in kilometers
        #[arg(short, long)]
        radius: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_namespace() {
        let cli = Cli::parse_from([
            "wayfind",
            "-v",
            "ask",
            "Where to stay in Porto?",
            "--namespace",
            "travel-data",
            "-k",
            "3",
        ]);

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ask {
                question,
                namespace,
                top_k,
            } => {
                assert_eq!(question, "Where to stay in Porto?");
                assert_eq!(namespace.as_deref(), Some("travel-data"));
                assert_eq!(top_k, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_travel_activities() {
        let cli = Cli::parse_from([
            "wayfind",
            "ingest-travel",
            "activities",
            "--latitude",
            "38.72",
            "--longitude",
            "-9.14",
            "-r",
            "2",
        ]);

        match cli.command {
            Commands::IngestTravel {
                search:
                    TravelSearch::Activities {
                        latitude,
                        longitude,
                        radius,
                    },
            } => {
                assert_eq!(latitude, 38.72);
                assert_eq!(longitude, -9.14);
                assert_eq!(radius, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_search_default_limit() {
        let cli = Cli::parse_from(["wayfind", "ingest-search", "lisbon food"]);
        assert!(matches!(
            cli.command,
            Commands::IngestSearch { limit: 10, .. }
        ));
    }
}
