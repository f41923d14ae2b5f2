//! CLI command implementations.

mod ask;
mod config;
mod ingest;
mod list;
mod search;

pub use ask::run_ask;
pub use config::run_config;
pub use ingest::{
    run_ingest_channel, run_ingest_file, run_ingest_search, run_ingest_travel, run_ingest_video,
};
pub use list::run_list;
pub use search::run_search;
