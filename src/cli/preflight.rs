//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials are available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, WayfindError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingesting from YouTube needs the OpenAI and YouTube keys.
    IngestYoutube,
    /// Ingesting from Amadeus needs the OpenAI key and Amadeus credentials.
    IngestTravel,
    /// Ingesting a local export needs the OpenAI key.
    IngestFile,
    /// Asking and searching embed the query.
    Ask,
    /// Listing reads local metadata only.
    List,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::IngestYoutube => {
            check_api_key()?;
            check_youtube_key(settings)?;
        }
        Operation::IngestTravel => {
            check_api_key()?;
            check_amadeus_credentials(settings)?;
        }
        Operation::IngestFile | Operation::Ask => {
            check_api_key()?;
        }
        Operation::List => {
            if !settings.metadata.enabled {
                return Err(WayfindError::Config(
                    "Listing requires the metadata store. Set metadata.enabled = true.".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(WayfindError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(WayfindError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_youtube_key(settings: &Settings) -> Result<()> {
    settings
        .youtube
        .resolved_api_key()
        .map(|_| ())
        .ok_or_else(|| {
            WayfindError::Config(
                "YouTube API key not set. Add youtube.api_key to the config or export YOUTUBE_API_KEY."
                    .to_string(),
            )
        })
}

fn check_amadeus_credentials(settings: &Settings) -> Result<()> {
    settings
        .amadeus
        .resolved_credentials()
        .map(|_| ())
        .ok_or_else(|| {
            WayfindError::Config(
                "Amadeus credentials not set. Add amadeus.client_id and amadeus.client_secret to the config or export AMADEUS_CLIENT_ID and AMADEUS_CLIENT_SECRET."
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_requires_metadata_store() {
        let mut settings = Settings::default();
        assert!(check(Operation::List, &settings).is_ok());

        settings.metadata.enabled = false;
        assert!(check(Operation::List, &settings).is_err());
    }

    #[test]
    fn test_configured_youtube_key_passes() {
        let mut settings = Settings::default();
        settings.youtube.api_key = Some("yt-key".to_string());
        assert!(check_youtube_key(&settings).is_ok());
    }

    #[test]
    fn test_amadeus_needs_both_halves() {
        let mut settings = Settings::default();
        settings.amadeus.client_id = Some("amadeus-id".to_string());
        settings.amadeus.client_secret = Some("amadeus-secret".to_string());
        assert!(check_amadeus_credentials(&settings).is_ok());

        settings.amadeus.client_secret = Some("  ".to_string());
        if std::env::var(crate::config::AMADEUS_CLIENT_SECRET_ENV).is_err() {
            assert!(check_amadeus_credentials(&settings).is_err());
        }
    }
}
