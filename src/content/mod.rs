//! Content items and the sources that produce them.
//!
//! A [`ContentItem`] carries a tagged per-kind payload. The kind of an item is
//! derived from that payload, so the two can never disagree.

mod amadeus;
mod file;
mod travel;
mod youtube;

pub use amadeus::{
    ActivitySearch, AmadeusSource, FlightSearch, HotelSearch, DEFAULT_AMADEUS_API_URL,
    DEFAULT_TRAVEL_SEARCH_LIMIT,
};
pub use file::JsonFileSource;
pub use travel::{FlightOfferRecord, HotelOfferRecord, RestaurantRecord, TourOfferRecord};
pub use youtube::{extract_video_id, watch_url, YoutubeSource, DEFAULT_YOUTUBE_API_URL};

use crate::error::{Result, WayfindError};
use crate::vector_store::Metadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Video,
    Place,
    Tour,
    FlightOffer,
    HotelOffer,
    Restaurant,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Video,
        ContentKind::Place,
        ContentKind::Tour,
        ContentKind::FlightOffer,
        ContentKind::HotelOffer,
        ContentKind::Restaurant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Place => "place",
            ContentKind::Tour => "tour",
            ContentKind::FlightOffer => "flight-offer",
            ContentKind::HotelOffer => "hotel-offer",
            ContentKind::Restaurant => "restaurant",
        }
    }

    /// Whether this is one of the bookable travel kinds.
    pub fn is_travel(&self) -> bool {
        matches!(
            self,
            ContentKind::Tour
                | ContentKind::FlightOffer
                | ContentKind::HotelOffer
                | ContentKind::Restaurant
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = WayfindError;

    fn from_str(s: &str) -> Result<Self> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| WayfindError::InvalidInput(format!("Unknown content kind: {}", s)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_url: String,
    pub thumbnail_url: Option<String>,
    /// ISO-8601 duration as reported by YouTube, e.g. `PT4M13S`.
    pub duration: Option<String>,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(rename = "type")]
    pub place_type: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub average_rating: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TourDetails {
    pub name: String,
    pub price: String,
    pub currency: String,
    pub duration: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightOfferDetails {
    pub offer_id: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub price: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelOfferDetails {
    pub hotel_id: String,
    pub name: String,
    pub rating: Option<String>,
    pub price: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetails {
    pub name: String,
    pub price: String,
    pub currency: String,
}

/// Per-kind structured attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ContentDetails {
    Video(VideoDetails),
    Place(PlaceDetails),
    Tour(TourDetails),
    FlightOffer(FlightOfferDetails),
    HotelOffer(HotelOfferDetails),
    Restaurant(RestaurantDetails),
}

impl ContentDetails {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentDetails::Video(_) => ContentKind::Video,
            ContentDetails::Place(_) => ContentKind::Place,
            ContentDetails::Tour(_) => ContentKind::Tour,
            ContentDetails::FlightOffer(_) => ContentKind::FlightOffer,
            ContentDetails::HotelOffer(_) => ContentKind::HotelOffer,
            ContentDetails::Restaurant(_) => ContentKind::Restaurant,
        }
    }
}

/// A piece of content to be ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Identifier, unique per source and natural key.
    pub id: String,
    pub title: String,
    /// Free-text body. May be empty, or a timed-caption transcript.
    #[serde(default)]
    pub body: String,
    pub url: Option<String>,
    pub details: ContentDetails,
}

impl ContentItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        details: ContentDetails,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            url: None,
            details,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// A restaurant item. Restaurants have no upstream identifier, so the id
    /// is derived from the name and stays stable across re-ingestion.
    pub fn restaurant(name: &str, price: &str, currency: &str) -> Self {
        Self::new(
            restaurant_id(name),
            name,
            "",
            ContentDetails::Restaurant(RestaurantDetails {
                name: name.to_string(),
                price: price.to_string(),
                currency: currency.to_string(),
            }),
        )
    }

    pub fn kind(&self) -> ContentKind {
        self.details.kind()
    }

    /// Natural-language summary of the item's structured attributes.
    pub fn summary(&self) -> String {
        match &self.details {
            ContentDetails::FlightOffer(f) => format!(
                "Flight from {} to {} on {} costing {} {}.",
                f.origin, f.destination, f.departure_date, f.price, f.currency
            ),
            ContentDetails::HotelOffer(h) => match &h.rating {
                Some(rating) => format!(
                    "Hotel {} with {} stars, costing {} {}.",
                    h.name, rating, h.price, h.currency
                ),
                None => format!("Hotel {}, costing {} {}.", h.name, h.price, h.currency),
            },
            ContentDetails::Tour(t) => {
                format!("Tour \"{}\" costing {} {}.", t.name, t.price, t.currency)
            }
            ContentDetails::Restaurant(r) => {
                format!("Restaurant \"{}\" costing {} {}.", r.name, r.price, r.currency)
            }
            ContentDetails::Place(p) => {
                let mut summary = format!("{} ({}) at {}", self.title, p.place_type, p.address);
                if let Some(rating) = p.average_rating {
                    summary.push_str(&format!(", rated {:.1}", rating));
                }
                summary.push('.');
                if let Some(description) = p.description.as_deref().filter(|d| !d.is_empty()) {
                    summary.push(' ');
                    summary.push_str(description);
                }
                summary
            }
            ContentDetails::Video(v) => {
                if v.description.trim().is_empty() {
                    format!("Video \"{}\" by {}.", self.title, v.channel_name)
                } else {
                    format!(
                        "Video \"{}\" by {}: {}",
                        self.title,
                        v.channel_name,
                        v.description.trim()
                    )
                }
            }
        }
    }

    /// The payload as a flat JSON object, without the `kind` tag and
    /// without null values.
    pub fn attributes(&self) -> Metadata {
        let mut attributes = match serde_json::to_value(&self.details) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        };
        attributes.remove("kind");
        attributes.retain(|_, value| !value.is_null());
        attributes
    }
}

/// Identifier of a travel item: the kind followed by the natural key.
///
/// All travel kinds share one namespace, so upstream ids that are only
/// unique within one kind or one response are never used bare.
pub fn travel_id(kind: ContentKind, natural_key: &str) -> String {
    format!("{}:{}", kind.as_str(), natural_key)
}

/// Stable UUIDv5 of a natural key.
pub(crate) fn natural_key_uuid(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Deterministic identifier for a restaurant name.
pub fn restaurant_id(name: &str) -> String {
    travel_id(ContentKind::Restaurant, &natural_key_uuid(name.trim()))
}

/// Trait for content providers.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch one item by identifier. Missing items are
    /// [`WayfindError::NotFound`].
    async fn fetch(&self, id: &str) -> Result<ContentItem>;

    /// Find up to `limit` items matching a free-text query.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContentItem>>;
}
