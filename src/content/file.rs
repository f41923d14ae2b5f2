//! JSON export content source.
//!
//! Reads a travel export holding ready-made content items next to raw
//! Amadeus-shaped offers:
//!
//! ```json
//! {
//!   "items": [],
//!   "flight_offers": [],
//!   "hotel_offers": [],
//!   "tours": [],
//!   "restaurants": []
//! }
//! ```
//!
//! Every section is optional. Offers that cannot be mapped are skipped.

use super::travel::{FlightOfferRecord, HotelOfferRecord, RestaurantRecord, TourOfferRecord};
use super::{ContentItem, ContentSource};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TravelExport {
    items: Vec<ContentItem>,
    flight_offers: Vec<FlightOfferRecord>,
    hotel_offers: Vec<HotelOfferRecord>,
    tours: Vec<TourOfferRecord>,
    restaurants: Vec<RestaurantRecord>,
}

/// Content source backed by a JSON export file.
pub struct JsonFileSource {
    items: Vec<ContentItem>,
}

impl JsonFileSource {
    /// Load and map every record in the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        info!("Loaded {} items from {:?}", source.items.len(), path);
        Ok(source)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let export: TravelExport = serde_json::from_str(json)?;
        let mut items = export.items;

        for offer in export.flight_offers {
            let id = offer.id.clone();
            match ContentItem::try_from(offer) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping flight offer {}: {}", id, e),
            }
        }
        for offer in export.hotel_offers {
            let id = offer.hotel.hotel_id.clone();
            match ContentItem::try_from(offer) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping hotel offer {}: {}", id, e),
            }
        }
        items.extend(export.tours.into_iter().map(ContentItem::from));
        items.extend(export.restaurants.into_iter().map(ContentItem::from));

        Ok(Self { items })
    }

    /// Every item in file order.
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }
}

#[async_trait]
impl ContentSource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, id: &str) -> Result<ContentItem> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| WayfindError::NotFound(format!("No item with ID: {}", id)))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContentItem>> {
        let needle = query.to_lowercase();
        Ok(self
            .items
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;

    const EXPORT: &str = r#"{
        "items": [{
            "id": "place-1",
            "title": "Belem Tower",
            "body": "",
            "url": null,
            "details": {
                "kind": "place",
                "type": "Attraction",
                "address": "Av. Brasilia, Lisbon",
                "latitude": 38.69,
                "longitude": -9.21,
                "average_rating": 4.6,
                "description": null
            }
        }],
        "flight_offers": [
            {
                "id": "1",
                "price": { "total": "99.00", "currency": "EUR" },
                "itineraries": [{ "segments": [{
                    "departure": { "iataCode": "LIS", "at": "2024-07-01" },
                    "arrival": { "iataCode": "OPO", "at": "2024-07-01" }
                }] }]
            },
            { "id": "broken", "price": { "total": "1.00", "currency": "EUR" } }
        ],
        "restaurants": [{ "name": "Chez Nous", "price": "40.00", "currency": "EUR" }]
    }"#;

    #[tokio::test]
    async fn test_load_maps_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, EXPORT).unwrap();

        let source = JsonFileSource::load(&path).unwrap();
        let kinds: Vec<ContentKind> = source.items().iter().map(ContentItem::kind).collect();
        assert_eq!(
            kinds,
            vec![ContentKind::Place, ContentKind::FlightOffer, ContentKind::Restaurant]
        );

        let place = source.fetch("place-1").await.unwrap();
        assert_eq!(
            place.summary(),
            "Belem Tower (Attraction) at Av. Brasilia, Lisbon, rated 4.6."
        );
        assert!(matches!(
            source.fetch("missing").await,
            Err(WayfindError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_by_title() {
        let source = JsonFileSource::from_json(EXPORT).unwrap();

        let found = source.search("lis", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), ContentKind::FlightOffer);
        assert!(found[0].id.starts_with("flight-offer:"));
        assert_eq!(source.fetch(&found[0].id).await.unwrap(), found[0]);

        assert_eq!(source.search("", 2).await.unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(JsonFileSource::from_json("not json").is_err());
    }
}
