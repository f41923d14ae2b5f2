//! Amadeus-shaped travel offer records and their mapping into content items.

use super::{
    natural_key_uuid, travel_id, ContentDetails, ContentItem, ContentKind, FlightOfferDetails,
    HotelOfferDetails, TourDetails,
};
use crate::error::{Result, WayfindError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OfferPrice {
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub iata_code: String,
    pub at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub departure: Endpoint,
    pub arrival: Endpoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// A flight offer as returned by the flight-offers search.
///
/// Offer ids are per-response sequence numbers, so the content id is built
/// from the route, dates and price instead.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightOfferRecord {
    pub id: String,
    pub price: OfferPrice,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
}

impl TryFrom<FlightOfferRecord> for ContentItem {
    type Error = WayfindError;

    fn try_from(record: FlightOfferRecord) -> Result<Self> {
        let mut itineraries = record.itineraries.into_iter();

        let outbound = itineraries
            .next()
            .and_then(|it| it.segments.into_iter().next())
            .ok_or_else(|| {
                WayfindError::Parse(format!("Flight offer {} has no segments", record.id))
            })?;
        let return_date = itineraries
            .next()
            .and_then(|it| it.segments.into_iter().next())
            .map(|segment| segment.departure.at);

        let details = FlightOfferDetails {
            offer_id: record.id.clone(),
            origin: outbound.departure.iata_code,
            destination: outbound.arrival.iata_code,
            departure_date: outbound.departure.at,
            return_date,
            price: record.price.total,
            currency: record.price.currency,
        };
        let title = format!("{} to {}", details.origin, details.destination);
        let natural_key = format!(
            "{}|{}|{}|{}|{}|{}",
            details.origin,
            details.destination,
            details.departure_date,
            details.return_date.as_deref().unwrap_or_default(),
            details.price,
            details.currency
        );

        Ok(ContentItem::new(
            travel_id(ContentKind::FlightOffer, &natural_key_uuid(&natural_key)),
            title,
            "",
            ContentDetails::FlightOffer(details),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub hotel_id: String,
    pub name: String,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomOffer {
    pub price: OfferPrice,
}

/// A hotel with its offers as returned by the hotel-offers search.
#[derive(Debug, Clone, Deserialize)]
pub struct HotelOfferRecord {
    pub hotel: Hotel,
    #[serde(default)]
    pub offers: Vec<RoomOffer>,
}

impl TryFrom<HotelOfferRecord> for ContentItem {
    type Error = WayfindError;

    fn try_from(record: HotelOfferRecord) -> Result<Self> {
        let offer = record.offers.into_iter().next().ok_or_else(|| {
            WayfindError::Parse(format!("Hotel {} has no offers", record.hotel.hotel_id))
        })?;

        Ok(ContentItem::new(
            travel_id(ContentKind::HotelOffer, &record.hotel.hotel_id),
            record.hotel.name.clone(),
            "",
            ContentDetails::HotelOffer(HotelOfferDetails {
                hotel_id: record.hotel.hotel_id,
                name: record.hotel.name,
                rating: record.hotel.rating,
                price: offer.price.total,
                currency: offer.price.currency,
            }),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPrice {
    pub amount: String,
    pub currency_code: String,
}

/// A tour or activity as returned by the activities search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourOfferRecord {
    pub id: String,
    pub name: String,
    pub price: ActivityPrice,
    pub short_description: Option<String>,
    pub minimum_duration: Option<String>,
    pub booking_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<TourOfferRecord> for ContentItem {
    fn from(record: TourOfferRecord) -> Self {
        let item = ContentItem::new(
            travel_id(ContentKind::Tour, &record.id),
            record.name.clone(),
            record.short_description.unwrap_or_default(),
            ContentDetails::Tour(TourDetails {
                name: record.name,
                price: record.price.amount,
                currency: record.price.currency_code,
                duration: record.minimum_duration,
                tags: record.tags,
            }),
        );

        match record.booking_link {
            Some(link) => item.with_url(link),
            None => item,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantRecord {
    pub name: String,
    pub price: String,
    pub currency: String,
}

impl From<RestaurantRecord> for ContentItem {
    fn from(record: RestaurantRecord) -> Self {
        ContentItem::restaurant(&record.name, &record.price, &record.currency)
    }
}
