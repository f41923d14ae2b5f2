//! Amadeus Self-Service API content source.
//!
//! Authenticates with the client-credentials grant and searches flight
//! offers, hotel offers and tours. Records that cannot be mapped into a
//! [`ContentItem`] are skipped with a warning, so one odd offer never sinks
//! a whole search.

use super::{ContentItem, ContentKind, ContentSource};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Default API root (the test environment).
pub const DEFAULT_AMADEUS_API_URL: &str = "https://test.api.amadeus.com/";

const TOKEN_ENDPOINT: &str = "v1/security/oauth2/token";
const FLIGHT_OFFERS_ENDPOINT: &str = "v2/shopping/flight-offers";
const HOTELS_BY_CITY_ENDPOINT: &str = "v1/reference-data/locations/hotels/by-city";
const HOTEL_OFFERS_ENDPOINT: &str = "v3/shopping/hotel-offers";
const ACTIVITIES_ENDPOINT: &str = "v1/shopping/activities";

/// Refresh the token this long before Amadeus says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Default result count for searches.
pub const DEFAULT_TRAVEL_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    1799
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default = "Vec::new")]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SingleResponse {
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelReference {
    hotel_id: String,
}

/// Flight-offers search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSearch {
    /// IATA code of the origin airport or city.
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`.
    pub departure_date: String,
    pub return_date: Option<String>,
    pub adults: u32,
    pub max: usize,
}

impl FlightSearch {
    pub fn new(origin: &str, destination: &str, departure_date: &str) -> Self {
        Self {
            origin: origin.to_uppercase(),
            destination: destination.to_uppercase(),
            departure_date: departure_date.to_string(),
            return_date: None,
            adults: 1,
            max: DEFAULT_TRAVEL_SEARCH_LIMIT,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("originLocationCode", self.origin.clone()),
            ("destinationLocationCode", self.destination.clone()),
            ("departureDate", self.departure_date.clone()),
            ("adults", self.adults.max(1).to_string()),
            ("max", self.max.max(1).to_string()),
        ];
        if let Some(date) = &self.return_date {
            params.push(("returnDate", date.clone()));
        }
        params
    }
}

/// Hotel search parameters. Hotels are looked up by city, then priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelSearch {
    /// IATA city code, e.g. `PAR`.
    pub city_code: String,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub adults: u32,
    /// Number of hotels to price.
    pub limit: usize,
}

impl HotelSearch {
    pub fn in_city(city_code: &str) -> Self {
        Self {
            city_code: city_code.trim().to_uppercase(),
            check_in_date: None,
            check_out_date: None,
            adults: 1,
            limit: DEFAULT_TRAVEL_SEARCH_LIMIT,
        }
    }

    fn offer_params(&self, hotel_ids: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("hotelIds", hotel_ids.join(",")),
            ("adults", self.adults.max(1).to_string()),
        ];
        if let Some(date) = &self.check_in_date {
            params.push(("checkInDate", date.clone()));
        }
        if let Some(date) = &self.check_out_date {
            params.push(("checkOutDate", date.clone()));
        }
        params
    }
}

/// Tours-and-activities search around a point.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySearch {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometers.
    pub radius_km: Option<u32>,
}

impl ActivitySearch {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
        ];
        if let Some(radius) = self.radius_km {
            params.push(("radius", radius.to_string()));
        }
        params
    }
}

/// Map raw records one by one, skipping any that do not fit.
fn map_records<R>(records: Vec<Value>, label: &str) -> Vec<ContentItem>
where
    R: DeserializeOwned,
    ContentItem: TryFrom<R>,
    <ContentItem as TryFrom<R>>::Error: fmt::Display,
{
    records
        .into_iter()
        .filter_map(|value| {
            let mapped = serde_json::from_value::<R>(value)
                .map_err(|e| e.to_string())
                .and_then(|record| ContentItem::try_from(record).map_err(|e| e.to_string()));

            match mapped {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping {}: {}", label, e);
                    None
                }
            }
        })
        .collect()
}

/// Amadeus content source.
pub struct AmadeusSource {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusSource {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_AMADEUS_API_URL)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(self)
    }

    /// A cached bearer token, fetched again once it is about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(current.value.clone());
        }

        let response = self
            .client
            .post(self.base_url.join(TOKEN_ENDPOINT)?)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WayfindError::Fetch(format!(
                "Amadeus authentication failed with {}: {}",
                status, body
            )));
        }

        let issued: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(issued.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("Authenticated with Amadeus for {}s", lifetime.as_secs());

        *token = Some(AccessToken {
            value: issued.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(issued.access_token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let token = self.access_token().await?;

        let mut url = self.base_url.join(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                *self.token.lock().await = None;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(if status == StatusCode::NOT_FOUND {
                WayfindError::NotFound(format!("Amadeus {}: {}", endpoint, body))
            } else {
                WayfindError::Fetch(format!(
                    "Amadeus {} failed with {}: {}",
                    endpoint, status, body
                ))
            });
        }

        Ok(response.json().await?)
    }

    /// Search flight offers between two locations.
    #[instrument(skip(self), fields(origin = %search.origin, destination = %search.destination))]
    pub async fn search_flights(&self, search: &FlightSearch) -> Result<Vec<ContentItem>> {
        let response: ListResponse = self.get(FLIGHT_OFFERS_ENDPOINT, &search.params()).await?;
        let items = map_records::<super::FlightOfferRecord>(response.data, "flight offer");

        info!("Found {} flight offers", items.len());
        Ok(items)
    }

    /// Find hotels in a city and price them.
    #[instrument(skip(self), fields(city = %search.city_code))]
    pub async fn search_hotels(&self, search: &HotelSearch) -> Result<Vec<ContentItem>> {
        let hotels: ListResponse = self
            .get(
                HOTELS_BY_CITY_ENDPOINT,
                &[("cityCode", search.city_code.clone())],
            )
            .await?;

        let hotel_ids: Vec<String> = hotels
            .data
            .into_iter()
            .filter_map(|value| serde_json::from_value::<HotelReference>(value).ok())
            .map(|hotel| hotel.hotel_id)
            .take(search.limit.max(1))
            .collect();

        if hotel_ids.is_empty() {
            info!("No hotels listed in {}", search.city_code);
            return Ok(Vec::new());
        }

        let items = self.hotel_offers(&search.offer_params(&hotel_ids)).await?;
        info!("Priced {} of {} hotels", items.len(), hotel_ids.len());
        Ok(items)
    }

    async fn hotel_offers(&self, params: &[(&str, String)]) -> Result<Vec<ContentItem>> {
        let response: ListResponse = self.get(HOTEL_OFFERS_ENDPOINT, params).await?;
        Ok(map_records::<super::HotelOfferRecord>(response.data, "hotel offer"))
    }

    /// Search tours and activities around a point.
    #[instrument(skip(self))]
    pub async fn search_activities(&self, search: &ActivitySearch) -> Result<Vec<ContentItem>> {
        let response: ListResponse = self.get(ACTIVITIES_ENDPOINT, &search.params()).await?;
        let items = map_records::<super::TourOfferRecord>(response.data, "activity");

        info!("Found {} activities", items.len());
        Ok(items)
    }

    async fn fetch_activity(&self, activity_id: &str) -> Result<ContentItem> {
        let response: SingleResponse = self
            .get(&format!("{}/{}", ACTIVITIES_ENDPOINT, activity_id), &[])
            .await?;

        let record: super::TourOfferRecord = serde_json::from_value(response.data)?;
        Ok(ContentItem::from(record))
    }

    async fn fetch_hotel(&self, hotel_id: &str) -> Result<ContentItem> {
        let params = [("hotelIds", hotel_id.to_string()), ("adults", "1".to_string())];
        self.hotel_offers(&params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WayfindError::NotFound(format!("No offers for hotel {}", hotel_id)))
    }
}

#[async_trait]
impl ContentSource for AmadeusSource {
    fn name(&self) -> &str {
        "amadeus"
    }

    /// Fetch a tour or hotel by its content id (`tour:{id}` or
    /// `hotel-offer:{hotelId}`). Flight offers only exist within a search.
    #[instrument(skip(self))]
    async fn fetch(&self, id: &str) -> Result<ContentItem> {
        let (kind, key) = id
            .split_once(':')
            .and_then(|(kind, key)| Some((kind.parse::<ContentKind>().ok()?, key)))
            .ok_or_else(|| {
                WayfindError::InvalidInput(format!("Not an Amadeus content id: {}", id))
            })?;

        match kind {
            ContentKind::Tour => self.fetch_activity(key).await,
            ContentKind::HotelOffer => self.fetch_hotel(key).await,
            ContentKind::FlightOffer => Err(WayfindError::InvalidInput(
                "Flight offers cannot be fetched by id; search again instead".to_string(),
            )),
            other => Err(WayfindError::InvalidInput(format!(
                "Amadeus does not serve {} items",
                other
            ))),
        }
    }

    /// Treat the query as an IATA city code and return priced hotels.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContentItem>> {
        let mut search = HotelSearch::in_city(query);
        search.limit = limit;
        self.search_hotels(&search).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentDetails;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=amadeus-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "amadeusOAuth2Token",
                "access_token": "token-1",
                "expires_in": 1799
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn source(server: &MockServer) -> AmadeusSource {
        AmadeusSource::new("amadeus-id", "amadeus-secret")
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap()
    }

    fn flight_json(id: &str, price: &str) -> Value {
        json!({
            "type": "flight-offer",
            "id": id,
            "price": { "total": price, "currency": "EUR" },
            "itineraries": [{ "segments": [{
                "departure": { "iataCode": "LIS", "at": "2024-07-01T08:00:00" },
                "arrival": { "iataCode": "CDG", "at": "2024-07-01T11:40:00" }
            }] }]
        })
    }

    #[tokio::test]
    async fn test_flight_search_authenticates_once_and_maps_offers() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .and(header("authorization", "Bearer token-1"))
            .and(query_param("originLocationCode", "LIS"))
            .and(query_param("destinationLocationCode", "CDG"))
            .and(query_param("departureDate", "2024-07-01"))
            .and(query_param("adults", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    flight_json("1", "120.00"),
                    { "id": "2", "price": { "total": "1.00", "currency": "EUR" } },
                    flight_json("3", "95.50")
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let amadeus = source(&server);
        let search = FlightSearch::new("lis", "cdg", "2024-07-01");

        let items = amadeus.search_flights(&search).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.id.starts_with("flight-offer:")));
        assert_ne!(items[0].id, items[1].id);
        assert_eq!(
            items[1].summary(),
            "Flight from LIS to CDG on 2024-07-01T08:00:00 costing 95.50 EUR."
        );

        // second call reuses the cached token
        amadeus.search_flights(&search).await.unwrap();
    }

    #[tokio::test]
    async fn test_hotel_search_lists_then_prices() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/reference-data/locations/hotels/by-city"))
            .and(query_param("cityCode", "PAR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "hotelId": "HLPAR001", "name": "One" },
                    { "hotelId": "HLPAR002", "name": "Two" },
                    { "hotelId": "HLPAR003", "name": "Three" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/shopping/hotel-offers"))
            .and(query_param("hotelIds", "HLPAR001,HLPAR002"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "hotel": { "hotelId": "HLPAR001", "name": "One", "rating": "4" },
                        "offers": [{ "price": { "total": "210.00", "currency": "EUR" } }]
                    },
                    { "hotel": { "hotelId": "HLPAR002", "name": "Two" }, "offers": [] }
                ]
            })))
            .mount(&server)
            .await;

        let items = source(&server).search("par", 2).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "hotel-offer:HLPAR001");
        assert_eq!(items[0].summary(), "Hotel One with 4 stars, costing 210.00 EUR.");
    }

    #[tokio::test]
    async fn test_activity_search_and_fetch() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        let activity = json!({
            "type": "activity",
            "id": "23642",
            "name": "Skip-the-line tickets to the Louvre",
            "shortDescription": "Book your tickets in advance.",
            "price": { "amount": "35.0", "currencyCode": "EUR" },
            "minimumDuration": "3 hours",
            "bookingLink": "https://example.com/louvre"
        });
        Mock::given(method("GET"))
            .and(path("/v1/shopping/activities"))
            .and(query_param("latitude", "48.8566"))
            .and(query_param("radius", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [activity.clone(), { "id": "no-price", "name": "Free walk" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/shopping/activities/23642"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": activity })))
            .mount(&server)
            .await;

        let amadeus = source(&server);
        let items = amadeus
            .search_activities(&ActivitySearch {
                latitude: 48.8566,
                longitude: 2.3522,
                radius_km: Some(1),
            })
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "tour:23642");
        match &items[0].details {
            ContentDetails::Tour(t) => assert_eq!(t.duration.as_deref(), Some("3 hours")),
            other => panic!("unexpected details: {:?}", other),
        }

        let fetched = amadeus.fetch("tour:23642").await.unwrap();
        assert_eq!(fetched, items[0]);
    }

    #[tokio::test]
    async fn test_fetch_rejects_unservable_ids() {
        let server = MockServer::start().await;
        let amadeus = source(&server);

        for id in ["23642", "flight-offer:abc", "video:dQw4w9WgXcQ"] {
            let err = amadeus.fetch(id).await.unwrap_err();
            assert!(matches!(err, WayfindError::InvalidInput(_)), "{}", id);
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let err = source(&server)
            .search_flights(&FlightSearch::new("LIS", "CDG", "2024-07-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, WayfindError::Fetch(msg) if msg.contains("authentication")));
    }

    #[tokio::test]
    async fn test_rejected_token_is_fetched_again() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/v1/shopping/activities"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let amadeus = source(&server);
        let search = ActivitySearch {
            latitude: 38.72,
            longitude: -9.14,
            radius_km: None,
        };

        let err = amadeus.search_activities(&search).await.unwrap_err();
        assert!(matches!(err, WayfindError::Fetch(msg) if msg.contains("401")));
        assert!(amadeus.search_activities(&search).await.is_err());
    }
}
