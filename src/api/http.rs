//! HTTP implementation of the gateway.
//!
//! Talks to two services:
//! - the application REST API (`/profiles`, `/listings`), which wraps
//!   collections in a `{"data": [...]}` envelope
//! - a Google-style geocoding provider (`/maps/api/geocode/json` and
//!   `/maps/api/place/details/json`)
//!
//! Directory rows are decoded one by one so a single malformed record
//! skips, never aborting the whole fetch.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::gateway::{GatewayError, GeocodingGateway, validate_address_input};
use super::types::{Coordinate, ListingRecord, PlaceCandidate, UserRecord};

// ============================================================================
// Wire Types
// ============================================================================

/// Collection envelope used by the application API.
#[derive(Deserialize, Debug)]
struct DataEnvelope {
    data: Vec<serde_json::Value>,
}

/// Response to the free-text geocode call.
#[derive(Deserialize, Debug)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize, Debug)]
struct GeocodeResult {
    formatted_address: String,
    place_id: String,
}

/// Response to the place-details call.
#[derive(Deserialize, Debug)]
struct PlaceDetailsResponse {
    status: String,
    result: Option<PlaceResult>,
}

#[derive(Deserialize, Debug)]
struct PlaceResult {
    geometry: Option<Geometry>,
}

#[derive(Deserialize, Debug)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize, Debug)]
struct LatLng {
    lat: f64,
    lng: f64,
}

// ============================================================================
// Gateway Implementation
// ============================================================================

/// Gateway over the application API and the geocoding provider.
pub struct HttpGateway {
    client: reqwest::Client,
    api_base_url: String,
    geocode_base_url: String,
    geocode_api_key: String,
}

impl HttpGateway {
    /// Creates a new HTTP gateway.
    ///
    /// # Arguments
    /// * `api_base_url` - Base URL of the application REST API
    /// * `geocode_base_url` - Optional custom geocoding base URL
    ///   (defaults to the Google Maps host)
    /// * `geocode_api_key` - API key sent on every geocoding call
    pub fn new(
        api_base_url: String,
        geocode_base_url: Option<String>,
        geocode_api_key: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url,
            geocode_base_url: geocode_base_url
                .unwrap_or_else(|| "https://maps.googleapis.com".to_string()),
            geocode_api_key,
        }
    }

    /// GETs `url` and decodes the JSON body. The query is passed
    /// separately so the api key never ends up in log lines.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        debug!("{} -> {}", url, status);
        if !status.is_success() {
            warn!("request failed: HTTP {} for {}", status.as_u16(), url);
            return Err(GatewayError::Network(format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Fetches one directory collection and decodes its rows
    /// individually, skipping the ones that don't parse.
    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        path: &str,
        label: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let url = format!("{}{}", self.api_base_url, path);
        let envelope: DataEnvelope = self.get_json(&url, &[]).await?;

        let mut rows = Vec::with_capacity(envelope.data.len());
        let mut skipped = 0usize;
        for row in envelope.data {
            match serde_json::from_value::<T>(row) {
                Ok(record) => rows.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("skipping malformed {} row: {}", label, e);
                }
            }
        }
        if skipped > 0 {
            info!("{} fetch: {} row(s) skipped", label, skipped);
        }
        Ok(rows)
    }
}

#[async_trait]
impl GeocodingGateway for HttpGateway {
    async fn fetch_users(&self) -> Result<Vec<UserRecord>, GatewayError> {
        let users: Vec<UserRecord> = self.fetch_rows("/profiles", "profile").await?;
        // Out-of-range coordinates count as malformed too; the marker
        // join must only ever see placeable users.
        let (placeable, rejected): (Vec<_>, Vec<_>) =
            users.into_iter().partition(|u| u.coordinate.in_bounds());
        for user in &rejected {
            warn!(
                "skipping profile {}: coordinate out of bounds",
                user.profile_id
            );
        }
        info!("directory fetch: {} profile(s)", placeable.len());
        Ok(placeable)
    }

    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>, GatewayError> {
        let listings = self.fetch_rows("/listings", "listing").await?;
        info!("directory fetch: {} listing(s)", listings.len());
        Ok(listings)
    }

    async fn resolve_address(&self, text: &str) -> Result<PlaceCandidate, GatewayError> {
        validate_address_input(text)?;

        let url = format!("{}/maps/api/geocode/json", self.geocode_base_url);
        let response: GeocodeResponse = self
            .get_json(&url, &[("address", text), ("key", &self.geocode_api_key)])
            .await?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GatewayError::NoResults),
            other => {
                return Err(GatewayError::Network(format!("geocoding status {other}")));
            }
        }

        // First ranked candidate wins.
        let first = response
            .results
            .into_iter()
            .next()
            .ok_or(GatewayError::NoResults)?;
        info!("resolved '{}' to place {}", text, first.place_id);
        Ok(PlaceCandidate {
            place_id: first.place_id,
            formatted_address: first.formatted_address,
        })
    }

    async fn resolve_place(&self, place_id: &str) -> Result<Coordinate, GatewayError> {
        let url = format!("{}/maps/api/place/details/json", self.geocode_base_url);
        let response: PlaceDetailsResponse = self
            .get_json(&url, &[("place_id", place_id), ("key", &self.geocode_api_key)])
            .await?;

        match response.status.as_str() {
            "OK" => {}
            "NOT_FOUND" | "INVALID_REQUEST" => {
                return Err(GatewayError::NotFound(place_id.to_string()));
            }
            other => {
                return Err(GatewayError::Network(format!(
                    "place details status {other}"
                )));
            }
        }

        let location = response
            .result
            .and_then(|r| r.geometry)
            .map(|g| g.location)
            .ok_or_else(|| GatewayError::Parse("place details missing geometry".to_string()))?;

        let coordinate = Coordinate {
            latitude: location.lat,
            longitude: location.lng,
        };
        if !coordinate.in_bounds() {
            return Err(GatewayError::Parse(format!(
                "place {} geometry out of bounds",
                place_id
            )));
        }
        Ok(coordinate)
    }
}
