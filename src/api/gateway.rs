use std::fmt;

use async_trait::async_trait;

use super::types::{Coordinate, ListingRecord, PlaceCandidate, UserRecord};

/// Longest accepted address/postcode input. The map screen's text field
/// enforces the same bound, so anything longer never left the UI in the
/// first place.
pub const ADDRESS_INPUT_LIMIT: usize = 8;

/// Errors that can occur while talking to the directory API or the
/// geocoding provider. None of these are retried automatically; every
/// retry is user-initiated.
#[derive(Debug)]
pub enum GatewayError {
    /// Transport-level failure or a non-success HTTP status.
    Network(String),
    /// The response body could not be decoded, or a required value was
    /// missing/out of range. Malformed directory rows are skipped
    /// instead of surfacing this.
    Parse(String),
    /// The geocoding provider returned zero candidates for the query.
    NoResults,
    /// The address input was empty or over the length bound. Raised
    /// before any network call.
    InvalidInput(String),
    /// The place id is stale or unknown to the provider.
    NotFound(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Network(msg) => write!(f, "network error: {msg}"),
            GatewayError::Parse(msg) => write!(f, "parse error: {msg}"),
            GatewayError::NoResults => write!(f, "no matching places"),
            GatewayError::InvalidInput(msg) => write!(f, "invalid address input: {msg}"),
            GatewayError::NotFound(place_id) => write!(f, "place not found: {place_id}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Checks the address bound shared by the screen's input field and
/// `resolve_address`.
pub fn validate_address_input(text: &str) -> Result<(), GatewayError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidInput("address is empty".to_string()));
    }
    if trimmed.chars().count() > ADDRESS_INPUT_LIMIT {
        return Err(GatewayError::InvalidInput(format!(
            "address longer than {ADDRESS_INPUT_LIMIT} characters"
        )));
    }
    Ok(())
}

/// Remote operations the map screen depends on: the user/listing
/// directory and the two-stage address lookup.
///
/// No caching anywhere — repeated identical calls re-fetch.
#[async_trait]
pub trait GeocodingGateway: Send + Sync {
    /// Fetches the lender profiles. Malformed rows are skipped, not
    /// fatal.
    async fn fetch_users(&self) -> Result<Vec<UserRecord>, GatewayError>;

    /// Fetches the tool listings. Malformed rows are skipped, not
    /// fatal.
    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>, GatewayError>;

    /// Resolves free-text input (typically a postcode) to the first
    /// ranked place candidate.
    async fn resolve_address(&self, text: &str) -> Result<PlaceCandidate, GatewayError>;

    /// Resolves a place id to its coordinate. The id may have gone
    /// stale since `resolve_address` returned it; that surfaces as
    /// `NotFound`.
    async fn resolve_place(&self, place_id: &str) -> Result<Coordinate, GatewayError>;

    /// Fetches both directory collections concurrently. The two sides
    /// are independently failable; this convenience form surfaces
    /// whichever error occurred.
    async fn fetch_directory(
        &self,
    ) -> Result<(Vec<UserRecord>, Vec<ListingRecord>), GatewayError> {
        let (users, listings) = futures::join!(self.fetch_users(), self.fetch_listings());
        Ok((users?, listings?))
    }
}
