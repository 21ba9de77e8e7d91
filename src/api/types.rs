use serde::{Deserialize, Serialize};

/// A point on the map. Latitude/longitude in degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Returns true when both components are finite and within the
    /// WGS84 ranges. Rows and geocoding results failing this check are
    /// treated as malformed.
    pub fn in_bounds(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A lender profile from the directory. Immutable for the screen's
/// lifetime; refreshed only by the next fetch.
///
/// The wire rows carry `latitude`/`longitude` at the top level, hence
/// the flattened coordinate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub profile_id: i64,
    pub display_name: String,
    pub bio: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub picture_url: Option<String>,
}

/// A tool listing from the directory. Many listings may reference one
/// owner. The API calls the title field `tool`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub listing_id: i64,
    pub owner_id: i64,
    #[serde(rename = "tool")]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub deposit_required: Option<bool>,
    #[serde(default)]
    pub deposit_amount: Option<f64>,
}

/// The first ranked guess the geocoding provider returns for a
/// free-text query. The place id feeds the follow-up details lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub formatted_address: String,
}
