pub mod gateway;
pub mod http;
pub mod types;

pub use gateway::{ADDRESS_INPUT_LIMIT, GatewayError, GeocodingGateway, validate_address_input};
pub use http::HttpGateway;
pub use types::{Coordinate, ListingRecord, PlaceCandidate, UserRecord};
