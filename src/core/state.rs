//! # Screen State
//!
//! Everything the map screen owns, in one place. No UI types here;
//! presentation is whoever drains the event channel.
//!
//! ```text
//! ScreenState
//! ├── phase: Phase                    // where the screen lifecycle is
//! ├── region: Region                  // map viewport (center + spans)
//! ├── notice: Option<String>          // inline, dismissible message
//! ├── markers: Vec<Marker>            // joined lender pins
//! ├── address: AddressQuery           // postcode lookup in progress
//! ├── users / listings                // cached directory collections
//! ├── resolved_address: Option<...>   // last formatted lookup result
//! └── directory_fetched_at: Option    // when the directory landed
//! ```
//!
//! State changes only happen through `MapScreen::handle_event` in
//! controller.rs. This keeps things predictable, so no surprise
//! mutations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::types::{Coordinate, ListingRecord, UserRecord};
use crate::core::markers::Marker;

/// Where the screen is in its lifecycle. Directory data arriving is a
/// data update, not a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    AwaitingPermission,
    PermissionDenied,
    Ready,
    AddressResolving,
    AddressError,
}

/// The map viewport: a center plus latitude/longitude spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    pub fn centered_on(center: Coordinate, latitude_delta: f64, longitude_delta: f64) -> Self {
        Self { center, latitude_delta, longitude_delta }
    }

    /// Moves the viewport without touching the spans.
    pub fn recenter(&mut self, center: Coordinate) {
        self.center = center;
    }
}

/// Transient state of one address lookup: the submitted text plus the
/// two-stage resolution result as it accumulates. The `submission` id
/// identifies the in-flight lookup so a late result from a superseded
/// submission can be told apart and discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressQuery {
    pub text: String,
    pub place_id: Option<String>,
    pub resolved: Option<Coordinate>,
    pub submission: Option<Uuid>,
}

impl AddressQuery {
    /// Clears the query. Called once a resolution finishes, either way.
    pub fn reset(&mut self) {
        *self = AddressQuery::default();
    }
}

pub struct ScreenState {
    pub phase: Phase,
    pub region: Region,
    pub notice: Option<String>,
    pub markers: Vec<Marker>,
    pub address: AddressQuery,
    pub users: Vec<UserRecord>,
    pub listings: Vec<ListingRecord>,
    pub resolved_address: Option<String>,
    pub directory_fetched_at: Option<DateTime<Utc>>,
}

impl ScreenState {
    pub fn new(region: Region) -> Self {
        Self {
            phase: Phase::Initializing,
            region,
            notice: None,
            markers: Vec::new(),
            address: AddressQuery::default(),
            users: Vec::new(),
            listings: Vec::new(),
            resolved_address: None,
            directory_fetched_at: None,
        }
    }
}
