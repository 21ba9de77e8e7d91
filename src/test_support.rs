//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::oneshot;

use crate::api::gateway::{GatewayError, GeocodingGateway};
use crate::api::types::{Coordinate, ListingRecord, PlaceCandidate, UserRecord};
use crate::core::controller::{MapScreen, ScreenEvent};
use crate::core::state::Region;
use crate::location::{LocationError, LocationProvider, PermissionStatus};

pub fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate { latitude, longitude }
}

pub fn user(profile_id: i64, display_name: &str, latitude: f64, longitude: f64) -> UserRecord {
    UserRecord {
        profile_id,
        display_name: display_name.to_string(),
        bio: String::new(),
        coordinate: coord(latitude, longitude),
        picture_url: None,
    }
}

pub fn listing(listing_id: i64, owner_id: i64, title: &str) -> ListingRecord {
    ListingRecord {
        listing_id,
        owner_id,
        title: title.to_string(),
        description: String::new(),
        category: None,
        subcategory: None,
        photo_url: None,
        deposit_required: None,
        deposit_amount: None,
    }
}

/// Location provider with a scripted permission answer and fix.
/// Counts `current_fix` calls so tests can prove it was never asked.
pub struct StubLocation {
    permission: PermissionStatus,
    fix: Result<Coordinate, LocationError>,
    pub fix_calls: AtomicUsize,
}

impl StubLocation {
    pub fn granted(fix: Coordinate) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fix: Ok(fix),
            fix_calls: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            fix: Err(LocationError::PermissionDenied),
            fix_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fix: Err(LocationError::PositionUnavailable(reason.to_string())),
            fix_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocationProvider for StubLocation {
    fn name(&self) -> &str {
        "stub"
    }

    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        self.fix_calls.fetch_add(1, Ordering::SeqCst);
        self.fix.clone()
    }
}

/// Gateway with scripted responses. Unscripted address text answers
/// `NoResults`; an unscripted place id answers `NotFound`. Oneshot
/// gates let a test park a call until it says go, to pin down event
/// ordering.
pub struct StubGateway {
    users: Mutex<Option<Result<Vec<UserRecord>, GatewayError>>>,
    listings: Mutex<Option<Result<Vec<ListingRecord>, GatewayError>>>,
    address_results: Mutex<HashMap<String, Result<PlaceCandidate, GatewayError>>>,
    place_results: Mutex<HashMap<String, Result<Coordinate, GatewayError>>>,
    address_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    listings_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub resolve_calls: AtomicUsize,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(None),
            listings: Mutex::new(None),
            address_results: Mutex::new(HashMap::new()),
            place_results: Mutex::new(HashMap::new()),
            address_gates: Mutex::new(HashMap::new()),
            listings_gate: Mutex::new(None),
            resolve_calls: AtomicUsize::new(0),
        }
    }

    pub fn script_users(&self, result: Result<Vec<UserRecord>, GatewayError>) {
        *self.users.lock().unwrap() = Some(result);
    }

    pub fn script_listings(&self, result: Result<Vec<ListingRecord>, GatewayError>) {
        *self.listings.lock().unwrap() = Some(result);
    }

    /// Scripts the full two-stage resolution for one input text.
    pub fn script_address_success(
        &self,
        text: &str,
        place_id: &str,
        formatted_address: &str,
        latitude: f64,
        longitude: f64,
    ) {
        self.address_results.lock().unwrap().insert(
            text.to_string(),
            Ok(PlaceCandidate {
                place_id: place_id.to_string(),
                formatted_address: formatted_address.to_string(),
            }),
        );
        self.place_results
            .lock()
            .unwrap()
            .insert(place_id.to_string(), Ok(coord(latitude, longitude)));
    }

    /// Overrides the scripted outcome for one place id.
    pub fn script_place(&self, place_id: &str, result: Result<Coordinate, GatewayError>) {
        self.place_results
            .lock()
            .unwrap()
            .insert(place_id.to_string(), result);
    }

    /// Parks `resolve_address` for `text` until the returned sender
    /// fires (or is dropped).
    pub fn gate_address(&self, text: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.address_gates
            .lock()
            .unwrap()
            .insert(text.to_string(), rx);
        tx
    }

    /// Parks `fetch_listings` until the returned sender fires.
    pub fn gate_listings(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.listings_gate.lock().unwrap() = Some(rx);
        tx
    }
}

#[async_trait]
impl GeocodingGateway for StubGateway {
    async fn fetch_users(&self) -> Result<Vec<UserRecord>, GatewayError> {
        self.users.lock().unwrap().take().unwrap_or(Ok(Vec::new()))
    }

    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>, GatewayError> {
        let gate = self.listings_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.listings
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn resolve_address(&self, text: &str) -> Result<PlaceCandidate, GatewayError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.address_gates.lock().unwrap().remove(text);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.address_results
            .lock()
            .unwrap()
            .remove(text)
            .unwrap_or(Err(GatewayError::NoResults))
    }

    async fn resolve_place(&self, place_id: &str) -> Result<Coordinate, GatewayError> {
        self.place_results
            .lock()
            .unwrap()
            .remove(place_id)
            .unwrap_or_else(|| Err(GatewayError::NotFound(place_id.to_string())))
    }
}

/// Creates a test screen centered on a London home coordinate, plus
/// the receiving end of its event channel.
pub fn test_screen(
    gateway: Arc<StubGateway>,
    location: Arc<StubLocation>,
) -> (MapScreen, Receiver<ScreenEvent>) {
    let (tx, rx) = mpsc::channel(32);
    let current_user = user(0, "You", 51.5072, -0.1276);
    let region = Region::centered_on(current_user.coordinate, 0.75, 0.75);
    (
        MapScreen::new(gateway, location, current_user, region, tx),
        rx,
    )
}

/// Feeds events back into the screen until every spawned task has
/// reported in.
pub async fn drain(screen: &mut MapScreen, rx: &mut Receiver<ScreenEvent>) {
    while !screen.is_idle() {
        let event = rx
            .recv()
            .await
            .expect("event channel closed while tasks in flight");
        screen.handle_event(event);
    }
}
