//! # Map View Controller
//!
//! Everything that happens to the map screen becomes a `ScreenEvent`.
//! The location provider answers? That's `ScreenEvent::FixAcquired`.
//! The directory loads? That's `ScreenEvent::UsersLoaded`.
//!
//! I/O runs in spawned tasks that send events into an mpsc channel;
//! whoever owns the receiver feeds them back through `handle_event`,
//! the single place state mutates.
//!
//! ```text
//! mount / submit_address / use_device_location
//!        │ spawn
//!        ▼
//!   tokio task ── ScreenEvent ──► handle_event(state)
//! ```
//!
//! Address lookups are stamped with a submission id. A newer submission
//! replaces the stamp, so a late event from a superseded lookup no
//! longer matches and is dropped. After `unmount` every event is
//! dropped: no state mutation after teardown.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use crate::api::gateway::{GatewayError, GeocodingGateway, validate_address_input};
use crate::api::types::{Coordinate, ListingRecord, PlaceCandidate, UserRecord};
use crate::core::markers::build_markers;
use crate::core::state::{Phase, Region, ScreenState};
use crate::location::{LocationError, LocationProvider, PermissionStatus};

/// A message from a spawned I/O task back to the screen.
#[derive(Debug)]
pub enum ScreenEvent {
    FixAcquired(Coordinate),
    FixFailed(LocationError),
    UsersLoaded(Vec<UserRecord>),
    UsersFailed(GatewayError),
    ListingsLoaded(Vec<ListingRecord>),
    ListingsFailed(GatewayError),
    /// Stage one of an address lookup: the ranked candidate arrived,
    /// the coordinate lookup is still running.
    AddressCandidate {
        submission: Uuid,
        place: PlaceCandidate,
    },
    /// Stage two: the candidate's coordinate.
    AddressResolved {
        submission: Uuid,
        coordinate: Coordinate,
    },
    AddressFailed {
        submission: Uuid,
        error: GatewayError,
    },
}

impl ScreenEvent {
    /// True when the event ends a spawned task. `AddressCandidate` is a
    /// progress note; its task is still running.
    fn is_terminal(&self) -> bool {
        !matches!(self, ScreenEvent::AddressCandidate { .. })
    }
}

/// The map screen: owns `ScreenState` and the signed-in user, and
/// sequences the location provider, the gateway, and the marker join
/// into one lifecycle.
///
/// The signed-in user comes in through the constructor and is updated
/// in place when a fix arrives; read it back with `current_user`.
pub struct MapScreen {
    gateway: Arc<dyn GeocodingGateway>,
    location: Arc<dyn LocationProvider>,
    current_user: UserRecord,
    pub state: ScreenState,
    events: Sender<ScreenEvent>,
    mounted: bool,
    in_flight: usize,
}

impl MapScreen {
    pub fn new(
        gateway: Arc<dyn GeocodingGateway>,
        location: Arc<dyn LocationProvider>,
        current_user: UserRecord,
        region: Region,
        events: Sender<ScreenEvent>,
    ) -> Self {
        Self {
            gateway,
            location,
            current_user,
            state: ScreenState::new(region),
            events,
            mounted: false,
            in_flight: 0,
        }
    }

    pub fn current_user(&self) -> &UserRecord {
        &self.current_user
    }

    /// True when no spawned task is still outstanding.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Brings the screen up: requests a fix and fetches the directory
    /// concurrently. The two are independent; whichever answers first
    /// is applied first.
    pub fn mount(&mut self) {
        if self.mounted {
            debug!("mount called twice, ignoring");
            return;
        }
        self.mounted = true;
        self.state.phase = Phase::AwaitingPermission;
        self.spawn_fix_request();
        self.spawn_directory_fetch();
    }

    /// Tears the screen down. Events already in flight still drain
    /// through the channel but are discarded unapplied.
    pub fn unmount(&mut self) {
        self.mounted = false;
        info!("map screen unmounted");
    }

    /// The "use device location" action. Also the retry path out of
    /// `PermissionDenied`.
    pub fn use_device_location(&mut self) {
        if !self.mounted {
            debug!("location action before mount, ignoring");
            return;
        }
        self.state.phase = Phase::AwaitingPermission;
        self.state.notice = None;
        self.spawn_fix_request();
    }

    /// Submits the address field. Validation happens here, before
    /// anything is spawned, so bad input never costs a network call.
    /// A submission made while another is resolving supersedes it.
    pub fn submit_address(&mut self, text: &str) {
        if !self.mounted {
            debug!("address submission before mount, ignoring");
            return;
        }
        if self.state.phase == Phase::PermissionDenied {
            // The screen shows only the denial message in this phase;
            // the input isn't reachable.
            debug!("address submission ignored while permission denied");
            return;
        }

        if let Err(e) = validate_address_input(text) {
            info!("address submission rejected: {}", e);
            self.state.address.reset();
            self.state.phase = Phase::AddressError;
            self.state.notice = Some(e.to_string());
            return;
        }

        let submission = Uuid::new_v4();
        self.state.address.reset();
        self.state.address.text = text.trim().to_string();
        self.state.address.submission = Some(submission);
        self.state.phase = Phase::AddressResolving;
        self.state.notice = None;
        self.spawn_address_resolution(self.state.address.text.clone(), submission);
    }

    /// Clears the inline notice; an address error goes back to `Ready`.
    pub fn dismiss_notice(&mut self) {
        self.state.notice = None;
        if self.state.phase == Phase::AddressError {
            self.state.phase = Phase::Ready;
        }
    }

    /// Applies one event to state. The only mutation point.
    pub fn handle_event(&mut self, event: ScreenEvent) {
        if event.is_terminal() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if !self.mounted {
            debug!("event after unmount discarded: {:?}", event);
            return;
        }

        match event {
            ScreenEvent::FixAcquired(coordinate) => {
                info!(
                    "location fix acquired: {:.4}, {:.4}",
                    coordinate.latitude, coordinate.longitude
                );
                self.current_user.coordinate = coordinate;
                self.state.region.recenter(coordinate);
                self.state.phase = Phase::Ready;
            }
            ScreenEvent::FixFailed(LocationError::PermissionDenied) => {
                info!("location permission denied");
                self.state.phase = Phase::PermissionDenied;
                self.state.notice = Some(LocationError::PermissionDenied.to_string());
            }
            ScreenEvent::FixFailed(e) => {
                // Anything short of denial leaves the screen usable.
                warn!("location fix failed: {}", e);
                self.state.notice = Some(e.to_string());
                self.state.phase = Phase::Ready;
            }
            ScreenEvent::UsersLoaded(users) => {
                self.state.users = users;
                self.state.directory_fetched_at = Some(Utc::now());
                self.rebuild_markers();
            }
            ScreenEvent::ListingsLoaded(listings) => {
                self.state.listings = listings;
                self.state.directory_fetched_at = Some(Utc::now());
                self.rebuild_markers();
            }
            ScreenEvent::UsersFailed(e) => {
                warn!("profile fetch failed: {}", e);
                self.state.notice = Some(format!("Could not load lenders: {e}"));
            }
            ScreenEvent::ListingsFailed(e) => {
                warn!("listing fetch failed: {}", e);
                self.state.notice = Some(format!("Could not load listings: {e}"));
            }
            ScreenEvent::AddressCandidate { submission, place } => {
                if self.state.address.submission != Some(submission) {
                    debug!("stale address candidate discarded");
                    return;
                }
                debug!("address candidate: {}", place.formatted_address);
                self.state.address.place_id = Some(place.place_id);
                self.state.resolved_address = Some(place.formatted_address);
            }
            ScreenEvent::AddressResolved { submission, coordinate } => {
                if self.state.address.submission != Some(submission) {
                    debug!("stale address resolution discarded");
                    return;
                }
                self.state.address.resolved = Some(coordinate);
                self.apply_resolved_address();
            }
            ScreenEvent::AddressFailed { submission, error } => {
                if self.state.address.submission != Some(submission) {
                    debug!("stale address failure discarded");
                    return;
                }
                info!("address resolution failed: {}", error);
                self.state.address.reset();
                self.state.phase = Phase::AddressError;
                self.state.notice = Some(error.to_string());
                // Region stays where it was.
            }
        }
    }

    /// Applies a completed address query to the viewport, then resets
    /// the query for the next submission.
    fn apply_resolved_address(&mut self) {
        if let Some(coordinate) = self.state.address.resolved {
            info!(
                "recentering on resolved address: {:.4}, {:.4}",
                coordinate.latitude, coordinate.longitude
            );
            self.state.region.recenter(coordinate);
        }
        self.state.address.reset();
        self.state.notice = None;
        self.state.phase = Phase::Ready;
    }

    fn rebuild_markers(&mut self) {
        self.state.markers = build_markers(&self.state.users, &self.state.listings);
        debug!("markers rebuilt: {}", self.state.markers.len());
    }

    fn spawn_fix_request(&mut self) {
        let provider = self.location.clone();
        let tx = self.events.clone();
        self.in_flight += 1;
        info!("requesting location fix from '{}'", provider.name());
        tokio::spawn(async move {
            let event = match provider.request_permission().await {
                // On denial the fix is never requested.
                PermissionStatus::Denied => {
                    ScreenEvent::FixFailed(LocationError::PermissionDenied)
                }
                PermissionStatus::Granted => match provider.current_fix().await {
                    Ok(coordinate) => ScreenEvent::FixAcquired(coordinate),
                    Err(e) => ScreenEvent::FixFailed(e),
                },
            };
            if tx.send(event).await.is_err() {
                warn!("fix event send failed: receiver dropped");
            }
        });
    }

    fn spawn_directory_fetch(&mut self) {
        let gateway = self.gateway.clone();
        let tx = self.events.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = match gateway.fetch_users().await {
                Ok(users) => ScreenEvent::UsersLoaded(users),
                Err(e) => ScreenEvent::UsersFailed(e),
            };
            if tx.send(event).await.is_err() {
                warn!("users event send failed: receiver dropped");
            }
        });

        let gateway = self.gateway.clone();
        let tx = self.events.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = match gateway.fetch_listings().await {
                Ok(listings) => ScreenEvent::ListingsLoaded(listings),
                Err(e) => ScreenEvent::ListingsFailed(e),
            };
            if tx.send(event).await.is_err() {
                warn!("listings event send failed: receiver dropped");
            }
        });
    }

    fn spawn_address_resolution(&mut self, text: String, submission: Uuid) {
        let gateway = self.gateway.clone();
        let tx = self.events.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            // Two stages, strictly sequential: the details call needs
            // the place id from the first.
            let place = match gateway.resolve_address(&text).await {
                Ok(place) => place,
                Err(error) => {
                    if tx
                        .send(ScreenEvent::AddressFailed { submission, error })
                        .await
                        .is_err()
                    {
                        warn!("address event send failed: receiver dropped");
                    }
                    return;
                }
            };

            let place_id = place.place_id.clone();
            if tx
                .send(ScreenEvent::AddressCandidate { submission, place })
                .await
                .is_err()
            {
                warn!("address event send failed: receiver dropped");
                return;
            }

            let event = match gateway.resolve_place(&place_id).await {
                Ok(coordinate) => ScreenEvent::AddressResolved { submission, coordinate },
                Err(error) => ScreenEvent::AddressFailed { submission, error },
            };
            if tx.send(event).await.is_err() {
                warn!("address event send failed: receiver dropped");
            }
        });
    }
}
