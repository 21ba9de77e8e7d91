//! Joining directory records into map markers.
//!
//! One marker per lender, carrying every listing whose `owner_id`
//! matches. The join is pure and re-runnable: the screen calls it again
//! whenever either directory collection arrives, so partial data (users
//! loaded, listings still pending) renders fine.

use std::collections::HashMap;

use log::debug;

use crate::api::types::{Coordinate, ListingRecord, UserRecord};

/// A renderable map pin: a lender and their current listings.
/// Recomputed from the directory; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub owner: UserRecord,
    pub listings: Vec<ListingRecord>,
}

/// Joins the two directory collections into markers.
///
/// Markers come out in the same order as `users` — stable, no sorting
/// by distance or name. A lender with zero listings still gets a
/// marker. Listings whose owner is not in `users` are dropped; the two
/// collections are fetched independently, so the mismatch is expected
/// data-quality noise, not an error.
pub fn build_markers(users: &[UserRecord], listings: &[ListingRecord]) -> Vec<Marker> {
    let mut by_owner: HashMap<i64, Vec<ListingRecord>> = HashMap::new();
    for listing in listings {
        by_owner
            .entry(listing.owner_id)
            .or_default()
            .push(listing.clone());
    }

    let markers = users
        .iter()
        .map(|user| Marker {
            coordinate: user.coordinate,
            owner: user.clone(),
            listings: by_owner.remove(&user.profile_id).unwrap_or_default(),
        })
        .collect();

    // Whatever is left in the map has no matching lender.
    for (owner_id, orphans) in &by_owner {
        debug!(
            "dropping {} listing(s) with unknown owner {}",
            orphans.len(),
            owner_id
        );
    }

    markers
}
