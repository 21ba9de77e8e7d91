//! Fixed location provider: a coordinate pinned in config, behind the
//! same consent gate a device would put in front of GPS.

use async_trait::async_trait;
use log::debug;

use crate::api::types::Coordinate;
use crate::location::provider::{LocationError, LocationProvider, PermissionStatus};

pub struct FixedLocation {
    coordinate: Coordinate,
    consent: bool,
}

impl FixedLocation {
    /// Creates a provider that always answers with `coordinate`,
    /// provided `consent` is set.
    pub fn new(coordinate: Coordinate, consent: bool) -> Self {
        Self { coordinate, consent }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn request_permission(&self) -> PermissionStatus {
        if self.consent {
            PermissionStatus::Granted
        } else {
            debug!("fixed location: consent not given");
            PermissionStatus::Denied
        }
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        if !self.consent {
            return Err(LocationError::PermissionDenied);
        }
        if !self.coordinate.in_bounds() {
            return Err(LocationError::PositionUnavailable(
                "configured coordinate out of bounds".to_string(),
            ));
        }
        Ok(self.coordinate)
    }
}
