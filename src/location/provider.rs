use std::fmt;

use async_trait::async_trait;

use crate::api::types::Coordinate;

/// Outcome of a permission request. `Denied` is not an error; the
/// screen shows it inline and waits for the user to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Errors a location provider can produce. Neither is retried
/// automatically; the retry path is the screen's location action.
#[derive(Debug, Clone)]
pub enum LocationError {
    /// Permission was not granted before the fix was requested.
    PermissionDenied,
    /// The provider could not produce a fix within its own deadline.
    PositionUnavailable(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::PermissionDenied => {
                write!(f, "permission to access location was denied")
            }
            LocationError::PositionUnavailable(msg) => {
                write!(f, "position unavailable: {msg}")
            }
        }
    }
}

impl std::error::Error for LocationError {}

/// The permission-gated location capability.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Asks for location permission. Must be awaited before any fix is
    /// requested; may prompt the user once per call.
    async fn request_permission(&self) -> PermissionStatus;

    /// Produces the current coordinate, or says why it can't.
    async fn current_fix(&self) -> Result<Coordinate, LocationError>;
}
