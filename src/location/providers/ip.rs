//! IP-geolocation provider: a coarse fix derived from the machine's
//! public IP, for hosts with no positioning hardware.
//!
//! Uses the ip-api.com response shape: `GET {base}/json` returning
//! `{"status": "success", "lat": ..., "lon": ...}` or
//! `{"status": "fail", "message": ...}`.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use crate::api::types::Coordinate;
use crate::location::provider::{LocationError, LocationProvider, PermissionStatus};

#[derive(Deserialize, Debug)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

pub struct IpLocation {
    client: reqwest::Client,
    base_url: String,
    consent: bool,
}

impl IpLocation {
    /// Creates a new IP-geolocation provider.
    ///
    /// # Arguments
    /// * `base_url` - Optional custom lookup base URL (defaults to
    ///   ip-api.com)
    /// * `consent` - Whether the user agreed to the lookup; without it
    ///   no request leaves the machine
    pub fn new(base_url: Option<String>, consent: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| "http://ip-api.com".to_string()),
            consent,
        }
    }
}

#[async_trait]
impl LocationProvider for IpLocation {
    fn name(&self) -> &str {
        "ip"
    }

    async fn request_permission(&self) -> PermissionStatus {
        if self.consent {
            PermissionStatus::Granted
        } else {
            debug!("ip location: consent not given");
            PermissionStatus::Denied
        }
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        if !self.consent {
            return Err(LocationError::PermissionDenied);
        }

        let url = format!("{}/json", self.base_url);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("ip lookup failed: HTTP {}", status);
            return Err(LocationError::PositionUnavailable(format!("HTTP {status}")));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| "lookup failed".to_string());
            warn!("ip lookup rejected: {}", reason);
            return Err(LocationError::PositionUnavailable(reason));
        }

        let coordinate = match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) => Coordinate { latitude, longitude },
            _ => {
                return Err(LocationError::PositionUnavailable(
                    "lookup response missing coordinates".to_string(),
                ));
            }
        };
        if !coordinate.in_bounds() {
            return Err(LocationError::PositionUnavailable(
                "lookup coordinate out of bounds".to_string(),
            ));
        }

        debug!(
            "ip fix: {:.4}, {:.4}",
            coordinate.latitude, coordinate.longitude
        );
        Ok(coordinate)
    }
}
