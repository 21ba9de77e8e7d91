//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.toolmap/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::api::types::Coordinate;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolmapConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeocodingConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LocationConfig {
    /// "fixed" or "ip"
    pub source: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Stands in for the device permission prompt.
    pub consent: Option<bool>,
    pub ip_lookup_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MapConfig {
    pub latitude_delta: Option<f64>,
    pub longitude_delta: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub display_name: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:9090/api";
pub const DEFAULT_GEOCODE_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_IP_LOOKUP_BASE_URL: &str = "http://ip-api.com";
pub const DEFAULT_LATITUDE_DELTA: f64 = 0.75;
pub const DEFAULT_LONGITUDE_DELTA: f64 = 0.75;
// Central London, the pilot area.
pub const DEFAULT_HOME_LATITUDE: f64 = 51.5072;
pub const DEFAULT_HOME_LONGITUDE: f64 = -0.1276;
pub const DEFAULT_DISPLAY_NAME: &str = "You";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base_url: String,
    pub geocode_base_url: String,
    pub geocode_api_key: Option<String>,
    pub location_source: String,
    pub home: Coordinate,
    pub location_consent: bool,
    pub ip_lookup_base_url: String,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
    pub display_name: String,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.toolmap/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".toolmap").join("config.toml"))
}

/// Load config from `~/.toolmap/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ToolmapConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ToolmapConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(ToolmapConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(ToolmapConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: ToolmapConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Toolmap Configuration
# All settings are optional — defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [api]
# base_url = "http://localhost:9090/api"

# [geocoding]
# base_url = "https://maps.googleapis.com"
# api_key = "AIza..."                 # Or set GEOCODING_API_KEY env var

# [location]
# source = "fixed"                    # "fixed" or "ip"
# latitude = 51.5072                  # Used by the fixed source
# longitude = -0.1276
# consent = true                      # Location lookups are off without it
# ip_lookup_base_url = "http://ip-api.com"

# [map]
# latitude_delta = 0.75
# longitude_delta = 0.75

# [profile]
# display_name = "You"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env
/// vars → CLI.
///
/// `cli_source` is the `--location` flag (None = not specified).
pub fn resolve(config: &ToolmapConfig, cli_source: Option<&str>) -> ResolvedConfig {
    // Location source: CLI → env → config → default
    let location_source = cli_source
        .map(|s| s.to_string())
        .or_else(|| std::env::var("TOOLMAP_LOCATION_SOURCE").ok())
        .or_else(|| config.location.source.clone())
        .unwrap_or_else(|| "fixed".to_string());

    // API base URL: env → config → default
    let api_base_url = std::env::var("TOOLMAP_API_BASE_URL")
        .ok()
        .or_else(|| config.api.base_url.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    // Geocoding base URL: env → config → default
    let geocode_base_url = std::env::var("GEOCODING_BASE_URL")
        .ok()
        .or_else(|| config.geocoding.base_url.clone())
        .unwrap_or_else(|| DEFAULT_GEOCODE_BASE_URL.to_string());

    // Geocoding API key: env → config
    let geocode_api_key = std::env::var("GEOCODING_API_KEY")
        .ok()
        .or_else(|| config.geocoding.api_key.clone());

    // IP lookup base URL: env → config → default
    let ip_lookup_base_url = std::env::var("IP_LOOKUP_BASE_URL")
        .ok()
        .or_else(|| config.location.ip_lookup_base_url.clone())
        .unwrap_or_else(|| DEFAULT_IP_LOOKUP_BASE_URL.to_string());

    let home = Coordinate {
        latitude: config.location.latitude.unwrap_or(DEFAULT_HOME_LATITUDE),
        longitude: config.location.longitude.unwrap_or(DEFAULT_HOME_LONGITUDE),
    };

    ResolvedConfig {
        api_base_url,
        geocode_base_url,
        geocode_api_key,
        location_source,
        home,
        location_consent: config.location.consent.unwrap_or(true),
        ip_lookup_base_url,
        latitude_delta: config.map.latitude_delta.unwrap_or(DEFAULT_LATITUDE_DELTA),
        longitude_delta: config
            .map
            .longitude_delta
            .unwrap_or(DEFAULT_LONGITUDE_DELTA),
        display_name: config
            .profile
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
    }
}
