//! Configuration management for `trailscope`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TrailError;
use crate::builder::AxisOrder;
use crate::map::MapStyle;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailscopeConfig {
    /// Overpass API settings
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Nominatim geocoder settings
    #[serde(default)]
    pub nominatim: NominatimConfig,
    /// Search area settings
    #[serde(default)]
    pub search: SearchConfig,
    /// Initial map view
    #[serde(default)]
    pub map: MapConfig,
    /// Trail filtering and geometry layout
    #[serde(default)]
    pub trails: TrailsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter endpoint
    #[serde(default = "default_overpass_url")]
    pub base_url: String,
    /// Request timeout in seconds, also passed as `[timeout:N]` to the query
    #[serde(default = "default_overpass_timeout")]
    pub timeout_seconds: u32,
    /// Retries on transient failures. Zero keeps the single-attempt behavior.
    #[serde(default)]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NominatimConfig {
    #[serde(default = "default_nominatim_url")]
    pub base_url: String,
    #[serde(default = "default_nominatim_timeout")]
    pub timeout_seconds: u32,
    /// Nominatim rejects requests without an identifying agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Primary search radius in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: u32,
    /// Number of outer buffer rings drawn around the primary radius
    #[serde(default = "default_buffer_count")]
    pub buffer_count: u32,
    /// Segments per ring polygon
    #[serde(default = "default_ring_segments")]
    pub ring_segments: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default = "default_pitch")]
    pub pitch: f64,
    #[serde(default)]
    pub style: MapStyle,
    /// Only meaningful for styles that support terrain
    #[serde(default = "default_terrain")]
    pub terrain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailsConfig {
    /// Include `sac_scale` hiking trails next to `mtb:scale` ones
    #[serde(default = "default_include_sac")]
    pub include_sac: bool,
    #[serde(default)]
    pub axis_order: AxisOrder,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_overpass_timeout() -> u32 {
    30
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_nominatim_timeout() -> u32 {
    10
}

fn default_user_agent() -> String {
    format!("trailscope/{}", env!("CARGO_PKG_VERSION"))
}

fn default_radius_meters() -> u32 {
    5000
}

fn default_buffer_count() -> u32 {
    5
}

fn default_ring_segments() -> u32 {
    64
}

fn default_center_lat() -> f64 {
    46.8182
}

fn default_center_lng() -> f64 {
    8.2275
}

fn default_zoom() -> f64 {
    12.0
}

fn default_pitch() -> f64 {
    45.0
}

fn default_terrain() -> bool {
    true
}

fn default_include_sac() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            base_url: default_overpass_url(),
            timeout_seconds: default_overpass_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: default_nominatim_url(),
            timeout_seconds: default_nominatim_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_meters: default_radius_meters(),
            buffer_count: default_buffer_count(),
            ring_segments: default_ring_segments(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
            pitch: default_pitch(),
            style: MapStyle::default(),
            terrain: default_terrain(),
        }
    }
}

impl Default for TrailsConfig {
    fn default() -> Self {
        Self {
            include_sac: default_include_sac(),
            axis_order: AxisOrder::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TrailscopeConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRAILSCOPE_SEARCH__RADIUS_METERS=8000 and friends
        builder = builder.add_source(
            Environment::with_prefix("TRAILSCOPE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TrailscopeConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trailscope").join("config.toml"))
    }

    /// Apply default values to empty or zeroed fields
    pub fn apply_defaults(&mut self) {
        if self.overpass.base_url.is_empty() {
            self.overpass.base_url = default_overpass_url();
        }
        if self.overpass.timeout_seconds == 0 {
            self.overpass.timeout_seconds = default_overpass_timeout();
        }
        if self.nominatim.base_url.is_empty() {
            self.nominatim.base_url = default_nominatim_url();
        }
        if self.nominatim.timeout_seconds == 0 {
            self.nominatim.timeout_seconds = default_nominatim_timeout();
        }
        if self.nominatim.user_agent.is_empty() {
            self.nominatim.user_agent = default_user_agent();
        }
        if self.search.radius_meters == 0 {
            self.search.radius_meters = default_radius_meters();
        }
        if self.search.ring_segments == 0 {
            self.search.ring_segments = default_ring_segments();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.overpass.timeout_seconds > 300 || self.nominatim.timeout_seconds > 300 {
            return Err(TrailError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.overpass.max_retries > 10 {
            return Err(TrailError::config("Overpass max retries cannot exceed 10").into());
        }

        // Ring geometry uses an equirectangular approximation
        if self.search.radius_meters > 50_000 {
            return Err(TrailError::config("Search radius cannot exceed 50000 meters").into());
        }

        if self.search.buffer_count > 10 {
            return Err(TrailError::config("Buffer ring count cannot exceed 10").into());
        }

        if !(3..=1024).contains(&self.search.ring_segments) {
            return Err(
                TrailError::config("Ring segments must be between 3 and 1024").into(),
            );
        }

        if !(-85.0..=85.0).contains(&self.map.center_lat) {
            return Err(TrailError::config("Map center latitude must be within ±85°").into());
        }

        if !(-180.0..=180.0).contains(&self.map.center_lng) {
            return Err(TrailError::config("Map center longitude must be within ±180°").into());
        }

        if !(0.0..=22.0).contains(&self.map.zoom) {
            return Err(TrailError::config("Map zoom must be between 0 and 22").into());
        }

        if !(0.0..=85.0).contains(&self.map.pitch) {
            return Err(TrailError::config("Map pitch must be between 0 and 85 degrees").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TrailError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TrailError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Overpass", &self.overpass.base_url),
            ("Nominatim", &self.nominatim.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TrailError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
