//! Nominatim free-text geocoding

use crate::config::NominatimConfig;
use crate::models::{BoundingBox, LatLng, Place};
use crate::{Result, TrailError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const SERVICE: &str = "Nominatim";

/// One entry of a `format=json` search response.
///
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimEntry {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    /// `[south, north, west, east]`
    #[serde(default)]
    pub boundingbox: Option<[String; 4]>,
}

impl TryFrom<NominatimEntry> for Place {
    type Error = TrailError;

    fn try_from(entry: NominatimEntry) -> Result<Self> {
        let lat = parse_degrees(&entry.lat)?;
        let lng = parse_degrees(&entry.lon)?;

        let bounding_box = match &entry.boundingbox {
            Some([south, north, west, east]) => Some(BoundingBox {
                south: parse_degrees(south)?,
                west: parse_degrees(west)?,
                north: parse_degrees(north)?,
                east: parse_degrees(east)?,
            }),
            None => None,
        };

        Ok(Place {
            display_name: entry.display_name,
            location: LatLng::new(lat, lng),
            bounding_box,
        })
    }
}

fn parse_degrees(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| TrailError::malformed(format!("Invalid coordinate '{value}' from Nominatim")))
}

/// Free-text place lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// First match for `query`, `TrailError::NotFound` when there is none
    async fn lookup(&self, query: &str) -> Result<Place>;
}

pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TrailError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?format=json&q={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    /// All matches, best first
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<NominatimEntry>> {
        let url = self.search_url(query);
        debug!("Nominatim request URL: {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Nominatim answered {}", status);
            return Err(TrailError::http_status(SERVICE, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("json") {
            return Err(TrailError::content_type(SERVICE, content_type));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| TrailError::malformed(format!("Failed to parse Nominatim response: {e}")))
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Place> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TrailError::validation("Search text cannot be empty"));
        }

        let entry = self
            .search(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TrailError::not_found(query))?;

        let place = Place::try_from(entry)?;
        debug!(
            "Found location: {} ({})",
            place.display_name,
            place.location.format_coordinates()
        );
        Ok(place)
    }
}
