//! Overpass API client
//!
//! Builds the trail query for a search circle and fetches raw OSM elements.
//! A response is only accepted when it is a 2xx, declares a JSON content type
//! and carries an `elements` array.

use crate::config::OverpassConfig;
use crate::models::LatLng;
use crate::{Result, TrailError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const SERVICE: &str = "Overpass";

/// Raw OSM element as returned by `[out:json]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: i64,
        /// Ordered node references
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<RelationMember>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    /// Areas, derived elements and anything newer
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationMember {
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(rename = "ref")]
    pub reference: i64,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<OverpassElement>,
    /// Set by the server on runtime errors such as query timeouts
    #[serde(default)]
    pub remark: Option<String>,
}

/// Which trail scales to ask for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailQuery {
    pub center: LatLng,
    pub radius_meters: u32,
    pub include_sac: bool,
    pub timeout_seconds: u32,
}

impl TrailQuery {
    /// Overpass QL for graded ways and relations in the circle, plus every
    /// node they reference
    #[must_use]
    pub fn to_overpass_ql(&self) -> String {
        let around = format!(
            "(around:{},{},{})",
            self.radius_meters, self.center.lat, self.center.lng
        );

        let mut tags = vec!["mtb:scale"];
        if self.include_sac {
            tags.push("sac_scale");
        }

        let mut ql = format!("[out:json][timeout:{}];\n(\n", self.timeout_seconds);
        for tag in tags {
            for kind in ["way", "relation"] {
                ql.push_str(&format!("  {kind}[\"{tag}\"]{around};\n"));
            }
        }
        ql.push_str(");\n(._;>;);\nout body;");
        ql
    }
}

/// Anything that can answer a trail query with raw elements
#[async_trait]
pub trait TrailSource: Send + Sync {
    async fn fetch_elements(&self, query: &TrailQuery) -> Result<Vec<OverpassElement>>;
}

pub struct OverpassClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .map_err(|e| TrailError::config(format!("Failed to create HTTP client: {e}")))?;

        let mut builder = ClientBuilder::new(client);
        if config.max_retries > 0 {
            let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
        }

        Ok(Self {
            client: builder.build(),
            base_url: config.base_url.clone(),
        })
    }

    /// POST a raw Overpass QL query
    #[instrument(skip(self, ql), fields(url = %self.base_url))]
    pub async fn execute(&self, ql: &str) -> Result<OverpassResponse> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.base_url)
            .header(USER_AGENT, concat!("trailscope/", env!("CARGO_PKG_VERSION")))
            .body(ql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Overpass answered {}", status);
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
        let parsed = parse_response(&body)?;

        if let Some(remark) = &parsed.remark {
            warn!("Overpass remark: {}", remark);
        }
        info!(
            "Overpass returned {} elements in {:?}",
            parsed.elements.len(),
            start.elapsed()
        );
        Ok(parsed)
    }
}

#[async_trait]
impl TrailSource for OverpassClient {
    async fn fetch_elements(&self, query: &TrailQuery) -> Result<Vec<OverpassElement>> {
        let ql = query.to_overpass_ql();
        debug!("Overpass query:\n{}", ql);
        Ok(self.execute(&ql).await?.elements)
    }
}

/// Parse an Overpass JSON body, rejecting bodies without `elements`
pub fn parse_response(body: &str) -> Result<OverpassResponse> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TrailError::malformed(format!("Overpass body is not JSON: {e}")))?;

    if value.get("elements").is_none() {
        return Err(TrailError::malformed(
            "Overpass response has no elements field",
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| TrailError::malformed(format!("Unexpected Overpass element: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(include_sac: bool) -> TrailQuery {
        TrailQuery {
            center: LatLng::new(46.8, 9.83),
            radius_meters: 5000,
            include_sac,
            timeout_seconds: 25,
        }
    }

    #[test]
    fn test_query_with_sac() {
        let ql = query(true).to_overpass_ql();
        assert!(ql.starts_with("[out:json][timeout:25];"));
        assert!(ql.contains(r#"way["mtb:scale"](around:5000,46.8,9.83);"#));
        assert!(ql.contains(r#"relation["mtb:scale"](around:5000,46.8,9.83);"#));
        assert!(ql.contains(r#"way["sac_scale"](around:5000,46.8,9.83);"#));
        assert!(ql.contains("(._;>;);"));
        assert!(ql.ends_with("out body;"));
    }

    #[test]
    fn test_query_without_sac() {
        let ql = query(false).to_overpass_ql();
        assert!(ql.contains("mtb:scale"));
        assert!(!ql.contains("sac_scale"));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 46.8, "lon": 9.83},
                {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"mtb:scale": "1"}},
                {"type": "area", "id": 3600000001}
            ]
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.elements.len(), 3);
        assert!(matches!(response.elements[0], OverpassElement::Node { id: 1, .. }));
        assert!(matches!(response.elements[2], OverpassElement::Other));
        assert!(response.remark.is_none());
    }

    #[test]
    fn test_parse_response_without_elements() {
        let err = parse_response(r#"{"version": 0.6}"#).unwrap_err();
        assert!(matches!(err, TrailError::MalformedResponse { .. }));
        assert!(err.to_string().contains("no elements"));
    }

    #[test]
    fn test_parse_response_not_json() {
        let err = parse_response("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, TrailError::MalformedResponse { .. }));
    }

    #[test]
    fn test_client_creation() {
        let client = OverpassClient::new(&OverpassConfig::default()).unwrap();
        assert_eq!(client.base_url, "https://overpass-api.de/api/interpreter");
    }
}
