//! Turns raw Overpass elements into trail features
//!
//! Ways carry node id references only; coordinates are resolved against the
//! nodes returned in the same response. Relations are not emitted themselves,
//! their grade and name tags are handed down to member ways that lack them.

use crate::difficulty::{MAX_MTB_GRADE, parse_mtb_scale};
use crate::geometry::line_length_km;
use crate::models::{Difficulty, LatLng, SacScale, TrailFeature};
use crate::overpass::OverpassElement;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Tags a relation passes down to its member ways
const INHERITED_TAGS: [&str; 3] = ["mtb:scale", "sac_scale", "name"];

/// Layout of coordinate pairs in built features.
///
/// Vector-tile style renderers and GeoJSON expect `[lng, lat]`, raster tile
/// widgets usually take `[lat, lng]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    #[default]
    LngLat,
    LatLng,
}

impl AxisOrder {
    #[must_use]
    pub fn pair(&self, point: LatLng) -> [f64; 2] {
        match self {
            Self::LngLat => [point.lng, point.lat],
            Self::LatLng => [point.lat, point.lng],
        }
    }

    #[must_use]
    pub fn to_lat_lng(&self, pair: [f64; 2]) -> LatLng {
        match self {
            Self::LngLat => LatLng::new(pair[1], pair[0]),
            Self::LatLng => LatLng::new(pair[0], pair[1]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    pub axis_order: AxisOrder,
    /// Emit `sac_scale` trails; `mtb:scale` trails are always emitted
    pub include_sac: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            axis_order: AxisOrder::LngLat,
            include_sac: true,
        }
    }
}

pub struct TrailFeatureBuilder {
    options: BuilderOptions,
}

impl TrailFeatureBuilder {
    #[must_use]
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    /// Build one feature per qualifying way with at least two resolvable nodes
    #[must_use]
    pub fn build(&self, elements: &[OverpassElement]) -> Vec<TrailFeature> {
        let nodes: HashMap<i64, LatLng> = elements
            .iter()
            .filter_map(|element| match element {
                OverpassElement::Node { id, lat, lon, .. } => Some((*id, LatLng::new(*lat, *lon))),
                _ => None,
            })
            .collect();
        let inherited = inherited_tags(elements);

        let mut features = Vec::new();
        let mut dropped = 0usize;

        for element in elements {
            let OverpassElement::Way {
                id,
                nodes: refs,
                tags,
            } = element
            else {
                continue;
            };

            let parent = inherited.get(id);
            let tag = |key: &str| {
                tags.get(key)
                    .or_else(|| parent.and_then(|p| p.get(key)))
                    .map(String::as_str)
            };

            let Some(difficulty) = self.difficulty(tag("mtb:scale"), tag("sac_scale")) else {
                continue;
            };

            let points: Vec<LatLng> = refs.iter().filter_map(|r| nodes.get(r).copied()).collect();
            if points.len() < 2 {
                debug!(
                    "Dropping way {} with {} of {} nodes resolved",
                    id,
                    points.len(),
                    refs.len()
                );
                dropped += 1;
                continue;
            }

            let name = tag("name")
                .or_else(|| tag("ref"))
                .unwrap_or("Unnamed trail")
                .to_string();

            features.push(TrailFeature {
                id: *id,
                name,
                coordinates: points.iter().map(|p| self.options.axis_order.pair(*p)).collect(),
                axis_order: self.options.axis_order,
                difficulty,
                surface: tag("surface").map(str::to_string),
                length_km: line_length_km(points.iter().copied()),
                color: difficulty.color().to_string(),
                highlighted: false,
            });
        }

        debug!(
            "Built {} trail features from {} elements ({} dropped)",
            features.len(),
            elements.len(),
            dropped
        );
        features
    }

    /// `mtb:scale` wins when a way carries both scales
    fn difficulty(&self, mtb_scale: Option<&str>, sac_scale: Option<&str>) -> Option<Difficulty> {
        if let Some(value) = mtb_scale {
            let grade = parse_mtb_scale(value)
                .filter(|grade| (0..=MAX_MTB_GRADE).contains(grade))
                .unwrap_or(0);
            return Some(Difficulty::Mtb(grade));
        }
        if self.options.include_sac {
            return sac_scale.map(|value| Difficulty::Sac(SacScale::parse(value)));
        }
        None
    }
}

/// Way id to the tags it inherits from the first relation listing it
fn inherited_tags(elements: &[OverpassElement]) -> HashMap<i64, HashMap<String, String>> {
    let mut inherited: HashMap<i64, HashMap<String, String>> = HashMap::new();

    for element in elements {
        let OverpassElement::Relation { members, tags, .. } = element else {
            continue;
        };
        let passed_down: HashMap<String, String> = tags
            .iter()
            .filter(|(key, _)| INHERITED_TAGS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if passed_down.is_empty() {
            continue;
        }

        for member in members.iter().filter(|m| m.member_type == "way") {
            inherited
                .entry(member.reference)
                .or_insert_with(|| passed_down.clone());
        }
    }

    inherited
}
