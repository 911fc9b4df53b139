//! Search-area rings and line measurement

use crate::models::LatLng;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Each buffer ring grows the radius by this fraction of the base radius
const BUFFER_STEP: f64 = 0.5;

/// Opacity ratio between neighbouring outer buffers
const BUFFER_FADE: f64 = 0.6;

/// Parameters for one round of ring generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    pub center: LatLng,
    pub radius_meters: f64,
    pub buffer_count: u32,
    pub segments: u32,
}

/// One concentric ring around the search center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAreaRing {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_meters: f64,
    /// 0 is the primary radius, 1..N are outer buffers
    pub buffer_index: u32,
    /// Closed ring in (lng, lat) order, first position repeated at the end
    pub polygon: Vec<[f64; 2]>,
}

impl SearchAreaRing {
    /// Fill opacity, fading with each outer buffer
    #[must_use]
    pub fn opacity(&self) -> f64 {
        if self.buffer_index == 0 {
            0.2
        } else {
            let step = i32::try_from(self.buffer_index - 1).unwrap_or(i32::MAX);
            0.1 * BUFFER_FADE.powi(step)
        }
    }

    #[must_use]
    pub fn to_geojson(&self) -> Feature {
        let ring = self.polygon.iter().map(|p| p.to_vec()).collect();

        let mut properties = JsonObject::new();
        properties.insert("radius_meters".into(), self.radius_meters.into());
        properties.insert("buffer_index".into(), self.buffer_index.into());
        properties.insert("fill_opacity".into(), self.opacity().into());

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Closed polygon approximating a circle of `radius_meters` around `center`.
///
/// Equirectangular approximation, good enough for radii of a few tens of
/// kilometers away from the poles. Returns `segments + 1` positions in
/// (lng, lat) order.
#[must_use]
pub fn circle_polygon(center: LatLng, radius_meters: f64, segments: u32) -> Vec<[f64; 2]> {
    let lat_degrees = radius_meters / METERS_PER_DEGREE;
    let lng_degrees = radius_meters / (METERS_PER_DEGREE * center.lat.to_radians().cos());

    let mut polygon: Vec<[f64; 2]> = (0..segments)
        .map(|i| {
            let theta = f64::from(i) / f64::from(segments) * 2.0 * PI;
            [
                center.lng + lng_degrees * theta.sin(),
                center.lat + lat_degrees * theta.cos(),
            ]
        })
        .collect();

    if let Some(first) = polygon.first().copied() {
        polygon.push(first);
    }
    polygon
}

/// Ring 0 at the base radius plus `buffer_count` outer rings at
/// `radius × (1 + 0.5·i)`.
#[must_use]
pub fn search_rings(spec: &RingSpec) -> Vec<SearchAreaRing> {
    (0..=spec.buffer_count)
        .map(|buffer_index| {
            let radius_meters = spec.radius_meters * (1.0 + BUFFER_STEP * f64::from(buffer_index));
            SearchAreaRing {
                center_lat: spec.center.lat,
                center_lng: spec.center.lng,
                radius_meters,
                buffer_index,
                polygon: circle_polygon(spec.center, radius_meters, spec.segments),
            }
        })
        .collect()
}

#[must_use]
pub fn rings_to_geojson(rings: &[SearchAreaRing]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: rings.iter().map(SearchAreaRing::to_geojson).collect(),
        foreign_members: None,
    }
}

/// Length of a polyline in kilometers, summed over haversine segments
pub fn line_length_km<I: IntoIterator<Item = LatLng>>(points: I) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<LatLng> = None;
    for point in points {
        if let Some(prev) = previous {
            total += prev.distance_km(&point);
        }
        previous = Some(point);
    }
    total
}
