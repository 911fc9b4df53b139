//! Trail feature model

use super::{BoundingBox, LatLng};
use crate::builder::AxisOrder;
use crate::difficulty::{mtb_color, sac_color};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Swiss Alpine Club hiking grade (`sac_scale`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SacScale {
    Hiking,
    MountainHiking,
    DemandingMountainHiking,
    AlpineHiking,
    DemandingAlpineHiking,
    DifficultAlpineHiking,
}

impl SacScale {
    /// Parse a `sac_scale` tag value, unknown grades fall back to `Hiking`
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "mountain_hiking" => Self::MountainHiking,
            "demanding_mountain_hiking" => Self::DemandingMountainHiking,
            "alpine_hiking" => Self::AlpineHiking,
            "demanding_alpine_hiking" => Self::DemandingAlpineHiking,
            "difficult_alpine_hiking" => Self::DifficultAlpineHiking,
            _ => Self::Hiking,
        }
    }

    #[must_use]
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Hiking => "hiking",
            Self::MountainHiking => "mountain_hiking",
            Self::DemandingMountainHiking => "demanding_mountain_hiking",
            Self::AlpineHiking => "alpine_hiking",
            Self::DemandingAlpineHiking => "demanding_alpine_hiking",
            Self::DifficultAlpineHiking => "difficult_alpine_hiking",
        }
    }

    /// T1 through T6
    #[must_use]
    pub fn grade(&self) -> u8 {
        match self {
            Self::Hiking => 1,
            Self::MountainHiking => 2,
            Self::DemandingMountainHiking => 3,
            Self::AlpineHiking => 4,
            Self::DemandingAlpineHiking => 5,
            Self::DifficultAlpineHiking => 6,
        }
    }
}

/// Difficulty of a trail, from whichever scale tagged it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scale", content = "grade", rename_all = "snake_case")]
pub enum Difficulty {
    /// `mtb:scale`, 0 through 6
    Mtb(i64),
    Sac(SacScale),
}

impl Difficulty {
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            Self::Mtb(grade) => mtb_color(*grade),
            Self::Sac(scale) => sac_color(scale.as_tag()),
        }
    }

    /// Short badge label shown next to the trail name
    #[must_use]
    pub fn badge(&self) -> String {
        match self {
            Self::Mtb(grade) => format!("S{grade}"),
            Self::Sac(scale) => format!("T{}", scale.grade()),
        }
    }
}

/// A trail ready for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailFeature {
    /// OSM way id
    pub id: i64,
    pub name: String,
    /// Ordered coordinate pairs, laid out as `axis_order` says
    pub coordinates: Vec<[f64; 2]>,
    pub axis_order: AxisOrder,
    pub difficulty: Difficulty,
    /// OSM `surface` tag
    pub surface: Option<String>,
    pub length_km: f64,
    pub color: String,
    pub highlighted: bool,
}

impl TrailFeature {
    /// Coordinates as points, regardless of axis order
    pub fn points(&self) -> impl Iterator<Item = LatLng> + '_ {
        self.coordinates
            .iter()
            .map(|pair| self.axis_order.to_lat_lng(*pair))
    }

    #[must_use]
    pub fn first_point(&self) -> Option<LatLng> {
        self.points().next()
    }

    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points())
    }

    /// Surface and length, e.g. `gravel · 3.42 km`
    #[must_use]
    pub fn details(&self) -> String {
        let surface = self.surface.as_deref().unwrap_or("unknown surface");
        format!("{surface} · {:.2} km", self.length_km)
    }

    /// Line width and opacity the trail layer draws this feature with
    #[must_use]
    pub fn line_style(&self) -> (f64, f64) {
        if self.highlighted { (6.0, 1.0) } else { (3.0, 0.8) }
    }

    /// GeoJSON always uses longitude/latitude order
    #[must_use]
    pub fn to_geojson(&self) -> Feature {
        let line = self
            .points()
            .map(|point| vec![point.lng, point.lat])
            .collect();

        let (width, opacity) = self.line_style();
        let mut properties = JsonObject::new();
        properties.insert("name".into(), self.name.clone().into());
        properties.insert("difficulty".into(), self.difficulty.badge().into());
        properties.insert(
            "surface".into(),
            self.surface.clone().map_or(serde_json::Value::Null, Into::into),
        );
        properties.insert("length_km".into(), self.length_km.into());
        properties.insert("color".into(), self.color.clone().into());
        properties.insert("highlighted".into(), self.highlighted.into());
        properties.insert("line_width".into(), width.into());
        properties.insert("line_opacity".into(), opacity.into());

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(line))),
            id: Some(Id::Number(self.id.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

impl Display for TrailFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.difficulty.badge(),
            self.name,
            self.details()
        )
    }
}

/// All trails from one fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailSet {
    pub center: LatLng,
    pub radius_meters: u32,
    pub features: Vec<TrailFeature>,
    pub fetched_at: DateTime<Utc>,
}

impl TrailSet {
    #[must_use]
    pub fn new(center: LatLng, radius_meters: u32, features: Vec<TrailFeature>) -> Self {
        Self {
            center,
            radius_meters,
            features,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(TrailFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }

    /// Total length of all trails in kilometers
    #[must_use]
    pub fn total_length_km(&self) -> f64 {
        self.features.iter().map(|f| f.length_km).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(axis_order: AxisOrder) -> TrailFeature {
        let coordinates = match axis_order {
            AxisOrder::LngLat => vec![[9.83, 46.80], [9.84, 46.81]],
            AxisOrder::LatLng => vec![[46.80, 9.83], [46.81, 9.84]],
        };
        TrailFeature {
            id: 7,
            name: "Panorama".to_string(),
            coordinates,
            axis_order,
            difficulty: Difficulty::Mtb(2),
            surface: Some("gravel".to_string()),
            length_km: 1.5,
            color: "#FFEB3B".to_string(),
            highlighted: false,
        }
    }

    #[test]
    fn test_points_ignore_axis_order() {
        let a: Vec<LatLng> = sample(AxisOrder::LngLat).points().collect();
        let b: Vec<LatLng> = sample(AxisOrder::LatLng).points().collect();
        assert_eq!(a, b);
        assert_eq!(a[0], LatLng::new(46.80, 9.83));
    }

    #[test]
    fn test_geojson_is_lng_lat() {
        let feature = sample(AxisOrder::LatLng).to_geojson();
        match feature.geometry.unwrap().value {
            Value::LineString(line) => assert_eq!(line[0], vec![9.83, 46.80]),
            other => panic!("unexpected geometry {other:?}"),
        }
        let props = feature.properties.unwrap();
        assert_eq!(props["difficulty"], "S2");
        assert_eq!(props["highlighted"], false);
    }

    #[test]
    fn test_trail_set_total_length() {
        let mut second = sample(AxisOrder::LngLat);
        second.id = 8;
        second.length_km = 2.25;
        let set = TrailSet::new(LatLng::new(46.8, 9.83), 5000, vec![sample(AxisOrder::LngLat), second]);
        assert!((set.total_length_km() - 3.75).abs() < 1e-9);
        assert_eq!(set.to_geojson().features.len(), 2);
    }

    #[test]
    fn test_badges() {
        assert_eq!(Difficulty::Mtb(3).badge(), "S3");
        assert_eq!(Difficulty::Sac(SacScale::AlpineHiking).badge(), "T4");
    }

    #[test]
    fn test_sac_parse_fallback() {
        assert_eq!(SacScale::parse("demanding_alpine_hiking"), SacScale::DemandingAlpineHiking);
        assert_eq!(SacScale::parse("T3"), SacScale::Hiking);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample(AxisOrder::LngLat).to_string(),
            "[S2] Panorama (gravel · 1.50 km)"
        );
    }
}
