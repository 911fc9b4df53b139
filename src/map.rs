//! Map widget adapter
//!
//! `MapView` is the seam between the application state and whatever draws the
//! map. Layer data only ever reaches the map through `set_layer_data`; the
//! application keeps its own copy of every collection it pushes.
//! `HeadlessMap` keeps camera, layers and popup in memory, which is what the
//! CLI and the tests drive.

use crate::models::{BoundingBox, LatLng};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

pub const TRAIL_LAYER: &str = "trails";
pub const RING_LAYER: &str = "search-rings";

/// Web mercator world size at zoom 0, in pixels
const TILE_SIZE: f64 = 256.0;
const MAX_ZOOM: f64 = 19.0;
const MAX_MERCATOR_LAT: f64 = 85.0511;

/// Base map variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    /// Satellite imagery with 3D terrain and sky
    #[default]
    Satellite,
    /// OpenStreetMap raster tiles, flat
    Outdoor,
}

impl MapStyle {
    #[must_use]
    pub fn tile_url(&self) -> &'static str {
        match self {
            Self::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            Self::Outdoor => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    #[must_use]
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::Satellite => "Tiles © Esri",
            Self::Outdoor => "© OpenStreetMap contributors",
        }
    }

    #[must_use]
    pub fn supports_terrain(&self) -> bool {
        matches!(self, Self::Satellite)
    }

    #[must_use]
    pub fn toggled(&self) -> Self {
        match self {
            Self::Satellite => Self::Outdoor,
            Self::Outdoor => Self::Satellite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: LatLng,
    pub zoom: f64,
    /// Tilt in degrees, 0 looks straight down
    pub pitch: f64,
    pub bearing: f64,
}

/// Informational bubble anchored to a map position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub anchor: LatLng,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub data: FeatureCollection,
    pub visible: bool,
}

pub trait MapView {
    fn camera(&self) -> Camera;
    fn style(&self) -> MapStyle;
    fn terrain_enabled(&self) -> bool;

    /// Move the camera to `center`, optionally changing zoom
    fn fly_to(&mut self, center: LatLng, zoom: Option<f64>);
    /// Frame `bounds` in the viewport, keeping `padding` pixels free on each side
    fn fit_bounds(&mut self, bounds: BoundingBox, padding: f64);

    /// Replace a layer's data, creating the layer when missing
    fn set_layer_data(&mut self, name: &str, data: FeatureCollection);
    fn set_layer_visible(&mut self, name: &str, visible: bool);

    fn show_popup(&mut self, popup: Popup);
    fn close_popup(&mut self);

    fn set_style(&mut self, style: MapStyle);
    /// Returns whether terrain is now on; styles without terrain stay flat
    fn set_terrain(&mut self, enabled: bool) -> bool;
}

/// In-memory map used by the CLI and tests
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    camera: Camera,
    style: MapStyle,
    terrain: bool,
    /// Viewport size in pixels
    viewport: (f64, f64),
    layers: BTreeMap<String, Layer>,
    popup: Option<Popup>,
}

impl HeadlessMap {
    #[must_use]
    pub fn new(camera: Camera, style: MapStyle, terrain: bool) -> Self {
        Self {
            camera,
            style,
            terrain: terrain && style.supports_terrain(),
            viewport: (1280.0, 800.0),
            layers: BTreeMap::new(),
            popup: None,
        }
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = (width, height);
        self
    }

    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    #[must_use]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// Sky is drawn whenever terrain is
    #[must_use]
    pub fn sky_enabled(&self) -> bool {
        self.terrain
    }
}

impl MapView for HeadlessMap {
    fn camera(&self) -> Camera {
        self.camera
    }

    fn style(&self) -> MapStyle {
        self.style
    }

    fn terrain_enabled(&self) -> bool {
        self.terrain
    }

    fn fly_to(&mut self, center: LatLng, zoom: Option<f64>) {
        debug!("Flying to {}", center.format_coordinates());
        self.camera.center = center;
        if let Some(zoom) = zoom {
            self.camera.zoom = zoom.clamp(0.0, MAX_ZOOM);
        }
    }

    fn fit_bounds(&mut self, bounds: BoundingBox, padding: f64) {
        let (width, height) = self.viewport;
        let usable_w = (width - 2.0 * padding).max(1.0);
        let usable_h = (height - 2.0 * padding).max(1.0);

        let span_x = (lng_to_x(bounds.east) - lng_to_x(bounds.west)).abs();
        let span_y = (lat_to_y(bounds.south) - lat_to_y(bounds.north)).abs();

        let zoom_x = if span_x > 0.0 { (usable_w / span_x).log2() } else { MAX_ZOOM };
        let zoom_y = if span_y > 0.0 { (usable_h / span_y).log2() } else { MAX_ZOOM };

        self.camera.center = bounds.center();
        self.camera.zoom = zoom_x.min(zoom_y).clamp(0.0, MAX_ZOOM);
        debug!(
            "Fitted bounds around {} at zoom {:.2}",
            self.camera.center.format_coordinates(),
            self.camera.zoom
        );
    }

    fn set_layer_data(&mut self, name: &str, data: FeatureCollection) {
        match self.layers.get_mut(name) {
            Some(layer) => layer.data = data,
            None => {
                self.layers.insert(
                    name.to_string(),
                    Layer {
                        data,
                        visible: true,
                    },
                );
            }
        }
    }

    fn set_layer_visible(&mut self, name: &str, visible: bool) {
        if let Some(layer) = self.layers.get_mut(name) {
            layer.visible = visible;
        }
    }

    fn show_popup(&mut self, popup: Popup) {
        self.popup = Some(popup);
    }

    fn close_popup(&mut self) {
        self.popup = None;
    }

    fn set_style(&mut self, style: MapStyle) {
        self.style = style;
        if !style.supports_terrain() {
            self.terrain = false;
        }
    }

    fn set_terrain(&mut self, enabled: bool) -> bool {
        self.terrain = enabled && self.style.supports_terrain();
        self.terrain
    }
}

/// Mercator x at zoom 0
fn lng_to_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0 * TILE_SIZE
}

/// Mercator y at zoom 0
fn lat_to_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * TILE_SIZE
}
