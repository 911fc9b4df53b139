//! Application state
//!
//! `TrailApp` owns everything a session needs: configuration, the two data
//! services, the map and the current feature collections. It is created once
//! at startup and dropped on exit. Every user action is a method taking
//! `&mut self`; the map only ever sees copies pushed through `MapView`.

use crate::builder::{BuilderOptions, TrailFeatureBuilder};
use crate::config::TrailscopeConfig;
use crate::geometry::{RingSpec, SearchAreaRing, rings_to_geojson, search_rings};
use crate::map::{Camera, HeadlessMap, MapStyle, MapView, Popup, RING_LAYER, TRAIL_LAYER};
use crate::models::{LatLng, Place, TrailFeature, TrailSet};
use crate::nominatim::{Geocoder, NominatimClient};
use crate::overpass::{OverpassClient, OverpassElement, TrailQuery, TrailSource};
use crate::panel::TrailPanel;
use crate::{Result, TrailError};
use geojson::FeatureCollection;
use tracing::{debug, info, instrument, warn};

/// Padding kept free around a trail when zooming to it
const FIT_PADDING_PX: f64 = 50.0;

/// A trail fetch that has been started but not applied yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailRequest {
    generation: u64,
    pub query: TrailQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailSearchOutcome {
    /// Results were applied, with this many trails
    Applied(usize),
    /// A newer search started meanwhile, results were dropped
    Stale,
}

pub struct TrailApp<S, G, M> {
    config: TrailscopeConfig,
    source: S,
    geocoder: G,
    map: M,
    builder: TrailFeatureBuilder,
    trails: Option<TrailSet>,
    rings: Vec<SearchAreaRing>,
    rings_visible: bool,
    panel: TrailPanel,
    generation: u64,
}

impl TrailApp<OverpassClient, NominatimClient, HeadlessMap> {
    /// Wire the live Overpass and Nominatim clients to an in-memory map
    pub fn from_config(config: TrailscopeConfig) -> Result<Self> {
        let source = OverpassClient::new(&config.overpass)?;
        let geocoder = NominatimClient::new(&config.nominatim)?;
        let map = HeadlessMap::new(
            Camera {
                center: LatLng::new(config.map.center_lat, config.map.center_lng),
                zoom: config.map.zoom,
                pitch: config.map.pitch,
                bearing: 0.0,
            },
            config.map.style,
            config.map.terrain,
        );
        Ok(Self::new(config, source, geocoder, map))
    }
}

impl<S, G, M> TrailApp<S, G, M>
where
    S: TrailSource,
    G: Geocoder,
    M: MapView,
{
    pub fn new(config: TrailscopeConfig, source: S, geocoder: G, map: M) -> Self {
        let builder = TrailFeatureBuilder::new(BuilderOptions {
            axis_order: config.trails.axis_order,
            include_sac: config.trails.include_sac,
        });

        let mut app = Self {
            config,
            source,
            geocoder,
            map,
            builder,
            trails: None,
            rings: Vec::new(),
            rings_visible: true,
            panel: TrailPanel::default(),
            generation: 0,
        };
        app.push_trail_layer();
        app.on_move_end();
        app
    }

    #[must_use]
    pub fn config(&self) -> &TrailscopeConfig {
        &self.config
    }

    #[must_use]
    pub fn map(&self) -> &M {
        &self.map
    }

    #[must_use]
    pub fn panel(&self) -> &TrailPanel {
        &self.panel
    }

    #[must_use]
    pub fn trails(&self) -> Option<&TrailSet> {
        self.trails.as_ref()
    }

    #[must_use]
    pub fn features(&self) -> &[TrailFeature] {
        self.trails.as_ref().map_or(&[][..], |t| t.features.as_slice())
    }

    #[must_use]
    pub fn rings(&self) -> &[SearchAreaRing] {
        &self.rings
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        self.map.camera().center
    }

    #[must_use]
    pub fn trail_collection(&self) -> FeatureCollection {
        match &self.trails {
            Some(set) => set.to_geojson(),
            None => FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
        }
    }

    #[must_use]
    pub fn ring_collection(&self) -> FeatureCollection {
        rings_to_geojson(&self.rings)
    }

    /// Camera settled: regenerate every search ring around the new center
    pub fn on_move_end(&mut self) {
        let spec = RingSpec {
            center: self.center(),
            radius_meters: f64::from(self.config.search.radius_meters),
            buffer_count: self.config.search.buffer_count,
            segments: self.config.search.ring_segments,
        };
        self.rings = search_rings(&spec);
        debug!(
            "Regenerated {} search rings around {}",
            self.rings.len(),
            spec.center.format_coordinates()
        );
        let collection = self.ring_collection();
        self.map.set_layer_data(RING_LAYER, collection);
        self.map.set_layer_visible(RING_LAYER, self.rings_visible);
    }

    /// Pan to `center`, optionally zooming
    pub fn move_to(&mut self, center: LatLng, zoom: Option<f64>) -> Result<()> {
        if !center.is_valid() {
            return Err(TrailError::validation(format!(
                "Coordinates out of range: {}",
                center.format_coordinates()
            )));
        }
        self.map.fly_to(center, zoom);
        self.on_move_end();
        Ok(())
    }

    /// Geocode free text and recenter on the first match
    #[instrument(skip(self))]
    pub async fn search_place(&mut self, text: &str) -> Result<Place> {
        self.panel.show_loading(format!("Searching for {}…", text.trim()));

        match self.geocoder.lookup(text).await {
            Ok(place) => {
                info!(
                    "Centering on {} ({})",
                    place.display_name,
                    place.location.format_coordinates()
                );
                self.map.fly_to(place.location, None);
                self.on_move_end();

                // trails around the old center no longer apply, in flight or loaded
                self.generation += 1;
                self.trails = None;
                self.map.close_popup();
                self.push_trail_layer();
                self.panel.show_message(place.display_name.clone());
                Ok(place)
            }
            Err(e) => {
                warn!("Place search failed: {}", e);
                self.panel.show_message(e.user_message());
                Err(e)
            }
        }
    }

    /// Start a trail fetch around the current center.
    ///
    /// Starting a new request makes every earlier one stale.
    pub fn begin_trail_search(&mut self) -> TrailRequest {
        self.generation += 1;
        self.panel.show_loading("Loading trails…");
        TrailRequest {
            generation: self.generation,
            query: TrailQuery {
                center: self.center(),
                radius_meters: self.config.search.radius_meters,
                include_sac: self.config.trails.include_sac,
                timeout_seconds: self.config.overpass.timeout_seconds,
            },
        }
    }

    /// Apply the result of a fetch started with `begin_trail_search`
    pub fn complete_trail_search(
        &mut self,
        request: TrailRequest,
        result: Result<Vec<OverpassElement>>,
    ) -> Result<TrailSearchOutcome> {
        if request.generation != self.generation {
            debug!(
                "Dropping stale trail results (request {}, current {})",
                request.generation, self.generation
            );
            return Ok(TrailSearchOutcome::Stale);
        }

        let elements = match result {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Trail search failed: {}", e);
                self.trails = None;
                self.push_trail_layer();
                self.panel.show_message(e.user_message());
                return Err(e);
            }
        };

        let features = self.builder.build(&elements);
        let count = features.len();
        self.trails = Some(TrailSet::new(
            request.query.center,
            request.query.radius_meters,
            features,
        ));
        self.map.close_popup();
        self.push_trail_layer();
        self.refresh_panel();

        info!(
            "Loaded {} trails around {}",
            count,
            request.query.center.format_coordinates()
        );
        Ok(TrailSearchOutcome::Applied(count))
    }

    /// Fetch, build and display trails around the current center
    pub async fn search_trails(&mut self) -> Result<usize> {
        let request = self.begin_trail_search();
        let result = self.source.fetch_elements(&request.query).await;
        match self.complete_trail_search(request, result)? {
            TrailSearchOutcome::Applied(count) => Ok(count),
            TrailSearchOutcome::Stale => Ok(0),
        }
    }

    /// List click: zoom to the trail, highlight it exclusively, open its popup
    pub fn select_trail(&mut self, index: usize) -> Result<&TrailFeature> {
        let set = self
            .trails
            .as_mut()
            .ok_or_else(|| TrailError::validation("No trails loaded"))?;
        if index >= set.features.len() {
            return Err(TrailError::validation(format!(
                "No trail number {} in the list",
                index + 1
            )));
        }

        for (i, feature) in set.features.iter_mut().enumerate() {
            feature.highlighted = i == index;
        }
        let selected = set.features[index].clone();

        if let Some(bounds) = selected.bounding_box() {
            self.map.fit_bounds(bounds, FIT_PADDING_PX);
            self.on_move_end();
        }
        self.push_trail_layer();
        if let Some(anchor) = selected.first_point() {
            self.map.show_popup(Popup {
                anchor,
                title: selected.name.clone(),
                body: format!("{} · {}", selected.difficulty.badge(), selected.details()),
            });
        }
        self.refresh_panel();

        Ok(&self.features()[index])
    }

    /// Map click: flip this trail's highlight, leaving the others alone.
    /// Returns the new highlight state.
    pub fn click_trail(&mut self, trail_id: i64) -> Result<bool> {
        let feature = self
            .trails
            .as_mut()
            .and_then(|set| set.features.iter_mut().find(|f| f.id == trail_id))
            .ok_or_else(|| TrailError::validation(format!("Unknown trail {trail_id}")))?;

        feature.highlighted = !feature.highlighted;
        let highlighted = feature.highlighted;

        self.push_trail_layer();
        self.refresh_panel();
        Ok(highlighted)
    }

    /// Show or hide the search rings, returns the new visibility
    pub fn toggle_rings(&mut self) -> bool {
        self.rings_visible = !self.rings_visible;
        self.map.set_layer_visible(RING_LAYER, self.rings_visible);
        self.rings_visible
    }

    /// Returns whether terrain ended up enabled
    pub fn toggle_terrain(&mut self) -> bool {
        let wanted = !self.map.terrain_enabled();
        self.map.set_terrain(wanted)
    }

    /// Switch between satellite and outdoor base maps. Layers survive the switch.
    pub fn toggle_style(&mut self) -> MapStyle {
        let style = self.map.style().toggled();
        self.map.set_style(style);
        self.push_trail_layer();
        let rings = self.ring_collection();
        self.map.set_layer_data(RING_LAYER, rings);
        self.map.set_layer_visible(RING_LAYER, self.rings_visible);
        style
    }

    fn refresh_panel(&mut self) {
        let features = self
            .trails
            .as_ref()
            .map_or(&[][..], |t| t.features.as_slice());
        self.panel.render_trails(features);
    }

    fn push_trail_layer(&mut self) {
        let collection = self.trail_collection();
        self.map.set_layer_data(TRAIL_LAYER, collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeSource {
        elements: Option<Vec<OverpassElement>>,
    }

    #[async_trait]
    impl TrailSource for FakeSource {
        async fn fetch_elements(&self, _query: &TrailQuery) -> Result<Vec<OverpassElement>> {
            self.elements
                .clone()
                .ok_or_else(|| TrailError::http_status("Overpass", 504))
        }
    }

    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn lookup(&self, query: &str) -> Result<Place> {
            match query {
                "Davos" => Ok(Place {
                    display_name: "Davos, Graubünden, Schweiz".to_string(),
                    location: LatLng::new(46.8004, 9.8372),
                    bounding_box: None,
                }),
                _ => Err(TrailError::not_found(query)),
            }
        }
    }

    fn node(id: i64, lat: f64, lon: f64) -> OverpassElement {
        OverpassElement::Node {
            id,
            lat,
            lon,
            tags: HashMap::new(),
        }
    }

    fn way(id: i64, nodes: &[i64], scale: &str, name: &str) -> OverpassElement {
        OverpassElement::Way {
            id,
            nodes: nodes.to_vec(),
            tags: HashMap::from([
                ("mtb:scale".to_string(), scale.to_string()),
                ("name".to_string(), name.to_string()),
            ]),
        }
    }

    fn elements() -> Vec<OverpassElement> {
        vec![
            node(1, 46.80, 9.83),
            node(2, 46.81, 9.84),
            node(3, 46.82, 9.86),
            way(10, &[1, 2], "1", "Lower"),
            way(11, &[2, 3], "3", "Upper"),
            way(12, &[3, 404], "2", "Broken"),
        ]
    }

    fn app(elements: Option<Vec<OverpassElement>>) -> TrailApp<FakeSource, FakeGeocoder, HeadlessMap> {
        let config = TrailscopeConfig::default();
        let map = HeadlessMap::new(
            Camera {
                center: LatLng::new(config.map.center_lat, config.map.center_lng),
                zoom: config.map.zoom,
                pitch: config.map.pitch,
                bearing: 0.0,
            },
            config.map.style,
            config.map.terrain,
        );
        TrailApp::new(config, FakeSource { elements }, FakeGeocoder, map)
    }

    #[test]
    fn test_startup_draws_rings_and_empty_trail_layer() {
        let app = app(None);
        assert_eq!(app.rings().len(), 6);
        assert_eq!(app.map().layer(RING_LAYER).unwrap().data.features.len(), 6);
        assert!(app.map().layer(TRAIL_LAYER).unwrap().data.features.is_empty());
        assert_eq!(app.panel().status(), &PanelStatus::Idle);
    }

    #[tokio::test]
    async fn test_search_place_recenters() {
        let mut app = app(None);
        let place = app.search_place("Davos").await.unwrap();
        assert_eq!(app.center(), place.location);
        assert_eq!(app.rings()[0].center_lat, 46.8004);
        assert_eq!(app.rings()[0].center_lng, 9.8372);
    }

    #[tokio::test]
    async fn test_search_place_miss_shows_not_found() {
        let mut app = app(None);
        let before = app.center();
        let err = app.search_place("Atlantis").await.unwrap_err();
        assert!(matches!(err, TrailError::NotFound { .. }));
        assert_eq!(app.center(), before);
        assert_eq!(
            app.panel().status(),
            &PanelStatus::Message("Location not found: Atlantis".to_string())
        );
    }

    #[tokio::test]
    async fn test_new_place_clears_previous_trails() {
        let mut app = app(Some(elements()));
        app.search_trails().await.unwrap();
        app.select_trail(0).unwrap();
        let pending = app.begin_trail_search();

        app.search_place("Davos").await.unwrap();

        assert!(app.features().is_empty());
        assert!(app.trails().is_none());
        assert!(app.map().popup().is_none());
        assert!(app.map().layer(TRAIL_LAYER).unwrap().data.features.is_empty());
        assert!(app.panel().entries().is_empty());
        assert!(matches!(app.select_trail(0), Err(TrailError::Validation { .. })));

        let outcome = app.complete_trail_search(pending, Ok(elements())).unwrap();
        assert_eq!(outcome, TrailSearchOutcome::Stale);
        assert!(app.features().is_empty());
    }

    #[tokio::test]
    async fn test_search_trails_builds_features() {
        let mut app = app(Some(elements()));
        let count = app.search_trails().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(app.panel().entries().len(), 2);
        assert_eq!(app.map().layer(TRAIL_LAYER).unwrap().data.features.len(), 2);
        assert_eq!(app.trails().unwrap().center, app.center());
    }

    #[tokio::test]
    async fn test_search_trails_failure_is_shown_in_panel() {
        let mut app = app(None);
        let err = app.search_trails().await.unwrap_err();
        assert!(matches!(err, TrailError::HttpStatus { status: 504, .. }));
        match app.panel().status() {
            PanelStatus::Message(text) => assert!(text.contains("HTTP 504")),
            other => panic!("unexpected panel status {other:?}"),
        }
        assert!(app.features().is_empty());
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let mut app = app(None);
        let first = app.begin_trail_search();
        let second = app.begin_trail_search();

        let outcome = app.complete_trail_search(second, Ok(elements())).unwrap();
        assert_eq!(outcome, TrailSearchOutcome::Applied(2));

        let outcome = app.complete_trail_search(first, Ok(Vec::new())).unwrap();
        assert_eq!(outcome, TrailSearchOutcome::Stale);
        assert_eq!(app.features().len(), 2);
    }

    #[tokio::test]
    async fn test_select_trail_is_exclusive() {
        let mut app = app(Some(elements()));
        app.search_trails().await.unwrap();

        app.select_trail(0).unwrap();
        let selected = app.select_trail(1).unwrap().clone();
        assert!(selected.highlighted);
        assert!(!app.features()[0].highlighted);

        let popup = app.map().popup().unwrap();
        assert_eq!(popup.title, "Upper");
        assert_eq!(popup.anchor, LatLng::new(46.81, 9.84));

        let bounds = selected.bounding_box().unwrap();
        assert_eq!(app.center(), bounds.center());
        assert_eq!(app.rings()[0].center_lat, bounds.center().lat);
        assert!(app.panel().entries()[1].highlighted);
    }

    #[tokio::test]
    async fn test_select_trail_out_of_range() {
        let mut app = app(Some(elements()));
        assert!(app.select_trail(0).is_err());
        app.search_trails().await.unwrap();
        assert!(matches!(
            app.select_trail(5),
            Err(TrailError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_click_trail_toggles_independently() {
        let mut app = app(Some(elements()));
        app.search_trails().await.unwrap();
        let before = app.map().layer(TRAIL_LAYER).unwrap().data.clone();

        assert!(app.click_trail(10).unwrap());
        assert!(app.click_trail(11).unwrap());
        assert!(app.features().iter().all(|f| f.highlighted));

        assert!(!app.click_trail(10).unwrap());
        assert!(!app.click_trail(11).unwrap());
        assert_eq!(app.map().layer(TRAIL_LAYER).unwrap().data, before);

        assert!(app.click_trail(999).is_err());
    }

    #[test]
    fn test_view_toggles() {
        let mut app = app(None);
        assert!(!app.toggle_rings());
        assert!(!app.map().layer(RING_LAYER).unwrap().visible);
        app.move_to(LatLng::new(47.0, 10.0), Some(13.0)).unwrap();
        assert!(!app.map().layer(RING_LAYER).unwrap().visible);
        assert!(app.toggle_rings());

        assert!(!app.toggle_terrain());
        assert!(app.toggle_terrain());
        assert_eq!(app.toggle_style(), MapStyle::Outdoor);
        assert!(!app.map().terrain_enabled());
        assert!(!app.toggle_terrain());
    }

    #[test]
    fn test_move_to_rejects_invalid_coordinates() {
        let mut app = app(None);
        assert!(app.move_to(LatLng::new(120.0, 0.0), None).is_err());
    }
}
