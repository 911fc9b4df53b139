//! End-to-end trail flow against recorded Overpass data

use async_trait::async_trait;
use rstest::rstest;
use trailscope::map::{RING_LAYER, TRAIL_LAYER};
use trailscope::overpass::parse_response;
use trailscope::panel::PanelStatus;
use trailscope::{
    AxisOrder, Difficulty, Geocoder, HeadlessMap, LatLng, MapView, OverpassElement, Place,
    SacScale, TrailApp, TrailError, TrailQuery, TrailSource, TrailscopeConfig,
};

const DAVOS_RESPONSE: &str = include_str!("fixtures/overpass_davos.json");

struct RecordedOverpass;

#[async_trait]
impl TrailSource for RecordedOverpass {
    async fn fetch_elements(&self, _query: &TrailQuery) -> trailscope::Result<Vec<OverpassElement>> {
        Ok(parse_response(DAVOS_RESPONSE)?.elements)
    }
}

struct StaticGeocoder(Vec<Place>);

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn lookup(&self, query: &str) -> trailscope::Result<Place> {
        self.0
            .first()
            .cloned()
            .ok_or_else(|| TrailError::not_found(query))
    }
}

fn davos() -> Place {
    Place {
        display_name: "Davos, Graubünden, Schweiz".to_string(),
        location: LatLng::new(46.8004, 9.8372),
        bounding_box: None,
    }
}

fn app(config: TrailscopeConfig, places: Vec<Place>) -> TrailApp<RecordedOverpass, StaticGeocoder, HeadlessMap> {
    let map = HeadlessMap::new(
        trailscope::map::Camera {
            center: LatLng::new(config.map.center_lat, config.map.center_lng),
            zoom: config.map.zoom,
            pitch: config.map.pitch,
            bearing: 0.0,
        },
        config.map.style,
        config.map.terrain,
    );
    TrailApp::new(config, RecordedOverpass, StaticGeocoder(places), map)
}

#[rstest]
#[case::with_sac(true, 3)]
#[case::mtb_only(false, 2)]
#[tokio::test]
async fn search_then_list_trails(#[case] include_sac: bool, #[case] expected: usize) {
    let mut config = TrailscopeConfig::default();
    config.trails.include_sac = include_sac;
    let mut app = app(config, vec![davos()]);

    app.search_place("Davos").await.unwrap();
    let count = app.search_trails().await.unwrap();

    assert_eq!(count, expected);
    assert_eq!(app.panel().status(), &PanelStatus::Trails);
    assert_eq!(app.panel().entries().len(), expected);
    assert!(app.features().iter().all(|f| f.coordinates.len() >= 2));
    assert_eq!(
        app.map().layer(TRAIL_LAYER).unwrap().data.features.len(),
        expected
    );
}

#[tokio::test]
async fn relation_grade_reaches_member_way() {
    let mut app = app(TrailscopeConfig::default(), vec![davos()]);
    app.search_trails().await.unwrap();

    let jakobshorn = app.features().iter().find(|f| f.id == 2001).unwrap();
    assert_eq!(jakobshorn.name, "Jakobshorn Trail");
    assert_eq!(jakobshorn.difficulty, Difficulty::Mtb(2));
    assert_eq!(jakobshorn.surface.as_deref(), Some("dirt"));
    assert_eq!(jakobshorn.coordinates.len(), 3);
    assert!(jakobshorn.length_km > 0.5 && jakobshorn.length_km < 1.0);

    let sertig = app.features().iter().find(|f| f.id == 2003).unwrap();
    assert_eq!(sertig.difficulty, Difficulty::Sac(SacScale::DemandingMountainHiking));

    assert!(app.features().iter().all(|f| f.id != 2004));
}

#[tokio::test]
async fn geocode_miss_keeps_view() {
    let mut app = app(TrailscopeConfig::default(), Vec::new());
    let before = app.map().camera();

    let err = app.search_place("Nowhere").await.unwrap_err();
    assert!(matches!(err, TrailError::NotFound { .. }));
    assert_eq!(app.map().camera(), before);
    assert!(matches!(app.panel().status(), PanelStatus::Message(m) if m.contains("not found")));
}

#[tokio::test]
async fn list_and_map_clicks() {
    let mut app = app(TrailscopeConfig::default(), vec![davos()]);
    app.search_trails().await.unwrap();

    app.select_trail(1).unwrap();
    let highlighted: Vec<i64> = app
        .features()
        .iter()
        .filter(|f| f.highlighted)
        .map(|f| f.id)
        .collect();
    assert_eq!(highlighted, vec![2002]);
    assert_eq!(app.map().popup().unwrap().anchor, LatLng::new(46.7961, 9.8301));

    // a map click adds to the selection instead of replacing it
    app.click_trail(2003).unwrap();
    assert_eq!(app.features().iter().filter(|f| f.highlighted).count(), 2);

    // and a list click makes it exclusive again
    app.select_trail(0).unwrap();
    assert_eq!(app.features().iter().filter(|f| f.highlighted).count(), 1);
}

#[tokio::test]
async fn lat_lng_layout_still_exports_lng_lat_geojson() {
    let mut config = TrailscopeConfig::default();
    config.trails.axis_order = AxisOrder::LatLng;
    let mut app = app(config, vec![davos()]);
    app.search_trails().await.unwrap();

    let steilhang = app.features().iter().find(|f| f.id == 2002).unwrap();
    assert_eq!(steilhang.coordinates[0], [46.7961, 9.8301]);

    let collection = app.trail_collection();
    let json = serde_json::to_value(&collection).unwrap();
    let first = &json["features"][1]["geometry"]["coordinates"][0];
    assert_eq!(first[0], 9.8301);
    assert_eq!(first[1], 46.7961);
}

#[tokio::test]
async fn rings_follow_the_camera() {
    let mut app = app(TrailscopeConfig::default(), vec![davos()]);
    app.search_place("Davos").await.unwrap();

    let rings = app.rings();
    assert_eq!(rings.len(), 6);
    assert!(rings.iter().all(|r| r.polygon.len() == 65));
    assert!(rings.iter().all(|r| r.center_lat == 46.8004 && r.center_lng == 9.8372));
    assert_eq!(rings[5].radius_meters, 17_500.0);
    assert_eq!(
        app.map().layer(RING_LAYER).unwrap().data.features.len(),
        6
    );
}
