//! `trailscope` - mountain-bike and hiking trails around a place
//!
//! This library geocodes free-text places, queries OpenStreetMap for graded
//! trails within a search radius, turns the raw elements into displayable
//! trail features and keeps the map and trail list of a session in sync.

pub mod app;
pub mod builder;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod map;
pub mod models;
pub mod nominatim;
pub mod overpass;
pub mod panel;

// Re-export core types for public API
pub use app::{TrailApp, TrailSearchOutcome};
pub use builder::{AxisOrder, BuilderOptions, TrailFeatureBuilder};
pub use config::TrailscopeConfig;
pub use error::TrailError;
pub use geometry::{RingSpec, SearchAreaRing, search_rings};
pub use map::{HeadlessMap, MapStyle, MapView};
pub use models::{BoundingBox, Difficulty, LatLng, Place, SacScale, TrailFeature, TrailSet};
pub use nominatim::{Geocoder, NominatimClient};
pub use overpass::{OverpassClient, OverpassElement, TrailQuery, TrailSource};
pub use panel::TrailPanel;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TrailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
