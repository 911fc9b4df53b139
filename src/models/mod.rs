//! Data models for trailscope
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates, bounding boxes and geocoded places
//! - Trail: trail features, difficulty grades and fetched trail sets

pub mod location;
pub mod trail;

// Re-export all public types for convenient access
pub use location::{BoundingBox, LatLng, Place};
pub use trail::{Difficulty, SacScale, TrailFeature, TrailSet};
