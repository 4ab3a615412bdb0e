//! Geographic value types.
//!
//! Both types are immutable values: a change replaces the whole value.

use serde::{Deserialize, Serialize};

/// Camera viewpoint: the coordinate at the center of the viewport plus zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Zoom level (0 shows the whole world)
    pub zoom: f64,
}

impl CameraPosition {
    /// Create a camera position.
    pub const fn new(latitude: f64, longitude: f64, zoom: f64) -> Self {
        Self { latitude, longitude, zoom }
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.zoom.is_finite()
    }
}

impl Default for CameraPosition {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Last known device position, as reported by the engine's location component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f32,
}

impl Location {
    /// Create a location.
    pub const fn new(latitude: f64, longitude: f64, accuracy: f32) -> Self {
        Self { latitude, longitude, accuracy }
    }
}
