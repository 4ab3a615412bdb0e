//! Marker overlays.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of an icon resource.
///
/// References are resolved when markers are drawn, not when they are
/// created, so a reference may point at nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IconRef(String);

impl IconRef {
    /// Create an icon reference from a resource name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Resource name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IconRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for IconRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A positioned icon overlay.
///
/// The marker list in [`crate::MapState`] is ordered and always replaced as a
/// whole; there is no per-marker identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Icon drawn at the coordinate
    pub icon: IconRef,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Anchor the icon's bottom edge (a pin tip) instead of its center
    pub anchor_bottom: bool,
}

impl Marker {
    /// Create a center-anchored marker.
    pub fn new(icon: impl Into<IconRef>, latitude: f64, longitude: f64) -> Self {
        Self { icon: icon.into(), latitude, longitude, anchor_bottom: false }
    }

    /// Anchor the icon at its bottom edge.
    #[must_use]
    pub fn anchored_bottom(mut self) -> Self {
        self.anchor_bottom = true;
        self
    }
}
