//! Per-session configuration.
//!
//! Everything the engine session needs that does not come from
//! [`crate::MapState`]: the theme (which selects the style), the host's
//! location permission, and the fixed UI chrome and location-engine
//! parameters. Theme and permission are explicit inputs so that a theme
//! change is just a detach followed by an attach with a different config.

use std::time::Duration;

/// Visual theme of the hosting view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapTheme {
    /// Light style
    #[default]
    Light,
    /// Dark style
    Dark,
}

/// Style document URLs per theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleUrls {
    /// Style used for [`MapTheme::Light`]
    pub light: String,
    /// Style used for [`MapTheme::Dark`]
    pub dark: String,
}

impl StyleUrls {
    /// Style URL for a theme.
    pub fn for_theme(&self, theme: MapTheme) -> &str {
        match theme {
            MapTheme::Light => &self.light,
            MapTheme::Dark => &self.dark,
        }
    }
}

impl Default for StyleUrls {
    fn default() -> Self {
        Self {
            light: "asset://styles/light.json".to_string(),
            dark: "asset://styles/dark.json".to_string(),
        }
    }
}

/// Location permission granted by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationPermission {
    /// No location access
    #[default]
    Denied,
    /// Approximate location only
    Coarse,
    /// Precise location
    Fine,
}

impl LocationPermission {
    /// Whether any location access was granted.
    pub const fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Map chrome options. Fixed per session; they never reflect map state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSettings {
    /// Show the engine logo
    pub logo_enabled: bool,
    /// Show the attribution button
    pub attribution_enabled: bool,
    /// Show the compass
    pub compass_enabled: bool,
    /// Allow rotating the map with two fingers
    pub rotate_gestures_enabled: bool,
    /// Allow tilting the map
    pub tilt_gestures_enabled: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            logo_enabled: false,
            attribution_enabled: true,
            compass_enabled: false,
            rotate_gestures_enabled: false,
            tilt_gestures_enabled: false,
        }
    }
}

/// Power/accuracy trade-off for location updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPriority {
    /// GPS-level accuracy
    HighAccuracy,
    /// Block-level accuracy
    Balanced,
    /// City-level accuracy
    LowPower,
    /// Only passive updates from other apps
    NoPower,
}

/// Location engine activation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationEngineRequest {
    /// Desired update interval
    pub interval: Duration,
    /// Fastest interval the component accepts updates at
    pub fastest_interval: Duration,
    /// Accuracy priority
    pub priority: LocationPriority,
}

impl Default for LocationEngineRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(750),
            fastest_interval: Duration::from_millis(750),
            priority: LocationPriority::HighAccuracy,
        }
    }
}

/// Configuration for one engine session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionConfig {
    /// Theme of the hosting view
    pub theme: MapTheme,
    /// Style URLs to pick from
    pub styles: StyleUrls,
    /// Location permission at attach time
    pub location_permission: LocationPermission,
    /// Map chrome
    pub ui: UiSettings,
    /// Location engine parameters
    pub location_request: LocationEngineRequest,
}

impl SessionConfig {
    /// Style URL for the configured theme.
    pub fn style_url(&self) -> &str {
        self.styles.for_theme(self.theme)
    }

    /// Set the theme.
    #[must_use]
    pub fn with_theme(mut self, theme: MapTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Set the location permission.
    #[must_use]
    pub fn with_location_permission(mut self, permission: LocationPermission) -> Self {
        self.location_permission = permission;
        self
    }
}
