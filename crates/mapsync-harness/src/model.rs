//! Reference model of a bridged map.
//!
//! [`ModelMap`] is the obviously-correct version of the runtime plus the
//! simulated engine: a handful of fields and direct assignments. Model-based
//! tests run the same [`Operation`] sequence against both and compare.
//!
//! Positions are generated on an integer grid so that the model and the real
//! system compute bit-identical floats.

use mapsync_core::{CameraPosition, Marker};

use crate::sim_engine::SimEngineConfig;

/// Icon name registered in the model's icon set.
pub const KNOWN_ICON: &str = "pin";

/// Icon name that is never registered.
pub const UNKNOWN_ICON: &str = "missing";

/// Camera position on an integer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Latitude in whole degrees. May exceed the displayable range.
    pub latitude: i8,
    /// Longitude in whole degrees
    pub longitude: i16,
    /// Zoom level. May exceed the engine's maximum.
    pub zoom: u8,
}

impl GridPosition {
    /// Camera position for this grid point.
    pub fn to_position(self) -> CameraPosition {
        CameraPosition::new(
            f64::from(self.latitude),
            f64::from(self.longitude),
            f64::from(self.zoom),
        )
    }
}

/// Operation applied to both the model and the real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Attach a new session
    Attach,
    /// Detach the current session
    Detach,
    /// View requests a camera position
    SetCamera(GridPosition),
    /// View requests tracking on or off
    SetTracking(bool),
    /// View shows or hides the location component
    SetLocationEnabled(bool),
    /// View replaces the markers
    SetMarkers {
        /// Number of markers
        count: u8,
        /// How many of them (from the front) reference an unknown icon
        unknown_icons: u8,
    },
    /// Engine camera settles where it is
    Settle,
    /// User pans the live map
    UserPan(GridPosition),
}

/// Why an operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Attach while already attached
    AlreadyAttached,
    /// Engine-side operation with no live session
    NotAttached,
}

/// Outcome of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Accepted
    Ok,
    /// Rejected
    Error(OperationError),
}

impl OperationResult {
    /// Whether the operation was accepted.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Marker list used by [`Operation::SetMarkers`].
pub fn marker_list(count: u8, unknown_icons: u8) -> Vec<Marker> {
    (0..count)
        .map(|i| {
            let icon = if i < unknown_icons { UNKNOWN_ICON } else { KNOWN_ICON };
            Marker::new(icon, f64::from(i), -f64::from(i))
        })
        .collect()
}

/// Reference model.
#[derive(Debug, Clone)]
pub struct ModelMap {
    engine: SimEngineConfig,
    position: CameraPosition,
    tracking: bool,
    location_enabled: bool,
    markers: usize,
    markers_without_icon: usize,
    attached: bool,
    engine_camera: CameraPosition,
}

impl ModelMap {
    /// Unattached model at `position` with no markers.
    pub fn new(position: CameraPosition, engine: SimEngineConfig) -> Self {
        Self {
            engine,
            position,
            tracking: false,
            location_enabled: false,
            markers: 0,
            markers_without_icon: 0,
            attached: false,
            engine_camera: CameraPosition::default(),
        }
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Attach => {
                if self.attached {
                    return OperationResult::Error(OperationError::AlreadyAttached);
                }
                self.attached = true;
                self.engine_camera = self.engine.clamp(self.position);
            },
            Operation::Detach => self.attached = false,
            Operation::SetCamera(grid) => {
                self.position = grid.to_position();
                if self.attached {
                    self.engine_camera = self.engine.clamp(self.position);
                }
            },
            Operation::SetTracking(enabled) => self.tracking = enabled,
            Operation::SetLocationEnabled(enabled) => self.location_enabled = enabled,
            Operation::SetMarkers { count, unknown_icons } => {
                self.markers = usize::from(count);
                self.markers_without_icon = usize::from(unknown_icons.min(count));
            },
            Operation::Settle => {
                if !self.attached {
                    return OperationResult::Error(OperationError::NotAttached);
                }
                self.position = self.engine_camera;
            },
            Operation::UserPan(grid) => {
                if !self.attached {
                    return OperationResult::Error(OperationError::NotAttached);
                }
                self.engine_camera = self.engine.clamp(grid.to_position());
                self.tracking = false;
                self.position = self.engine_camera;
            },
        }
        OperationResult::Ok
    }

    /// Expected camera position in the state.
    pub fn position(&self) -> CameraPosition {
        self.position
    }

    /// Expected tracking flag.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Expected location component flag.
    pub fn is_location_enabled(&self) -> bool {
        self.location_enabled
    }

    /// Expected number of markers (and of drawn annotations while attached).
    pub fn marker_count(&self) -> usize {
        self.markers
    }

    /// Expected number of annotations drawn with the default glyph.
    pub fn markers_without_icon(&self) -> usize {
        self.markers_without_icon
    }

    /// Whether a session is expected to be attached.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Expected engine camera of the live session.
    pub fn engine_camera(&self) -> CameraPosition {
        self.engine_camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(latitude: i8, longitude: i16, zoom: u8) -> GridPosition {
        GridPosition { latitude, longitude, zoom }
    }

    #[test]
    fn engine_ops_need_a_session() {
        let mut model = ModelMap::new(CameraPosition::default(), SimEngineConfig::default());
        assert_eq!(
            model.apply(&Operation::Settle),
            OperationResult::Error(OperationError::NotAttached)
        );
        assert!(model.apply(&Operation::Attach).is_ok());
        assert_eq!(
            model.apply(&Operation::Attach),
            OperationResult::Error(OperationError::AlreadyAttached)
        );
    }

    #[test]
    fn settle_reports_clamped_position() {
        let mut model = ModelMap::new(CameraPosition::default(), SimEngineConfig::default());
        model.apply(&Operation::Attach);
        model.apply(&Operation::SetCamera(grid(89, 10, 40)));
        assert_eq!(model.position(), CameraPosition::new(89.0, 10.0, 40.0));

        model.apply(&Operation::Settle);
        assert_eq!(model.position(), model.engine_camera());
        assert!(model.position().latitude < 89.0);
        assert_eq!(model.position().zoom, 22.0);
    }

    #[test]
    fn pan_cancels_tracking() {
        let mut model = ModelMap::new(CameraPosition::default(), SimEngineConfig::default());
        model.apply(&Operation::SetTracking(true));
        model.apply(&Operation::Attach);
        model.apply(&Operation::UserPan(grid(1, 2, 3)));
        assert!(!model.is_tracking());
        assert_eq!(model.position(), CameraPosition::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn marker_list_puts_unknown_icons_first() {
        let markers = marker_list(3, 1);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].icon.as_str(), UNKNOWN_ICON);
        assert_eq!(markers[2].icon.as_str(), KNOWN_ICON);
    }
}
