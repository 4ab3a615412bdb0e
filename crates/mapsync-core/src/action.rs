//! Bridge actions
//!
//! Actions produced by the [`crate::MapBridge`] state machine for the
//! runtime to execute. Engine calls are fire-and-forget: none of them waits
//! for an acknowledgement. The engine's observers reconcile the state later.

use crate::{
    camera_mode::CameraMode,
    config::{LocationEngineRequest, UiSettings},
    geo::CameraPosition,
    marker::Marker,
    state::{MapStateChange, SessionId},
};

/// Actions produced by the bridge state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// Apply map chrome options.
    ApplyUiSettings {
        /// Target session
        session: SessionId,
        /// Options to apply
        settings: UiSettings,
    },

    /// Activate the location component with the given engine parameters.
    ActivateLocationComponent {
        /// Target session
        session: SessionId,
        /// Polling parameters
        request: LocationEngineRequest,
    },

    /// Move the camera without waiting for it to settle.
    MoveCamera {
        /// Target session
        session: SessionId,
        /// Requested position
        position: CameraPosition,
    },

    /// Switch the camera mode.
    SetCameraMode {
        /// Target session
        session: SessionId,
        /// Requested mode
        mode: CameraMode,
    },

    /// Register the camera-idle and camera-mode-changed observers.
    RegisterObservers {
        /// Target session
        session: SessionId,
    },

    /// Show or hide the location component.
    SetLocationComponentEnabled {
        /// Target session
        session: SessionId,
        /// Requested visibility
        enabled: bool,
    },

    /// Clear all annotations and redraw the full marker list.
    SyncMarkers {
        /// Target session
        session: SessionId,
        /// Complete marker list, in draw order
        markers: Vec<Marker>,
    },

    /// Release the engine session and every handle belonging to it.
    ReleaseSession {
        /// Session to release
        session: SessionId,
    },

    /// Notify subscribers of a state change.
    Notify(MapStateChange),
}

impl BridgeAction {
    /// Session an engine action targets. `None` for notifications.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::ApplyUiSettings { session, .. }
            | Self::ActivateLocationComponent { session, .. }
            | Self::MoveCamera { session, .. }
            | Self::SetCameraMode { session, .. }
            | Self::RegisterObservers { session }
            | Self::SetLocationComponentEnabled { session, .. }
            | Self::SyncMarkers { session, .. }
            | Self::ReleaseSession { session } => Some(*session),
            Self::Notify(_) => None,
        }
    }
}
