//! Map state record and session phase.
//!
//! [`MapState`] is the view-facing record. It outlives individual engine
//! sessions: it is created by the owning view, carried across any number of
//! attach/detach cycles, and dropped with the view. Fields are read-only
//! from outside the crate; writes go through [`crate::MapBridge`] so every
//! change produces a [`MapStateChange`] notification.

use std::fmt;

use crate::{
    geo::{CameraPosition, Location},
    marker::Marker,
};

/// Identifier of one attach attempt.
///
/// Allocated by [`crate::MapBridge::begin_attach`] and never reused, so
/// callbacks from a released session can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Suspension point inside an attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStage {
    /// Waiting for the engine map handle
    AwaitingMap,
    /// Waiting for the style to load
    AwaitingStyle,
}

impl fmt::Display for AttachStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingMap => f.write_str("awaiting map"),
            Self::AwaitingStyle => f.write_str("awaiting style"),
        }
    }
}

/// Lifecycle phase of the engine session bound to a [`MapState`].
///
/// ```text
/// ┌────────────┐ begin_attach ┌───────────┐ style loaded ┌──────────┐
/// │ Unattached │─────────────>│ Attaching │─────────────>│ Attached │
/// └────────────┘              └───────────┘              └──────────┘
///       ^  ^   failure/detach       │                         │
///       │  └────────────────────────┘                         │
///       └──────────────────────── detach ─────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No engine session
    Unattached,
    /// Engine session being created
    Attaching {
        /// Attach attempt
        session: SessionId,
        /// Which callback is outstanding
        stage: AttachStage,
    },
    /// Engine session live and configured
    Attached {
        /// Live session
        session: SessionId,
    },
}

impl SessionPhase {
    /// Session of the current phase, if any.
    pub const fn session(self) -> Option<SessionId> {
        match self {
            Self::Unattached => None,
            Self::Attaching { session, .. } | Self::Attached { session } => Some(session),
        }
    }

    /// Whether a session is attached and configured.
    pub const fn is_attached(self) -> bool {
        matches!(self, Self::Attached { .. })
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unattached => f.write_str("unattached"),
            Self::Attaching { session, stage } => write!(f, "attaching {session} ({stage})"),
            Self::Attached { session } => write!(f, "attached to {session}"),
        }
    }
}

/// View-facing map state.
///
/// The live engine handle is not part of this record; it is owned by the
/// runtime next to it and only exists while a session is attached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapState {
    position: CameraPosition,
    location: Option<Location>,
    markers: Vec<Marker>,
    location_enabled: bool,
    tracking_location: bool,
}

impl MapState {
    /// Create a state centered on `position` with no markers and location off.
    pub fn new(position: CameraPosition) -> Self {
        Self { position, ..Self::default() }
    }

    /// Set the initial markers.
    #[must_use]
    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    /// Set the initial location-enabled flag.
    #[must_use]
    pub fn with_location_enabled(mut self, enabled: bool) -> Self {
        self.location_enabled = enabled;
        self
    }

    /// Set the initial tracking flag.
    #[must_use]
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking_location = tracking;
        self
    }

    /// Camera position (desired while detached, engine-reported while attached).
    pub fn position(&self) -> CameraPosition {
        self.position
    }

    /// Last known device location.
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Markers, in draw order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Whether the location component should be shown.
    pub fn is_location_enabled(&self) -> bool {
        self.location_enabled
    }

    /// Whether the camera follows the device.
    pub fn is_tracking_location(&self) -> bool {
        self.tracking_location
    }

    pub(crate) fn replace_position(&mut self, position: CameraPosition) -> bool {
        let changed = self.position != position;
        self.position = position;
        changed
    }

    pub(crate) fn replace_location(&mut self, location: Location) -> bool {
        let changed = self.location != Some(location);
        self.location = Some(location);
        changed
    }

    pub(crate) fn replace_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    pub(crate) fn replace_location_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.location_enabled != enabled;
        self.location_enabled = enabled;
        changed
    }

    pub(crate) fn replace_tracking(&mut self, tracking: bool) -> bool {
        let changed = self.tracking_location != tracking;
        self.tracking_location = tracking;
        changed
    }
}

/// Discrete change to a [`MapState`] or its session phase.
#[derive(Debug, Clone, PartialEq)]
pub enum MapStateChange {
    /// Camera position replaced
    Position(CameraPosition),
    /// Device location replaced
    Location(Location),
    /// Marker list replaced
    Markers(Vec<Marker>),
    /// Location component flag changed
    LocationEnabled(bool),
    /// Tracking flag changed
    TrackingLocation(bool),
    /// Session phase changed
    Phase(SessionPhase),
}
