//! Simulated map engine.
//!
//! Behaves like a callback-driven rendering engine without rendering
//! anything. Every call is recorded in an [`EngineCall`] log, and the test
//! drives the engine side (camera settling, user gestures, device location)
//! through explicit methods.
//!
//! Two behaviors of real engines are modeled because the bridge depends on
//! them:
//!
//! - Camera moves are clamped (latitude to the Web Mercator limit, zoom to
//!   `max_zoom`), so the state only learns the real position on the next
//!   idle event.
//! - A camera-mode switch fires the mode-changed observer, and a user pan
//!   while tracking drops back to `NONE`.

use std::{collections::BTreeMap, time::Duration};

use mapsync_app::{AnnotationOptions, Callback, EventSink, IconImage, MapEngine, StyleLoadError};
use mapsync_core::{
    CameraMode, CameraPosition, Location, LocationEngineRequest, LocationPermission, SessionId,
    UiSettings,
};
use thiserror::Error;
use tracing::trace;

/// Largest latitude a Web Mercator engine displays.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// How the engine answers a single-shot callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMode {
    /// Invoke before returning from the engine call
    Immediate,
    /// Invoke from a spawned task after the delay
    Delayed(Duration),
    /// Keep the callback and never invoke it
    Never,
    /// Drop the callback without invoking it
    Drop,
}

/// Simulated engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimEngineConfig {
    /// Behavior of `get_map_async`
    pub map_callback: CallbackMode,
    /// Behavior of `set_style`
    pub style_callback: CallbackMode,
    /// Fail every style load with this reason
    pub style_failure: Option<String>,
    /// Location permission the platform actually granted
    pub location_permission: LocationPermission,
    /// Highest zoom level the engine accepts
    pub max_zoom: f64,
    /// Refuse annotations beyond this many per map
    pub max_annotations: Option<usize>,
}

impl Default for SimEngineConfig {
    fn default() -> Self {
        Self {
            map_callback: CallbackMode::Immediate,
            style_callback: CallbackMode::Immediate,
            style_failure: None,
            location_permission: LocationPermission::Fine,
            max_zoom: 22.0,
            max_annotations: None,
        }
    }
}

impl SimEngineConfig {
    /// Position the engine settles at when asked to move to `position`.
    pub fn clamp(&self, position: CameraPosition) -> CameraPosition {
        CameraPosition::new(
            position.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            position.longitude,
            position.zoom.clamp(0.0, self.max_zoom),
        )
    }
}

/// Errors raised by the simulated engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimEngineError {
    /// Location component enabled without platform permission
    #[error("location permission not granted")]
    PermissionDenied,

    /// Location component enabled before activation
    #[error("location component not activated")]
    LocationNotActivated,

    /// Call against a released map
    #[error("{0} was released")]
    Released(SessionId),

    /// Annotation beyond `max_annotations`
    #[error("annotation limit of {limit} reached")]
    AnnotationLimit {
        /// Configured limit
        limit: usize,
    },
}

/// Recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `get_map_async`
    GetMap {
        /// Session
        session: SessionId,
    },
    /// `set_style`
    SetStyle {
        /// Session
        session: SessionId,
        /// Style URL
        url: String,
    },
    /// `apply_ui_settings`
    ApplyUiSettings {
        /// Session
        session: SessionId,
    },
    /// `activate_location_component`
    ActivateLocation {
        /// Session
        session: SessionId,
        /// Requested parameters
        request: LocationEngineRequest,
    },
    /// `set_location_component_enabled`
    SetLocationEnabled {
        /// Session
        session: SessionId,
        /// Requested visibility
        enabled: bool,
    },
    /// `move_camera`
    MoveCamera {
        /// Session
        session: SessionId,
        /// Requested (unclamped) position
        position: CameraPosition,
    },
    /// `set_camera_mode`
    SetCameraMode {
        /// Session
        session: SessionId,
        /// Requested mode
        mode: CameraMode,
    },
    /// `register_observers`
    RegisterObservers {
        /// Session
        session: SessionId,
    },
    /// `create_overlay`
    CreateOverlay {
        /// Session
        session: SessionId,
    },
    /// `add_image`
    AddImage {
        /// Session
        session: SessionId,
        /// Image name
        name: String,
    },
    /// `create_annotation`
    CreateAnnotation {
        /// Session
        session: SessionId,
        /// Annotation options
        options: AnnotationOptions,
    },
    /// `delete_all_annotations`
    DeleteAllAnnotations {
        /// Session
        session: SessionId,
    },
    /// `release`
    Release {
        /// Session
        session: SessionId,
    },
}

impl EngineCall {
    /// Session the call targeted.
    pub fn session(&self) -> SessionId {
        match self {
            Self::GetMap { session }
            | Self::SetStyle { session, .. }
            | Self::ApplyUiSettings { session }
            | Self::ActivateLocation { session, .. }
            | Self::SetLocationEnabled { session, .. }
            | Self::MoveCamera { session, .. }
            | Self::SetCameraMode { session, .. }
            | Self::RegisterObservers { session }
            | Self::CreateOverlay { session }
            | Self::AddImage { session, .. }
            | Self::CreateAnnotation { session, .. }
            | Self::DeleteAllAnnotations { session }
            | Self::Release { session } => *session,
        }
    }
}

/// Map handle.
#[derive(Debug)]
pub struct SimMap {
    session: SessionId,
}

/// Style handle.
#[derive(Debug)]
pub struct SimStyle {
    session: SessionId,
}

/// Marker overlay handle.
#[derive(Debug)]
pub struct SimOverlay {
    session: SessionId,
}

/// Engine-side state of one simulated map.
#[derive(Debug, Clone)]
pub struct SimMapState {
    /// Camera (after clamping)
    pub camera: CameraPosition,
    /// Camera mode
    pub mode: CameraMode,
    /// Device location known to the location component
    pub device_location: Option<Location>,
    /// Location component activated
    pub location_active: bool,
    /// Location component shown
    pub location_enabled: bool,
    /// Applied UI settings
    pub ui: Option<UiSettings>,
    /// Style URL requested
    pub style_url: Option<String>,
    /// Registered image names, in registration order
    pub images: Vec<String>,
    /// Current annotations
    pub annotations: Vec<AnnotationOptions>,
    /// Map was released
    pub released: bool,
    sink: Option<EventSink>,
}

impl SimMapState {
    fn new() -> Self {
        Self {
            camera: CameraPosition::default(),
            mode: CameraMode::None,
            device_location: None,
            location_active: false,
            location_enabled: false,
            ui: None,
            style_url: None,
            images: Vec::new(),
            annotations: Vec::new(),
            released: false,
            sink: None,
        }
    }

    /// Whether observers are registered and the map is live.
    pub fn has_observers(&self) -> bool {
        self.sink.is_some()
    }
}

/// Simulated map engine.
#[derive(Debug, Default)]
pub struct SimEngine {
    config: SimEngineConfig,
    maps: BTreeMap<SessionId, SimMapState>,
    calls: Vec<EngineCall>,
    held_maps: Vec<Callback<SimMap>>,
    held_styles: Vec<Callback<Result<SimStyle, StyleLoadError>>>,
}

impl SimEngine {
    /// Create an engine.
    pub fn new(config: SimEngineConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Configuration.
    pub fn config(&self) -> &SimEngineConfig {
        &self.config
    }

    /// Mutable configuration. Takes effect on the next call.
    pub fn config_mut(&mut self) -> &mut SimEngineConfig {
        &mut self.config
    }

    /// Every call received so far.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Take the call log, leaving it empty.
    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    /// Engine-side state of a session's map.
    pub fn map(&self, session: SessionId) -> Option<&SimMapState> {
        self.maps.get(&session)
    }

    /// Current annotations of a session's map.
    pub fn annotations(&self, session: SessionId) -> &[AnnotationOptions] {
        self.maps.get(&session).map(|m| m.annotations.as_slice()).unwrap_or_default()
    }

    /// Callbacks held back by [`CallbackMode::Never`].
    pub fn held_callbacks(&self) -> usize {
        self.held_maps.len() + self.held_styles.len()
    }

    /// Camera motion settled: fire the idle observer.
    ///
    /// Returns `false` if the session has no live observers.
    pub fn settle_camera(&mut self, session: SessionId) -> bool {
        self.live_sink(session).is_some_and(EventSink::camera_idle)
    }

    /// User pans to `position`. Cancels tracking, then settles.
    pub fn user_pan(&mut self, session: SessionId, position: CameraPosition) -> bool {
        let clamped = self.config.clamp(position);
        let Some(map) = self.maps.get_mut(&session).filter(|m| !m.released) else {
            return false;
        };

        map.camera = clamped;
        if map.mode != CameraMode::None {
            map.mode = CameraMode::None;
            if let Some(sink) = &map.sink {
                sink.camera_mode_changed(CameraMode::None.to_raw());
            }
        }
        map.sink.as_ref().is_some_and(EventSink::camera_idle)
    }

    /// Device reports a new location. While tracking, the camera follows and
    /// settles.
    pub fn set_device_location(&mut self, session: SessionId, location: Location) -> bool {
        let Some(map) = self.maps.get_mut(&session).filter(|m| !m.released) else {
            return false;
        };

        map.device_location = Some(location);
        if map.mode == CameraMode::Tracking {
            map.camera =
                CameraPosition::new(location.latitude, location.longitude, map.camera.zoom);
            return map.sink.as_ref().is_some_and(EventSink::camera_idle);
        }
        true
    }

    /// Fire the mode-changed observer with an arbitrary raw value, without
    /// changing the engine's mode.
    pub fn report_camera_mode(&mut self, session: SessionId, raw: u32) -> bool {
        self.live_sink(session).is_some_and(|sink| sink.camera_mode_changed(raw))
    }

    fn live_sink(&self, session: SessionId) -> Option<&EventSink> {
        self.maps.get(&session).filter(|m| !m.released).and_then(|m| m.sink.as_ref())
    }

    fn record(&mut self, call: EngineCall) {
        trace!(?call, "engine call");
        self.calls.push(call);
    }

    fn map_state(&mut self, session: SessionId) -> &mut SimMapState {
        self.maps.entry(session).or_insert_with(SimMapState::new)
    }
}

/// Answer a single-shot callback according to `mode`. Hands the callback
/// back when it must be held.
fn deliver<T: Send + 'static>(
    mode: CallbackMode,
    callback: Callback<T>,
    value: T,
) -> Option<Callback<T>> {
    match mode {
        CallbackMode::Immediate => {
            callback.invoke(value);
            None
        },
        CallbackMode::Delayed(delay) => {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callback.invoke(value);
            });
            None
        },
        CallbackMode::Never => Some(callback),
        CallbackMode::Drop => None,
    }
}

impl MapEngine for SimEngine {
    type Map = SimMap;
    type Style = SimStyle;
    type Overlay = SimOverlay;
    type Error = SimEngineError;

    fn get_map_async(&mut self, session: SessionId, callback: Callback<SimMap>) {
        self.record(EngineCall::GetMap { session });
        self.map_state(session);

        if let Some(held) = deliver(self.config.map_callback, callback, SimMap { session }) {
            self.held_maps.push(held);
        }
    }

    fn set_style(
        &mut self,
        map: &mut SimMap,
        url: &str,
        callback: Callback<Result<SimStyle, StyleLoadError>>,
    ) {
        let session = map.session;
        self.record(EngineCall::SetStyle { session, url: url.to_string() });
        self.map_state(session).style_url = Some(url.to_string());

        let result = match &self.config.style_failure {
            Some(reason) => Err(StyleLoadError::new(reason.clone())),
            None => Ok(SimStyle { session }),
        };
        if let Some(held) = deliver(self.config.style_callback, callback, result) {
            self.held_styles.push(held);
        }
    }

    fn apply_ui_settings(&mut self, map: &mut SimMap, settings: &UiSettings) {
        self.record(EngineCall::ApplyUiSettings { session: map.session });
        self.map_state(map.session).ui = Some(*settings);
    }

    fn activate_location_component(
        &mut self,
        map: &mut SimMap,
        _style: &SimStyle,
        request: &LocationEngineRequest,
    ) -> Result<(), SimEngineError> {
        self.record(EngineCall::ActivateLocation { session: map.session, request: *request });
        self.map_state(map.session).location_active = true;
        Ok(())
    }

    fn set_location_component_enabled(
        &mut self,
        map: &mut SimMap,
        enabled: bool,
    ) -> Result<(), SimEngineError> {
        self.record(EngineCall::SetLocationEnabled { session: map.session, enabled });
        if enabled && !self.config.location_permission.is_granted() {
            return Err(SimEngineError::PermissionDenied);
        }

        let state = self.map_state(map.session);
        if !state.location_active {
            return Err(SimEngineError::LocationNotActivated);
        }
        state.location_enabled = enabled;
        Ok(())
    }

    fn move_camera(&mut self, map: &mut SimMap, position: CameraPosition) {
        self.record(EngineCall::MoveCamera { session: map.session, position });
        let clamped = self.config.clamp(position);
        self.map_state(map.session).camera = clamped;
    }

    fn camera_position(&self, map: &SimMap) -> CameraPosition {
        self.maps.get(&map.session).map(|m| m.camera).unwrap_or_default()
    }

    fn last_known_location(&self, map: &SimMap) -> Option<Location> {
        self.maps.get(&map.session).filter(|m| m.location_active).and_then(|m| m.device_location)
    }

    fn set_camera_mode(&mut self, map: &mut SimMap, mode: CameraMode) {
        self.record(EngineCall::SetCameraMode { session: map.session, mode });
        let state = self.map_state(map.session);
        if state.mode == mode {
            return;
        }

        state.mode = mode;
        let mut follows = false;
        if mode == CameraMode::Tracking
            && let Some(location) = state.device_location
        {
            state.camera =
                CameraPosition::new(location.latitude, location.longitude, state.camera.zoom);
            follows = true;
        }

        if let Some(sink) = &state.sink {
            sink.camera_mode_changed(mode.to_raw());
            if follows {
                sink.camera_idle();
            }
        }
    }

    fn register_observers(&mut self, map: &mut SimMap, sink: EventSink) {
        self.record(EngineCall::RegisterObservers { session: map.session });
        self.map_state(map.session).sink = Some(sink);
    }

    fn create_overlay(&mut self, map: &mut SimMap, _style: &mut SimStyle) -> SimOverlay {
        self.record(EngineCall::CreateOverlay { session: map.session });
        SimOverlay { session: map.session }
    }

    fn add_image(&mut self, style: &mut SimStyle, name: &str, _image: &IconImage) {
        self.record(EngineCall::AddImage { session: style.session, name: name.to_string() });
        let images = &mut self.map_state(style.session).images;
        if !images.iter().any(|existing| existing == name) {
            images.push(name.to_string());
        }
    }

    fn create_annotation(
        &mut self,
        overlay: &mut SimOverlay,
        options: AnnotationOptions,
    ) -> Result<(), SimEngineError> {
        let session = overlay.session;
        self.record(EngineCall::CreateAnnotation { session, options: options.clone() });

        let limit = self.config.max_annotations;
        let state = self.map_state(session);
        if state.released {
            return Err(SimEngineError::Released(session));
        }
        if let Some(limit) = limit.filter(|&limit| state.annotations.len() >= limit) {
            return Err(SimEngineError::AnnotationLimit { limit });
        }
        state.annotations.push(options);
        Ok(())
    }

    fn delete_all_annotations(&mut self, overlay: &mut SimOverlay) {
        self.record(EngineCall::DeleteAllAnnotations { session: overlay.session });
        self.map_state(overlay.session).annotations.clear();
    }

    fn release(&mut self, map: SimMap, _style: Option<SimStyle>, _overlay: Option<SimOverlay>) {
        self.record(EngineCall::Release { session: map.session });
        let state = self.map_state(map.session);
        state.released = true;
        state.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_latitude_and_zoom() {
        let config = SimEngineConfig::default();
        let clamped = config.clamp(CameraPosition::new(89.0, 10.0, 30.0));
        assert_eq!(clamped, CameraPosition::new(MAX_LATITUDE, 10.0, 22.0));

        let untouched = CameraPosition::new(49.843, 9.902, 2.7);
        assert_eq!(config.clamp(untouched), untouched);
    }

    #[test]
    fn engine_call_session() {
        let session = SessionId::new(3);
        assert_eq!(EngineCall::Release { session }.session(), session);
    }
}
