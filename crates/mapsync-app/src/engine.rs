//! Engine contract.
//!
//! The [`MapEngine`] trait decouples the runtime from a specific map
//! rendering SDK. Each platform implements it over its native engine, the
//! harness implements it over a simulated one, and the generic
//! [`crate::MapRuntime`] does all orchestration.
//!
//! The engine's asynchronous API is callback based. Two kinds of callbacks
//! exist:
//!
//! - Single-shot completions (map handle ready, style loaded) are delivered
//!   through a [`Callback`], which is consumed on first use. The runtime turns
//!   them into futures.
//! - Repeating observers (camera idle, camera mode changed) are delivered
//!   through an [`EventSink`], which queues them for the runtime's owning
//!   context.

use bytes::Bytes;
use mapsync_core::{
    CameraMode, CameraPosition, Location, LocationEngineRequest, SessionId, UiSettings,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Abstracts the map rendering engine.
///
/// Handles are opaque to the runtime: it stores them between calls and hands
/// them back, nothing more. All methods are called from the runtime's owning
/// context.
pub trait MapEngine {
    /// Live map instance bound to a view.
    type Map;

    /// Loaded style of a map.
    type Style;

    /// Marker overlay (annotation manager) of a map.
    type Overlay;

    /// Engine error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Request the map instance. The engine invokes `callback` once the map
    /// is ready.
    fn get_map_async(&mut self, session: SessionId, callback: Callback<Self::Map>);

    /// Load a style document. The engine invokes `callback` with the style
    /// or with the load failure.
    fn set_style(
        &mut self,
        map: &mut Self::Map,
        url: &str,
        callback: Callback<Result<Self::Style, StyleLoadError>>,
    );

    /// Apply map chrome options.
    fn apply_ui_settings(&mut self, map: &mut Self::Map, settings: &UiSettings);

    /// Activate the location component.
    ///
    /// # Errors
    ///
    /// Engine-specific activation failure.
    fn activate_location_component(
        &mut self,
        map: &mut Self::Map,
        style: &Self::Style,
        request: &LocationEngineRequest,
    ) -> Result<(), Self::Error>;

    /// Show or hide the location component.
    ///
    /// # Errors
    ///
    /// The engine (or platform) rejects enabling without location permission.
    fn set_location_component_enabled(
        &mut self,
        map: &mut Self::Map,
        enabled: bool,
    ) -> Result<(), Self::Error>;

    /// Move the camera. The engine may clamp the position.
    fn move_camera(&mut self, map: &mut Self::Map, position: CameraPosition);

    /// Current camera target and zoom.
    fn camera_position(&self, map: &Self::Map) -> CameraPosition;

    /// Last location reported by the location component.
    fn last_known_location(&self, map: &Self::Map) -> Option<Location>;

    /// Switch the camera mode.
    fn set_camera_mode(&mut self, map: &mut Self::Map, mode: CameraMode);

    /// Register the camera-idle and camera-mode-changed observers.
    fn register_observers(&mut self, map: &mut Self::Map, sink: EventSink);

    /// Create the marker overlay for a map and its loaded style.
    fn create_overlay(&mut self, map: &mut Self::Map, style: &mut Self::Style) -> Self::Overlay;

    /// Register an icon image with the style under `name`.
    fn add_image(&mut self, style: &mut Self::Style, name: &str, image: &IconImage);

    /// Create a point annotation.
    ///
    /// # Errors
    ///
    /// Engine-specific annotation failure.
    fn create_annotation(
        &mut self,
        overlay: &mut Self::Overlay,
        options: AnnotationOptions,
    ) -> Result<(), Self::Error>;

    /// Remove every annotation from the overlay.
    fn delete_all_annotations(&mut self, overlay: &mut Self::Overlay);

    /// Release a map and whatever was created on it.
    fn release(
        &mut self,
        map: Self::Map,
        style: Option<Self::Style>,
        overlay: Option<Self::Overlay>,
    );
}

/// Style document failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("style failed to load: {reason}")]
pub struct StyleLoadError {
    /// Engine-provided reason
    pub reason: String,
}

impl StyleLoadError {
    /// Create a style load error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Single-shot completion handed to the engine.
///
/// Invoking consumes the callback, so a second invocation is impossible.
/// If the attach that created it was abandoned, the value is discarded.
#[derive(Debug)]
pub struct Callback<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Callback<T> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the result. Returns `false` if nobody is waiting anymore.
    pub fn invoke(self, value: T) -> bool {
        let delivered = self.tx.send(value).is_ok();
        if !delivered {
            tracing::debug!("callback invoked after its attach was abandoned");
        }
        delivered
    }
}

/// Repeating engine observer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Camera settled after a move.
    CameraIdle,

    /// Camera mode changed.
    CameraModeChanged {
        /// Raw engine mode value
        raw: u32,
    },
}

#[derive(Debug)]
pub(crate) struct SessionEvent {
    pub(crate) session: SessionId,
    pub(crate) event: EngineEvent,
}

/// Where an engine session delivers its observer events.
///
/// Events are tagged with the session the sink was registered for, so events
/// still arriving after that session was released are recognised and
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    /// Camera settled. Returns `false` if the runtime is gone.
    pub fn camera_idle(&self) -> bool {
        self.emit(EngineEvent::CameraIdle)
    }

    /// Camera mode changed to `raw`. Returns `false` if the runtime is gone.
    pub fn camera_mode_changed(&self, raw: u32) -> bool {
        self.emit(EngineEvent::CameraModeChanged { raw })
    }

    fn emit(&self, event: EngineEvent) -> bool {
        self.tx.send(SessionEvent { session: self.session, event }).is_ok()
    }
}

/// Decoded icon image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixels, row-major
    pub pixels: Bytes,
}

impl IconImage {
    /// Create an image from RGBA8 pixels.
    pub fn rgba(width: u32, height: u32, pixels: impl Into<Bytes>) -> Self {
        Self { width, height, pixels: pixels.into() }
    }
}

/// Where an annotation's icon is anchored to its coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconAnchor {
    /// Icon centered on the coordinate
    Center,
    /// Bottom edge of the icon on the coordinate
    Bottom,
}

/// Point annotation to create.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationOptions {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Registered image name. `None` draws the engine's default glyph.
    pub icon: Option<String>,
    /// Icon anchor
    pub anchor: IconAnchor,
}
