//! Application layer for mapsync
//!
//! Executes the [`mapsync_core::MapBridge`] state machine against a real map
//! engine. The engine stays behind a trait so the same runtime drives the
//! platform SDK in production and the simulated engine in tests.
//!
//! # Components
//!
//! - [`MapEngine`]: Trait for the callback-driven rendering engine
//! - [`MapRuntime`]: Orchestration: attach sequence, action execution,
//!   observer event delivery, change subscription
//! - [`sync_markers`]: Full-replace marker drawing
//! - [`IconResolver`]: Icon lookup for markers

mod config;
mod engine;
mod error;
mod icons;
mod markers;
mod runtime;

pub use config::RuntimeConfig;
pub use engine::{
    AnnotationOptions, Callback, EngineEvent, EventSink, IconAnchor, IconImage, MapEngine,
    StyleLoadError,
};
pub use error::RuntimeError;
pub use icons::{IconRegistry, IconResolver};
pub use markers::{MarkerSyncReport, PartialMarkerSync, sync_markers};
pub use runtime::{MapRuntime, RuntimeResult};
