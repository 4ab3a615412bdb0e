//! Map presentation bridge core logic
//!
//! Pure state machine logic that keeps an observable map state consistent
//! with an external, callback-driven map rendering engine. Nothing in this
//! crate performs I/O, awaits, or talks to the engine directly.
//!
//! # Architecture
//!
//! The bridge is a deterministic state machine. Writes from the owning view
//! and callbacks from the engine are fed in as method calls; the bridge
//! updates its [`MapState`] and returns declarative [`BridgeAction`]s that
//! describe the engine calls and change notifications to perform. A runtime
//! (or a test) is responsible for executing them.
//!
//! Keeping the engine out of this crate means the attach/detach lifecycle,
//! write buffering while detached, and last-write-wins reconciliation are
//! testable without any engine at all.
//!
//! # Components
//!
//! - [`bridge`]: Session lifecycle state machine (attach, configure, detach)
//! - [`state`]: Map state record, session phase, change notifications
//! - [`geo`]: Camera and location value types
//! - [`marker`]: Marker overlays and icon references
//! - [`camera_mode`]: Engine camera modes and the tracking-flag mapping
//! - [`config`]: Per-session configuration (theme, permission, UI chrome)
//! - [`snapshot`]: Saved-instance encoding of the map state
//! - [`error`]: Bridge and snapshot error types

pub mod action;
pub mod bridge;
pub mod camera_mode;
pub mod config;
pub mod error;
pub mod geo;
pub mod marker;
pub mod snapshot;
pub mod state;

pub use action::BridgeAction;
pub use bridge::MapBridge;
pub use camera_mode::CameraMode;
pub use config::{
    LocationEngineRequest, LocationPermission, LocationPriority, MapTheme, SessionConfig,
    StyleUrls, UiSettings,
};
pub use error::{BridgeError, SnapshotError};
pub use geo::{CameraPosition, Location};
pub use marker::{IconRef, Marker};
pub use snapshot::MapStateSnapshot;
pub use state::{AttachStage, MapState, MapStateChange, SessionId, SessionPhase};
