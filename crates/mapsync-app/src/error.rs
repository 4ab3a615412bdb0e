//! Runtime error types.

use std::time::Duration;

use mapsync_core::{AttachStage, BridgeError, SessionId};
use thiserror::Error;

use crate::engine::StyleLoadError;

/// Errors surfaced by [`crate::MapRuntime`].
///
/// None of these are retried. Whether to attach again is the caller's call.
#[derive(Debug, Error)]
pub enum RuntimeError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Bridge state machine rejected the operation or the engine broke its
    /// contract
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Engine call failed
    #[error("engine call failed: {0}")]
    Engine(#[source] E),

    /// Style could not be loaded; the attach was aborted
    #[error(transparent)]
    StyleLoad(StyleLoadError),

    /// Engine callback did not arrive in time; the attach was aborted
    #[error("attach timed out after {after:?} while {stage}")]
    AttachTimeout {
        /// Outstanding callback
        stage: AttachStage,
        /// Configured limit
        after: Duration,
    },

    /// Engine dropped a callback without invoking it; the attach was aborted
    #[error("engine dropped the callback while {stage}")]
    CallbackDropped {
        /// Outstanding callback
        stage: AttachStage,
    },

    /// Engine handle needed for an action is not held
    #[error("no engine handle for {session} during {operation}")]
    NoSession {
        /// Session the action targeted
        session: SessionId,
        /// Operation that needed the handle
        operation: &'static str,
    },
}
