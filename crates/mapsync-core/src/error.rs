//! Error types for the bridge state machine and saved state.

use thiserror::Error;

use crate::state::{SessionId, SessionPhase};

/// Errors produced by the [`crate::MapBridge`] state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Operation is not valid in the current phase
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        /// Phase the bridge was in
        phase: SessionPhase,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Attach callback belongs to a different attach attempt
    #[error("callback for {got} does not match current phase ({phase})")]
    SessionMismatch {
        /// Phase the bridge was in
        phase: SessionPhase,
        /// Session the callback was issued for
        got: SessionId,
    },

    /// Engine reported a camera mode the bridge never requests
    #[error("engine reported camera mode {raw}, expected NONE (8) or TRACKING (24)")]
    UnexpectedCameraMode {
        /// Raw mode value from the engine
        raw: u32,
    },
}

/// Errors encoding or decoding a [`crate::MapStateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// CBOR serialization failed
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed
    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    /// Snapshot written by an incompatible version
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the snapshot
        found: u8,
        /// Version this build writes
        expected: u8,
    },

    /// Camera position outside the valid range
    #[error("invalid camera position in snapshot: {reason}")]
    InvalidPosition {
        /// What was wrong with it
        reason: &'static str,
    },
}
