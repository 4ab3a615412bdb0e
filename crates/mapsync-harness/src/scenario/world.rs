//! World state for scenario execution.
//!
//! The World owns the runtime under test (and through it the simulated
//! engine), records every change notification and every failed step, and
//! gives oracles read access to all of it.

use mapsync_app::{AnnotationOptions, IconRegistry, MapRuntime};
use mapsync_core::{MapState, MapStateChange, SessionId, SessionPhase};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use crate::sim_engine::SimEngine;

/// Runtime over the simulated engine.
pub type SimRuntime = MapRuntime<SimEngine, IconRegistry>;

/// A step that returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    /// Index of the step in the scenario
    pub step: usize,
    /// Rendered error
    pub message: String,
}

/// World state: runtime, engine and recorded history.
pub struct World {
    runtime: SimRuntime,
    changes: broadcast::Receiver<MapStateChange>,
    change_log: Vec<MapStateChange>,
    sessions: Vec<SessionId>,
    errors: Vec<StepError>,
}

impl World {
    /// Wrap a runtime, subscribing to its changes.
    pub fn new(runtime: SimRuntime) -> Self {
        let changes = runtime.subscribe();
        Self { runtime, changes, change_log: Vec::new(), sessions: Vec::new(), errors: Vec::new() }
    }

    /// Runtime under test.
    pub fn runtime(&self) -> &SimRuntime {
        &self.runtime
    }

    /// Mutable runtime.
    pub fn runtime_mut(&mut self) -> &mut SimRuntime {
        &mut self.runtime
    }

    /// Simulated engine.
    pub fn engine(&self) -> &SimEngine {
        self.runtime.engine()
    }

    /// Current map state.
    pub fn state(&self) -> &MapState {
        self.runtime.state()
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.runtime.phase()
    }

    /// Every change notification observed, in order.
    pub fn changes(&self) -> &[MapStateChange] {
        &self.change_log
    }

    /// Sessions that attached successfully, in order.
    pub fn sessions(&self) -> &[SessionId] {
        &self.sessions
    }

    /// Most recently attached session.
    pub fn last_session(&self) -> Option<SessionId> {
        self.sessions.last().copied()
    }

    /// Annotations currently drawn by the most recent session.
    pub fn annotations(&self) -> &[AnnotationOptions] {
        self.last_session().map(|session| self.engine().annotations(session)).unwrap_or_default()
    }

    /// Steps that failed.
    pub fn errors(&self) -> &[StepError] {
        &self.errors
    }

    /// Record a successfully attached session.
    pub fn record_session(&mut self, session: SessionId) {
        self.sessions.push(session);
    }

    /// Record a failed step.
    pub fn record_error(&mut self, step: usize, message: String) {
        self.errors.push(StepError { step, message });
    }

    /// Move pending change notifications into the log.
    pub fn drain_changes(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(change) => self.change_log.push(change),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "scenario change log lagged");
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
