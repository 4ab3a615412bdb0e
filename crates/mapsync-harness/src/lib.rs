//! Deterministic simulation harness for mapsync testing.
//!
//! A simulated [`mapsync_app::MapEngine`] with configurable callback timing
//! and failures, a reference model for model-based tests, and a scenario
//! runner with mandatory oracles.

pub mod model;
pub mod scenario;
pub mod sim_engine;

pub use model::{GridPosition, ModelMap, Operation, OperationError, OperationResult};
pub use sim_engine::{
    CallbackMode, EngineCall, SimEngine, SimEngineConfig, SimEngineError, SimMap, SimMapState,
    SimOverlay, SimStyle,
};
