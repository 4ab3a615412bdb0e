//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use mapsync_app::{IconRegistry, MapRuntime, RuntimeConfig};
use mapsync_core::{CameraPosition, Location, MapState, Marker, SessionConfig, SessionId};
use tracing::debug;

use crate::{
    scenario::{OracleFn, World},
    sim_engine::{SimEngine, SimEngineConfig},
};

/// One scenario step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Attach a new session with this configuration
    Attach(SessionConfig),
    /// Detach the current session
    Detach,
    /// View requests a camera position
    SetCamera(CameraPosition),
    /// View requests tracking on or off
    SetTracking(bool),
    /// View shows or hides the location component
    SetLocationEnabled(bool),
    /// View replaces the markers
    SetMarkers(Vec<Marker>),
    /// Engine camera settles on the latest session
    SettleCamera,
    /// User pans the latest session's map
    UserPan(CameraPosition),
    /// Device reports a location to the latest session
    DeviceLocation(Location),
    /// Latest session's engine reports a raw camera mode
    ReportCameraMode(u32),
}

/// Scenario builder.
///
/// Configure the starting point, add steps, then call `.oracle()` to get a
/// [`RunnableScenario`].
pub struct Scenario {
    name: String,
    state: MapState,
    engine: SimEngineConfig,
    runtime: RuntimeConfig,
    icons: IconRegistry,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario with the given name.
    ///
    /// Starts from a default state, engine and icon set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: MapState::default(),
            engine: SimEngineConfig::default(),
            runtime: RuntimeConfig::default(),
            icons: IconRegistry::new(),
            steps: Vec::new(),
        }
    }

    /// Initial map state.
    pub fn state(mut self, state: MapState) -> Self {
        self.state = state;
        self
    }

    /// Simulated engine configuration.
    pub fn engine(mut self, config: SimEngineConfig) -> Self {
        self.engine = config;
        self
    }

    /// Runtime configuration.
    pub fn runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime = config;
        self
    }

    /// Icons available to markers.
    pub fn icons(mut self, icons: IconRegistry) -> Self {
        self.icons = icons;
        self
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps.
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario on a fresh single-threaded runtime.
    ///
    /// Steps that fail are recorded in the world rather than aborting the
    /// run; the oracle decides whether a failure was expected. Only misuse
    /// of the scenario itself (an engine step before any attach) is an
    /// error here.
    pub fn run(self) -> Result<(), String> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("Scenario '{}': runtime: {e}", self.scenario.name))?;

        let world = rt.block_on(Self::execute(self.scenario))?;
        (self.oracle)(&world)?;

        Ok(())
    }

    /// Execute the scenario on the caller's runtime.
    ///
    /// Use from `#[tokio::test]`, e.g. with paused time.
    pub async fn run_async(self) -> Result<(), String> {
        let world = Self::execute(self.scenario).await?;
        (self.oracle)(&world)?;

        Ok(())
    }

    async fn execute(scenario: Scenario) -> Result<World, String> {
        let Scenario { name, state, engine, runtime, icons, steps } = scenario;
        let mut world = World::new(MapRuntime::new(SimEngine::new(engine), icons, state, runtime));

        for (index, step) in steps.into_iter().enumerate() {
            debug!(scenario = %name, index, ?step, "step");
            if let Err(message) = apply(&mut world, step).await? {
                world.record_error(index, message);
            }
            if let Err(err) = world.runtime_mut().pump_events() {
                world.record_error(index, err.to_string());
            }
            world.drain_changes();
        }

        Ok(world)
    }
}

/// Apply one step. The outer error is scenario misuse, the inner one a
/// failure of the system under test.
async fn apply(world: &mut World, step: Step) -> Result<Result<(), String>, String> {
    let outcome = match step {
        Step::Attach(config) => match world.runtime_mut().attach(config).await {
            Ok(session) => {
                world.record_session(session);
                Ok(())
            },
            Err(err) => Err(err.to_string()),
        },
        Step::Detach => world.runtime_mut().detach().map_err(|e| e.to_string()),
        Step::SetCamera(position) => {
            world.runtime_mut().set_camera_position(position).map_err(|e| e.to_string())
        },
        Step::SetTracking(enabled) => {
            world.runtime_mut().set_tracking_enabled(enabled).map_err(|e| e.to_string())
        },
        Step::SetLocationEnabled(enabled) => {
            world.runtime_mut().set_location_enabled(enabled).map_err(|e| e.to_string())
        },
        Step::SetMarkers(markers) => {
            world.runtime_mut().set_markers(markers).map_err(|e| e.to_string())
        },
        Step::SettleCamera => {
            let session = latest(world)?;
            world.runtime_mut().engine_mut().settle_camera(session);
            Ok(())
        },
        Step::UserPan(position) => {
            let session = latest(world)?;
            world.runtime_mut().engine_mut().user_pan(session, position);
            Ok(())
        },
        Step::DeviceLocation(location) => {
            let session = latest(world)?;
            world.runtime_mut().engine_mut().set_device_location(session, location);
            Ok(())
        },
        Step::ReportCameraMode(raw) => {
            let session = latest(world)?;
            world.runtime_mut().engine_mut().report_camera_mode(session, raw);
            Ok(())
        },
    };
    Ok(outcome)
}

fn latest(world: &World) -> Result<SessionId, String> {
    world.last_session().ok_or_else(|| "engine step before any session attached".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        // Compiles only because an oracle is provided
        let _scenario = Scenario::new("test").step(Step::Detach).oracle(Box::new(|_world| Ok(())));
    }

    #[test]
    fn engine_step_without_session_is_misuse() {
        let result = Scenario::new("misuse")
            .step(Step::SettleCamera)
            .oracle(Box::new(|_world| Ok(())))
            .run();

        assert!(result.is_err());
    }

    #[test]
    fn failed_steps_are_recorded() {
        let result = Scenario::new("double attach")
            .step(Step::Attach(SessionConfig::default()))
            .step(Step::Attach(SessionConfig::default()))
            .oracle(Box::new(|world| {
                assert_eq!(world.sessions().len(), 1);
                assert_eq!(world.errors().len(), 1);
                assert_eq!(world.errors()[0].step, 1);
                Ok(())
            }))
            .run();

        assert!(result.is_ok(), "scenario should succeed: {result:?}");
    }
}
