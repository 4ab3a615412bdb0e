//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the
//! runtime, driving the simulated engine, behaves identically to the
//! reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!       ModelMap       RealMap        Compare
//!      (reference)   (MapRuntime)   state + engine
//! ```

use mapsync_app::{IconImage, IconRegistry, MapRuntime, RuntimeConfig};
use mapsync_core::{CameraPosition, LocationPermission, MapState, SessionConfig, SessionId};
use mapsync_harness::{
    GridPosition, ModelMap, Operation, OperationError, OperationResult, SimEngine,
    SimEngineConfig,
    model::{KNOWN_ICON, marker_list},
};
use proptest::prelude::*;

/// Real system wrapper that mirrors ModelMap's interface.
struct RealMap {
    runtime: MapRuntime<SimEngine, IconRegistry>,
    rt: tokio::runtime::Runtime,
    session: Option<SessionId>,
}

impl RealMap {
    fn new(position: CameraPosition) -> Self {
        let icons = IconRegistry::new().with(KNOWN_ICON, IconImage::rgba(1, 1, vec![0, 0, 0, 255]));
        let runtime = MapRuntime::new(
            SimEngine::new(SimEngineConfig::default()),
            icons,
            MapState::new(position),
            RuntimeConfig::default(),
        );
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        Self { runtime, rt, session: None }
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match *op {
            Operation::Attach => self.apply_attach(),
            Operation::Detach => {
                self.runtime.detach().unwrap();
                self.session = None;
                OperationResult::Ok
            },
            Operation::SetCamera(grid) => {
                self.runtime.set_camera_position(grid.to_position()).unwrap();
                OperationResult::Ok
            },
            Operation::SetTracking(enabled) => {
                self.runtime.set_tracking_enabled(enabled).unwrap();
                OperationResult::Ok
            },
            Operation::SetLocationEnabled(enabled) => {
                self.runtime.set_location_enabled(enabled).unwrap();
                OperationResult::Ok
            },
            Operation::SetMarkers { count, unknown_icons } => {
                self.runtime.set_markers(marker_list(count, unknown_icons)).unwrap();
                OperationResult::Ok
            },
            Operation::Settle => match self.session {
                Some(session) => {
                    self.runtime.engine_mut().settle_camera(session);
                    OperationResult::Ok
                },
                None => OperationResult::Error(OperationError::NotAttached),
            },
            Operation::UserPan(grid) => match self.session {
                Some(session) => {
                    self.runtime.engine_mut().user_pan(session, grid.to_position());
                    OperationResult::Ok
                },
                None => OperationResult::Error(OperationError::NotAttached),
            },
        };

        self.runtime.pump_events().unwrap();
        result
    }

    fn apply_attach(&mut self) -> OperationResult {
        let config = SessionConfig::default().with_location_permission(LocationPermission::Fine);
        match self.rt.block_on(self.runtime.attach(config)) {
            Ok(session) => {
                self.session = Some(session);
                OperationResult::Ok
            },
            Err(_) => OperationResult::Error(OperationError::AlreadyAttached),
        }
    }
}

fn grid_strategy() -> impl Strategy<Value = GridPosition> {
    (any::<i8>(), -180i16..=180, 0u8..=30)
        .prop_map(|(latitude, longitude, zoom)| GridPosition { latitude, longitude, zoom })
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        2 => Just(Operation::Attach),
        1 => Just(Operation::Detach),
        3 => grid_strategy().prop_map(Operation::SetCamera),
        2 => any::<bool>().prop_map(Operation::SetTracking),
        2 => any::<bool>().prop_map(Operation::SetLocationEnabled),
        2 => (0u8..6, 0u8..6)
            .prop_map(|(count, unknown_icons)| Operation::SetMarkers { count, unknown_icons }),
        3 => Just(Operation::Settle),
        2 => grid_strategy().prop_map(Operation::UserPan),
    ]
}

proptest! {
    /// Verify that the runtime matches the model after every operation.
    #[test]
    fn prop_runtime_matches_model(
        start in grid_strategy(),
        ops in prop::collection::vec(operation_strategy(), 1..40),
    ) {
        let mut model = ModelMap::new(start.to_position(), SimEngineConfig::default());
        let mut real = RealMap::new(start.to_position());

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op);

            prop_assert_eq!(
                model_result, real_result,
                "Divergence at operation {}: {:?}", i, op
            );

            let state = real.runtime.state();
            prop_assert_eq!(state.position(), model.position(), "position after {:?}", op);
            prop_assert_eq!(
                state.is_tracking_location(), model.is_tracking(),
                "tracking after {:?}", op
            );
            prop_assert_eq!(
                state.is_location_enabled(), model.is_location_enabled(),
                "location flag after {:?}", op
            );
            prop_assert_eq!(state.markers().len(), model.marker_count());
            prop_assert_eq!(real.runtime.phase().is_attached(), model.is_attached());

            if let Some(session) = real.session {
                let engine = real.runtime.engine();
                let annotations = engine.annotations(session);
                prop_assert_eq!(annotations.len(), model.marker_count());
                prop_assert_eq!(
                    annotations.iter().filter(|a| a.icon.is_none()).count(),
                    model.markers_without_icon()
                );

                let map = engine.map(session).unwrap();
                prop_assert_eq!(map.camera, model.engine_camera());
                prop_assert_eq!(map.location_enabled, model.is_location_enabled());
            }
        }
    }

    /// Attaching twice without a detach in between is always rejected.
    #[test]
    fn prop_second_attach_rejected(start in grid_strategy()) {
        let mut model = ModelMap::new(start.to_position(), SimEngineConfig::default());
        let mut real = RealMap::new(start.to_position());

        prop_assert!(real.apply(&Operation::Attach).is_ok());
        prop_assert!(model.apply(&Operation::Attach).is_ok());

        prop_assert_eq!(
            real.apply(&Operation::Attach),
            OperationResult::Error(OperationError::AlreadyAttached)
        );
        prop_assert_eq!(
            model.apply(&Operation::Attach),
            OperationResult::Error(OperationError::AlreadyAttached)
        );
    }

    /// Whatever happened while attached, after a settle the state holds the
    /// engine's camera.
    #[test]
    fn prop_settle_reconciles_camera(target in grid_strategy()) {
        let mut real = RealMap::new(CameraPosition::default());
        real.apply(&Operation::Attach);
        real.apply(&Operation::SetCamera(target));
        real.apply(&Operation::Settle);

        let session = real.session.unwrap();
        let engine_camera = real.runtime.engine().map(session).unwrap().camera;
        prop_assert_eq!(real.runtime.state().position(), engine_camera);
        prop_assert_eq!(engine_camera, SimEngineConfig::default().clamp(target.to_position()));
    }
}
