//! Map presentation bridge state machine.
//!
//! Keeps a [`MapState`] and one live engine session eventually consistent in
//! both directions, across any number of session re-creations.
//!
//! # Architecture: Action-Based State Machine
//!
//! - View writes (`set_*`) and engine callbacks (`on_*`) are method calls
//! - Methods return the [`BridgeAction`]s the runtime must perform
//! - The bridge never calls the engine and never waits
//!
//! # Write buffering
//!
//! Writes made while no session is attached are stored in the state and
//! produce no engine action. The state field is the buffer: only the most
//! recent value survives until the next attach, where the configure step
//! applies it.
//!
//! # Engine authority
//!
//! Once attached, camera-idle and camera-mode callbacks overwrite the state
//! unconditionally (last write wins). Callbacks tagged with any session other
//! than the attached one are dropped: they come from a session that was
//! already released.

use tracing::{debug, info, warn};

use crate::{
    action::BridgeAction,
    camera_mode::{self, CameraMode},
    config::SessionConfig,
    error::BridgeError,
    geo::{CameraPosition, Location},
    marker::Marker,
    state::{AttachStage, MapState, MapStateChange, SessionId, SessionPhase},
};

/// Bridge between a [`MapState`] and an engine session.
#[derive(Debug, Clone)]
pub struct MapBridge {
    /// View-facing state
    state: MapState,
    /// Current session phase
    phase: SessionPhase,
    /// Configuration of the current (or most recent) attach
    config: SessionConfig,
    /// Last allocated session identifier
    last_session: u64,
}

impl MapBridge {
    /// Create an unattached bridge owning `state`.
    pub fn new(state: MapState) -> Self {
        Self {
            state,
            phase: SessionPhase::Unattached,
            config: SessionConfig::default(),
            last_session: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &MapState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Configuration of the current or most recent attach.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Session that is attached and configured.
    pub fn attached_session(&self) -> Option<SessionId> {
        match self.phase {
            SessionPhase::Attached { session } => Some(session),
            _ => None,
        }
    }

    /// Start attaching a new engine session.
    ///
    /// Returns the new session identifier. The runtime must request the map
    /// handle and report it through [`Self::on_map_ready`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless unattached. Only one session may be
    /// attached or attaching at a time.
    pub fn begin_attach(
        &mut self,
        config: SessionConfig,
    ) -> Result<(SessionId, Vec<BridgeAction>), BridgeError> {
        if self.phase != SessionPhase::Unattached {
            return Err(BridgeError::InvalidState { phase: self.phase, operation: "begin_attach" });
        }

        self.last_session += 1;
        let session = SessionId::new(self.last_session);
        self.config = config;
        self.phase = SessionPhase::Attaching { session, stage: AttachStage::AwaitingMap };

        debug!(%session, theme = ?self.config.theme, "attach started");
        Ok((session, vec![BridgeAction::Notify(MapStateChange::Phase(self.phase))]))
    }

    /// Map handle arrived. Returns the style URL to load next.
    ///
    /// # Errors
    ///
    /// Returns `SessionMismatch` or `InvalidState` unless this session is
    /// waiting for its map handle.
    pub fn on_map_ready(&mut self, session: SessionId) -> Result<String, BridgeError> {
        self.expect_phase(
            SessionPhase::Attaching { session, stage: AttachStage::AwaitingMap },
            "on_map_ready",
        )?;

        self.phase = SessionPhase::Attaching { session, stage: AttachStage::AwaitingStyle };
        debug!(%session, url = self.config.style_url(), "map ready, loading style");
        Ok(self.config.style_url().to_string())
    }

    /// Style finished loading. Completes the attach and configures the
    /// session from the current state.
    ///
    /// Configuration order: UI chrome, location component activation, camera
    /// position, camera mode, observers. State-owned fields the fresh
    /// session does not know about follow: location component visibility
    /// (only with a granted permission) and the full marker list.
    ///
    /// # Errors
    ///
    /// Returns `SessionMismatch` or `InvalidState` unless this session is
    /// waiting for its style.
    pub fn on_style_loaded(
        &mut self,
        session: SessionId,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        self.expect_phase(
            SessionPhase::Attaching { session, stage: AttachStage::AwaitingStyle },
            "on_style_loaded",
        )?;

        self.phase = SessionPhase::Attached { session };

        let mut actions = vec![
            BridgeAction::ApplyUiSettings { session, settings: self.config.ui },
            BridgeAction::ActivateLocationComponent {
                session,
                request: self.config.location_request,
            },
            BridgeAction::MoveCamera { session, position: self.state.position() },
            BridgeAction::SetCameraMode {
                session,
                mode: CameraMode::for_tracking(self.state.is_tracking_location()),
            },
            BridgeAction::RegisterObservers { session },
        ];

        if self.state.is_location_enabled() {
            if self.config.location_permission.is_granted() {
                actions.push(BridgeAction::SetLocationComponentEnabled { session, enabled: true });
            } else {
                warn!(%session, "location enabled in state but permission denied, not showing it");
            }
        }

        actions.push(BridgeAction::SyncMarkers { session, markers: self.state.markers().to_vec() });
        actions.push(BridgeAction::Notify(MapStateChange::Phase(self.phase)));

        info!(%session, "session attached");
        Ok(actions)
    }

    /// Style failed to load. Aborts the attach; the failure is the caller's
    /// to surface. No retry.
    ///
    /// # Errors
    ///
    /// Same as [`Self::abort_attach`].
    pub fn on_style_failed(
        &mut self,
        session: SessionId,
        reason: &str,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        warn!(%session, reason, "style load failed");
        self.abort_attach(session)
    }

    /// Abandon an attach in progress (failure, timeout, dropped callback).
    ///
    /// Releases the map handle if one was already handed out and returns to
    /// unattached. Nothing of the attempt is retained.
    ///
    /// # Errors
    ///
    /// Returns `SessionMismatch` or `InvalidState` unless this session is
    /// attaching.
    pub fn abort_attach(&mut self, session: SessionId) -> Result<Vec<BridgeAction>, BridgeError> {
        let SessionPhase::Attaching { session: current, stage } = self.phase else {
            return Err(BridgeError::InvalidState { phase: self.phase, operation: "abort_attach" });
        };
        if current != session {
            return Err(BridgeError::SessionMismatch { phase: self.phase, got: session });
        }

        let mut actions = Vec::new();
        if stage == AttachStage::AwaitingStyle {
            actions.push(BridgeAction::ReleaseSession { session });
        }

        self.phase = SessionPhase::Unattached;
        actions.push(BridgeAction::Notify(MapStateChange::Phase(self.phase)));

        warn!(%session, %stage, "attach aborted");
        Ok(actions)
    }

    /// Release the current session, if any.
    ///
    /// State values stay in place for the next attach. Detaching while
    /// attaching abandons the attach; late callbacks for it are rejected or
    /// ignored by session id.
    pub fn detach(&mut self) -> Vec<BridgeAction> {
        let release = match self.phase {
            SessionPhase::Unattached => return Vec::new(),
            SessionPhase::Attaching { stage: AttachStage::AwaitingMap, .. } => None,
            SessionPhase::Attaching { session, stage: AttachStage::AwaitingStyle }
            | SessionPhase::Attached { session } => Some(session),
        };

        let previous = self.phase;
        self.phase = SessionPhase::Unattached;
        info!(phase = %previous, "session detached");

        let mut actions = Vec::new();
        if let Some(session) = release {
            actions.push(BridgeAction::ReleaseSession { session });
        }
        actions.push(BridgeAction::Notify(MapStateChange::Phase(self.phase)));
        actions
    }

    /// Engine camera settled.
    ///
    /// `position` and `location` are what the engine reports right now. Both
    /// overwrite the state; an absent location keeps the previous one.
    /// Callbacks from a session other than the attached one are ignored.
    pub fn on_camera_idle(
        &mut self,
        session: SessionId,
        position: CameraPosition,
        location: Option<Location>,
    ) -> Vec<BridgeAction> {
        if !self.is_live(session) {
            debug!(%session, phase = %self.phase, "ignoring camera idle from stale session");
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.state.replace_position(position) {
            actions.push(BridgeAction::Notify(MapStateChange::Position(position)));
        }
        if let Some(location) = location
            && self.state.replace_location(location)
        {
            actions.push(BridgeAction::Notify(MapStateChange::Location(location)));
        }
        actions
    }

    /// Engine camera mode changed, by a user gesture or a previous request.
    ///
    /// Writes the tracking flag without issuing an engine call, so the
    /// change does not echo back.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedCameraMode` for any mode other than `NONE` or
    /// `TRACKING`. The state is left untouched.
    pub fn on_camera_mode_changed(
        &mut self,
        session: SessionId,
        raw: u32,
    ) -> Result<Vec<BridgeAction>, BridgeError> {
        if !self.is_live(session) {
            debug!(%session, raw, "ignoring camera mode change from stale session");
            return Ok(Vec::new());
        }

        let tracking = camera_mode::tracking_flag(raw)?;
        if self.state.replace_tracking(tracking) {
            debug!(%session, tracking, "tracking changed by engine");
            return Ok(vec![BridgeAction::Notify(MapStateChange::TrackingLocation(tracking))]);
        }
        Ok(Vec::new())
    }

    /// Request a camera position.
    ///
    /// Applied immediately when attached; otherwise kept as the initial
    /// position of the next session.
    pub fn set_camera_position(&mut self, position: CameraPosition) -> Vec<BridgeAction> {
        let mut actions = Vec::new();
        if self.state.replace_position(position) {
            actions.push(BridgeAction::Notify(MapStateChange::Position(position)));
        }
        if let Some(session) = self.attached_session() {
            actions.push(BridgeAction::MoveCamera { session, position });
        }
        actions
    }

    /// Request tracking on or off.
    pub fn set_tracking_enabled(&mut self, enabled: bool) -> Vec<BridgeAction> {
        let mut actions = Vec::new();
        if self.state.replace_tracking(enabled) {
            actions.push(BridgeAction::Notify(MapStateChange::TrackingLocation(enabled)));
        }
        if let Some(session) = self.attached_session() {
            actions.push(BridgeAction::SetCameraMode {
                session,
                mode: CameraMode::for_tracking(enabled),
            });
        }
        actions
    }

    /// Show or hide the location component.
    ///
    /// The permission is not checked here. Enabling without one is left to
    /// the engine to reject.
    pub fn set_location_enabled(&mut self, enabled: bool) -> Vec<BridgeAction> {
        let mut actions = Vec::new();
        if self.state.replace_location_enabled(enabled) {
            actions.push(BridgeAction::Notify(MapStateChange::LocationEnabled(enabled)));
        }
        if let Some(session) = self.attached_session() {
            actions.push(BridgeAction::SetLocationComponentEnabled { session, enabled });
        }
        actions
    }

    /// Replace the marker list.
    ///
    /// When attached, the whole list is redrawn regardless of how many
    /// markers actually changed.
    pub fn set_markers(&mut self, markers: Vec<Marker>) -> Vec<BridgeAction> {
        self.state.replace_markers(markers.clone());
        let mut actions = vec![BridgeAction::Notify(MapStateChange::Markers(markers.clone()))];
        if let Some(session) = self.attached_session() {
            actions.push(BridgeAction::SyncMarkers { session, markers });
        }
        actions
    }

    fn is_live(&self, session: SessionId) -> bool {
        self.attached_session() == Some(session)
    }

    fn expect_phase(
        &self,
        expected: SessionPhase,
        operation: &'static str,
    ) -> Result<(), BridgeError> {
        if self.phase == expected {
            return Ok(());
        }

        match (self.phase.session(), expected.session()) {
            (Some(current), Some(got)) if current != got => {
                Err(BridgeError::SessionMismatch { phase: self.phase, got })
            },
            _ => Err(BridgeError::InvalidState { phase: self.phase, operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationPermission;

    fn attach(bridge: &mut MapBridge, config: SessionConfig) -> (SessionId, Vec<BridgeAction>) {
        let (session, _) = bridge.begin_attach(config).unwrap();
        bridge.on_map_ready(session).unwrap();
        let actions = bridge.on_style_loaded(session).unwrap();
        (session, actions)
    }

    fn engine_actions(actions: &[BridgeAction]) -> Vec<&BridgeAction> {
        actions.iter().filter(|a| !matches!(a, BridgeAction::Notify(_))).collect()
    }

    #[test]
    fn attach_lifecycle() {
        let mut bridge = MapBridge::new(MapState::default());
        assert_eq!(bridge.phase(), SessionPhase::Unattached);

        let (session, actions) = bridge.begin_attach(SessionConfig::default()).unwrap();
        assert_eq!(
            bridge.phase(),
            SessionPhase::Attaching { session, stage: AttachStage::AwaitingMap }
        );
        assert_eq!(actions, vec![BridgeAction::Notify(MapStateChange::Phase(bridge.phase()))]);

        let url = bridge.on_map_ready(session).unwrap();
        assert_eq!(url, "asset://styles/light.json");
        assert_eq!(
            bridge.phase(),
            SessionPhase::Attaching { session, stage: AttachStage::AwaitingStyle }
        );

        bridge.on_style_loaded(session).unwrap();
        assert_eq!(bridge.phase(), SessionPhase::Attached { session });
        assert_eq!(bridge.attached_session(), Some(session));

        let actions = bridge.detach();
        assert_eq!(bridge.phase(), SessionPhase::Unattached);
        assert_eq!(actions[0], BridgeAction::ReleaseSession { session });
    }

    #[test]
    fn configure_order() {
        let position = CameraPosition::new(10.0, 20.0, 5.0);
        let mut bridge = MapBridge::new(MapState::new(position).with_tracking(true));
        let (session, actions) = attach(&mut bridge, SessionConfig::default());

        let engine = engine_actions(&actions);
        assert!(matches!(engine[0], BridgeAction::ApplyUiSettings { .. }));
        assert!(matches!(engine[1], BridgeAction::ActivateLocationComponent { .. }));
        assert_eq!(engine[2], &BridgeAction::MoveCamera { session, position });
        assert_eq!(
            engine[3],
            &BridgeAction::SetCameraMode { session, mode: CameraMode::Tracking }
        );
        assert_eq!(engine[4], &BridgeAction::RegisterObservers { session });
        assert_eq!(engine[5], &BridgeAction::SyncMarkers { session, markers: vec![] });
        assert_eq!(engine.len(), 6);

        assert!(engine.iter().all(|action| action.session() == Some(session)));
        assert_eq!(actions.last().and_then(BridgeAction::session), None);
    }

    #[test]
    fn config_kept_for_the_session() {
        let mut bridge = MapBridge::new(MapState::default());
        let config = SessionConfig::default()
            .with_theme(crate::config::MapTheme::Dark)
            .with_location_permission(LocationPermission::Coarse);
        attach(&mut bridge, config.clone());

        assert_eq!(bridge.config(), &config);
        assert_eq!(bridge.config().style_url(), "asset://styles/dark.json");
    }

    #[test]
    fn only_last_detached_camera_write_reaches_new_session() {
        let mut bridge = MapBridge::new(MapState::default());

        for zoom in 1..=5 {
            let actions = bridge.set_camera_position(CameraPosition::new(1.0, 2.0, f64::from(zoom)));
            assert!(engine_actions(&actions).is_empty());
        }

        let (session, actions) = attach(&mut bridge, SessionConfig::default());
        let moves: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                BridgeAction::MoveCamera { position, .. } => Some(*position),
                _ => None,
            })
            .collect();
        assert_eq!(moves, vec![CameraPosition::new(1.0, 2.0, 5.0)]);
        assert_eq!(bridge.attached_session(), Some(session));
    }

    #[test]
    fn writes_while_attaching_are_applied_by_configure() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();

        let actions = bridge.set_tracking_enabled(true);
        assert!(engine_actions(&actions).is_empty());

        bridge.on_map_ready(session).unwrap();
        let actions = bridge.on_style_loaded(session).unwrap();
        assert!(actions.contains(&BridgeAction::SetCameraMode { session, mode: CameraMode::Tracking }));
    }

    #[test]
    fn attached_writes_issue_engine_calls() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = attach(&mut bridge, SessionConfig::default());

        let position = CameraPosition::new(49.843, 9.902, 2.7);
        let actions = bridge.set_camera_position(position);
        assert_eq!(
            actions,
            vec![
                BridgeAction::Notify(MapStateChange::Position(position)),
                BridgeAction::MoveCamera { session, position },
            ]
        );

        let actions = bridge.set_location_enabled(true);
        assert!(actions.contains(&BridgeAction::SetLocationComponentEnabled { session, enabled: true }));
    }

    #[test]
    fn second_attach_rejected() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();

        let result = bridge.begin_attach(SessionConfig::default());
        assert!(matches!(result, Err(BridgeError::InvalidState { operation: "begin_attach", .. })));

        bridge.on_map_ready(session).unwrap();
        bridge.on_style_loaded(session).unwrap();
        let result = bridge.begin_attach(SessionConfig::default());
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }

    #[test]
    fn out_of_order_callbacks_rejected() {
        let mut bridge = MapBridge::new(MapState::default());

        let result = bridge.on_map_ready(SessionId::new(1));
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));

        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();
        let result = bridge.on_style_loaded(session);
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));

        let result = bridge.on_map_ready(SessionId::new(session.value() + 7));
        assert!(matches!(result, Err(BridgeError::SessionMismatch { .. })));
    }

    #[test]
    fn style_failure_returns_to_unattached() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();
        bridge.on_map_ready(session).unwrap();

        let actions = bridge.on_style_failed(session, "404").unwrap();
        assert_eq!(bridge.phase(), SessionPhase::Unattached);
        assert_eq!(actions[0], BridgeAction::ReleaseSession { session });

        // A new attempt gets a fresh session
        let (next, _) = bridge.begin_attach(SessionConfig::default()).unwrap();
        assert!(next > session);
    }

    #[test]
    fn abort_before_map_releases_nothing() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();

        let actions = bridge.abort_attach(session).unwrap();
        assert!(engine_actions(&actions).is_empty());
        assert_eq!(bridge.phase(), SessionPhase::Unattached);

        let result = bridge.abort_attach(session);
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }

    #[test]
    fn camera_idle_overwrites_last_write_wins() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = attach(&mut bridge, SessionConfig::default());

        let first = CameraPosition::new(1.0, 2.0, 3.0);
        let location = Location::new(1.0, 2.0, 5.0);
        let actions = bridge.on_camera_idle(session, first, Some(location));
        assert_eq!(actions.len(), 2);
        assert_eq!(bridge.state().position(), first);
        assert_eq!(bridge.state().location(), Some(location));

        let second = CameraPosition::new(4.0, 5.0, 6.0);
        bridge.on_camera_idle(session, second, None);
        assert_eq!(bridge.state().position(), second);
        assert_eq!(bridge.state().location(), Some(location));
    }

    #[test]
    fn stale_session_callbacks_ignored() {
        let mut bridge = MapBridge::new(MapState::default());
        let (old, _) = attach(&mut bridge, SessionConfig::default());
        bridge.detach();

        let actions = bridge.on_camera_idle(old, CameraPosition::new(9.0, 9.0, 9.0), None);
        assert!(actions.is_empty());
        assert_eq!(bridge.state().position(), CameraPosition::default());

        let (_new, _) = attach(&mut bridge, SessionConfig::default());
        let actions = bridge.on_camera_mode_changed(old, CameraMode::Tracking.to_raw()).unwrap();
        assert!(actions.is_empty());
        assert!(!bridge.state().is_tracking_location());
    }

    #[test]
    fn camera_mode_change_sets_flag_without_engine_call() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = attach(&mut bridge, SessionConfig::default());

        let actions = bridge.on_camera_mode_changed(session, CameraMode::Tracking.to_raw()).unwrap();
        assert_eq!(actions, vec![BridgeAction::Notify(MapStateChange::TrackingLocation(true))]);
        assert!(bridge.state().is_tracking_location());

        let actions = bridge.on_camera_mode_changed(session, CameraMode::None.to_raw()).unwrap();
        assert!(engine_actions(&actions).is_empty());
        assert!(!bridge.state().is_tracking_location());
    }

    #[test]
    fn unexpected_camera_mode_is_contract_violation() {
        let mut bridge = MapBridge::new(MapState::default().with_tracking(true));
        let (session, _) = attach(&mut bridge, SessionConfig::default());

        let raw = CameraMode::TrackingGpsNorth.to_raw();
        let result = bridge.on_camera_mode_changed(session, raw);
        assert_eq!(result, Err(BridgeError::UnexpectedCameraMode { raw }));
        assert!(bridge.state().is_tracking_location());

        let result = bridge.on_camera_mode_changed(session, 99);
        assert_eq!(result, Err(BridgeError::UnexpectedCameraMode { raw: 99 }));
    }

    #[test]
    fn reattach_preserves_state_owned_fields() {
        let markers = vec![Marker::new("pin", 1.0, 2.0).anchored_bottom()];
        let state = MapState::default().with_markers(markers.clone()).with_location_enabled(true);
        let mut bridge = MapBridge::new(state);
        let config = SessionConfig::default().with_location_permission(LocationPermission::Fine);

        attach(&mut bridge, config.clone());
        bridge.detach();

        let (session, actions) = attach(&mut bridge, config);
        assert_eq!(bridge.state().markers(), markers.as_slice());
        assert!(bridge.state().is_location_enabled());
        assert!(actions.contains(&BridgeAction::SyncMarkers { session, markers }));
        assert!(actions.contains(&BridgeAction::SetLocationComponentEnabled { session, enabled: true }));
    }

    #[test]
    fn location_not_reenabled_without_permission() {
        let mut bridge = MapBridge::new(MapState::default().with_location_enabled(true));
        let (_, actions) = attach(&mut bridge, SessionConfig::default());

        assert!(!actions.iter().any(|a| matches!(a, BridgeAction::SetLocationComponentEnabled { .. })));
        assert!(bridge.state().is_location_enabled());
    }

    #[test]
    fn detach_while_awaiting_map_releases_nothing() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = bridge.begin_attach(SessionConfig::default()).unwrap();

        let actions = bridge.detach();
        assert!(engine_actions(&actions).is_empty());

        // Late map callback for the abandoned attach
        let result = bridge.on_map_ready(session);
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }

    #[test]
    fn detach_when_unattached_is_noop() {
        let mut bridge = MapBridge::new(MapState::default());
        assert!(bridge.detach().is_empty());
    }

    #[test]
    fn markers_replaced_wholesale() {
        let mut bridge = MapBridge::new(MapState::default());
        let (session, _) = attach(&mut bridge, SessionConfig::default());

        bridge.set_markers(vec![Marker::new("a", 0.0, 0.0), Marker::new("b", 1.0, 1.0)]);
        let actions = bridge.set_markers(Vec::new());
        assert!(bridge.state().markers().is_empty());
        assert!(actions.contains(&BridgeAction::SyncMarkers { session, markers: Vec::new() }));
    }
}
