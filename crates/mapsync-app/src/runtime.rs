//! Generic runtime driving the bridge against an engine.
//!
//! [`MapRuntime`] owns the [`MapBridge`], the engine and the live session
//! handles. It feeds view writes and engine callbacks into the bridge and
//! executes the resulting [`BridgeAction`]s. The same code runs against the
//! platform engine in production and the simulated engine in tests.
//!
//! # Execution model
//!
//! A single owner (`&mut self`) performs every state write and engine call.
//! Engine observer events are queued by the engine's [`EventSink`] and
//! delivered by [`MapRuntime::pump_events`] or [`MapRuntime::next_event`],
//! one at a time, each running to completion before the next.
//!
//! Attach has two suspension points: waiting for the map handle, then for
//! the style. Each is a single-shot [`Callback`] awaited as a future, bounded
//! by [`RuntimeConfig::attach_timeout`]. Dropping the attach future drops the
//! waiting side, so a late callback is discarded rather than delivered into
//! a session nobody reads.

use std::time::Duration;

use mapsync_core::{
    AttachStage, BridgeAction, CameraPosition, MapBridge, MapState, MapStateChange, Marker,
    SessionConfig, SessionId, SessionPhase,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::{
    config::RuntimeConfig,
    engine::{Callback, EngineEvent, EventSink, MapEngine, SessionEvent},
    error::RuntimeError,
    icons::IconResolver,
    markers::{self, MarkerSyncReport},
};

/// Handles of the live engine session ("map refs").
///
/// The style and overlay only exist once the style has loaded.
struct MapRefs<E: MapEngine> {
    session: SessionId,
    map: E::Map,
    style: Option<E::Style>,
    overlay: Option<E::Overlay>,
}

/// Result of a runtime operation on engine `E`.
pub type RuntimeResult<T, E> = Result<T, RuntimeError<<E as MapEngine>::Error>>;

/// Runtime binding one [`MapState`] to successive engine sessions.
pub struct MapRuntime<E: MapEngine, R: IconResolver> {
    engine: E,
    icons: R,
    bridge: MapBridge,
    config: RuntimeConfig,
    refs: Option<MapRefs<E>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    changes: broadcast::Sender<MapStateChange>,
    last_marker_sync: Option<MarkerSyncReport>,
}

impl<E: MapEngine, R: IconResolver> MapRuntime<E, R> {
    /// Create an unattached runtime owning `state`.
    pub fn new(engine: E, icons: R, state: MapState, config: RuntimeConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(config.change_buffer.max(1));

        Self {
            engine,
            icons,
            bridge: MapBridge::new(state),
            config,
            refs: None,
            events_tx,
            events_rx,
            changes,
            last_marker_sync: None,
        }
    }

    /// Current map state.
    pub fn state(&self) -> &MapState {
        self.bridge.state()
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.bridge.phase()
    }

    /// Subscribe to state changes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MapStateChange> {
        self.changes.subscribe()
    }

    /// Engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access, for hosts that feed it input directly.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Report of the most recent marker sync against a live session.
    pub fn last_marker_sync(&self) -> Option<MarkerSyncReport> {
        self.last_marker_sync
    }

    /// Create and configure a new engine session.
    ///
    /// Waits for the map handle, then for the style, then configures the
    /// session from the current state.
    ///
    /// # Errors
    ///
    /// - `Bridge` if a session is already attached or attaching
    /// - `StyleLoad` if the engine failed to load the style
    /// - `AttachTimeout` / `CallbackDropped` if a callback never arrives
    /// - `Engine` if a configuration call fails
    ///
    /// On every failure the phase returns to unattached and the partial
    /// session is released. An engine refusing to show the location
    /// component is not a failure: the flag stays in the state and the rest
    /// of the configuration proceeds.
    pub async fn attach(&mut self, config: SessionConfig) -> RuntimeResult<SessionId, E> {
        let (session, actions) = self.bridge.begin_attach(config)?;
        self.execute_all(actions)?;

        let timeout = self.config.attach_timeout;

        let (callback, rx) = Callback::channel();
        self.engine.get_map_async(session, callback);
        let map = match await_callback(rx, AttachStage::AwaitingMap, timeout).await {
            Ok(map) => map,
            Err(err) => return Err(self.fail_attach(session, err)),
        };

        let url = self.bridge.on_map_ready(session)?;
        let refs = self.refs.insert(MapRefs { session, map, style: None, overlay: None });

        let (callback, rx) = Callback::channel();
        self.engine.set_style(&mut refs.map, &url, callback);
        let mut style = match await_callback(rx, AttachStage::AwaitingStyle, timeout).await {
            Ok(Ok(style)) => style,
            Ok(Err(failure)) => {
                let actions = self.bridge.on_style_failed(session, &failure.reason)?;
                self.execute_all(actions)?;
                return Err(RuntimeError::StyleLoad(failure));
            },
            Err(err) => return Err(self.fail_attach(session, err)),
        };

        let refs = live_refs::<E>(&mut self.refs, session, "create_overlay")?;
        let overlay = self.engine.create_overlay(&mut refs.map, &mut style);
        refs.style = Some(style);
        refs.overlay = Some(overlay);

        let actions = self.bridge.on_style_loaded(session)?;
        if let Err(err) = self.configure(session, actions) {
            warn!(%session, error = %err, "session configuration failed, detaching");
            let cleanup = self.bridge.detach();
            if let Err(cleanup_err) = self.execute_all(cleanup) {
                warn!(%session, error = %cleanup_err, "cleanup after failed configuration");
            }
            return Err(err);
        }
        Ok(session)
    }

    /// Release the current session. State stays for the next attach.
    ///
    /// # Errors
    ///
    /// Never fails for a held session; kept fallible like every other
    /// action executor.
    pub fn detach(&mut self) -> RuntimeResult<(), E> {
        let actions = self.bridge.detach();
        self.execute_all(actions)
    }

    /// Request a camera position.
    pub fn set_camera_position(&mut self, position: CameraPosition) -> RuntimeResult<(), E> {
        let actions = self.bridge.set_camera_position(position);
        self.execute_all(actions)
    }

    /// Request tracking on or off.
    pub fn set_tracking_enabled(&mut self, enabled: bool) -> RuntimeResult<(), E> {
        let actions = self.bridge.set_tracking_enabled(enabled);
        self.execute_all(actions)
    }

    /// Show or hide the location component.
    ///
    /// # Errors
    ///
    /// `Engine` if the engine rejects it, typically for lack of permission.
    /// The flag stays set in the state either way.
    pub fn set_location_enabled(&mut self, enabled: bool) -> RuntimeResult<(), E> {
        let actions = self.bridge.set_location_enabled(enabled);
        self.execute_all(actions)
    }

    /// Replace the marker list.
    ///
    /// # Errors
    ///
    /// `Engine` if drawing stops partway. The overlay then holds the
    /// markers drawn before the error and [`Self::last_marker_sync`]
    /// describes them.
    pub fn set_markers(&mut self, markers: Vec<Marker>) -> RuntimeResult<(), E> {
        let actions = self.bridge.set_markers(markers);
        self.execute_all(actions)
    }

    /// Deliver every queued engine event. Returns how many were delivered.
    ///
    /// # Errors
    ///
    /// Stops at the first failing event (e.g. an unexpected camera mode).
    /// Later events stay queued.
    pub fn pump_events(&mut self) -> RuntimeResult<usize, E> {
        let mut delivered = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Wait for the next engine event and deliver it.
    ///
    /// The runtime keeps a sender alive, so this waits until an engine
    /// emits something.
    pub async fn next_event(&mut self) -> RuntimeResult<(), E> {
        if let Some(event) = self.events_rx.recv().await {
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, SessionEvent { session, event }: SessionEvent) -> RuntimeResult<(), E> {
        trace!(%session, ?event, "engine event");
        let actions = match event {
            EngineEvent::CameraIdle => {
                let Some(refs) = self.refs.as_ref().filter(|r| r.session == session) else {
                    debug!(%session, "camera idle for released session");
                    return Ok(());
                };
                let position = self.engine.camera_position(&refs.map);
                let location = self.engine.last_known_location(&refs.map);
                self.bridge.on_camera_idle(session, position, location)
            },
            EngineEvent::CameraModeChanged { raw } => {
                self.bridge.on_camera_mode_changed(session, raw)?
            },
        };
        self.execute_all(actions)
    }

    fn configure(
        &mut self,
        session: SessionId,
        actions: Vec<BridgeAction>,
    ) -> RuntimeResult<(), E> {
        for action in actions {
            let shows_location =
                matches!(action, BridgeAction::SetLocationComponentEnabled { enabled: true, .. });
            match self.execute(action) {
                Err(RuntimeError::Engine(err)) if shows_location => {
                    warn!(
                        %session,
                        error = %err,
                        "engine refused the location component, keeping flag"
                    );
                },
                result => result?,
            }
        }
        Ok(())
    }

    fn fail_attach(
        &mut self,
        session: SessionId,
        err: RuntimeError<E::Error>,
    ) -> RuntimeError<E::Error> {
        warn!(%session, error = %err, "attach failed");
        let cleanup = self
            .bridge
            .abort_attach(session)
            .map_err(RuntimeError::from)
            .and_then(|actions| self.execute_all(actions));
        if let Err(cleanup_err) = cleanup {
            warn!(%session, error = %cleanup_err, "cleanup after failed attach");
        }
        err
    }

    fn execute_all(&mut self, actions: Vec<BridgeAction>) -> RuntimeResult<(), E> {
        for action in actions {
            self.execute(action)?;
        }
        Ok(())
    }

    fn execute(&mut self, action: BridgeAction) -> RuntimeResult<(), E> {
        match action {
            BridgeAction::Notify(change) => {
                trace!(?change, "state changed");
                // No subscribers is fine
                let _ = self.changes.send(change);
            },
            BridgeAction::ApplyUiSettings { session, settings } => {
                let refs = live_refs::<E>(&mut self.refs, session, "apply_ui_settings")?;
                self.engine.apply_ui_settings(&mut refs.map, &settings);
            },
            BridgeAction::ActivateLocationComponent { session, request } => {
                let refs = live_refs::<E>(&mut self.refs, session, "activate_location")?;
                let style = refs
                    .style
                    .as_ref()
                    .ok_or(RuntimeError::NoSession { session, operation: "activate_location" })?;
                self.engine
                    .activate_location_component(&mut refs.map, style, &request)
                    .map_err(RuntimeError::Engine)?;
            },
            BridgeAction::MoveCamera { session, position } => {
                let refs = live_refs::<E>(&mut self.refs, session, "move_camera")?;
                self.engine.move_camera(&mut refs.map, position);
            },
            BridgeAction::SetCameraMode { session, mode } => {
                let refs = live_refs::<E>(&mut self.refs, session, "set_camera_mode")?;
                self.engine.set_camera_mode(&mut refs.map, mode);
            },
            BridgeAction::RegisterObservers { session } => {
                let refs = live_refs::<E>(&mut self.refs, session, "register_observers")?;
                let sink = EventSink::new(session, self.events_tx.clone());
                self.engine.register_observers(&mut refs.map, sink);
            },
            BridgeAction::SetLocationComponentEnabled { session, enabled } => {
                let refs = live_refs::<E>(&mut self.refs, session, "set_location_enabled")?;
                self.engine
                    .set_location_component_enabled(&mut refs.map, enabled)
                    .map_err(RuntimeError::Engine)?;
            },
            BridgeAction::SyncMarkers { session, markers } => {
                let refs = live_refs::<E>(&mut self.refs, session, "sync_markers")?;
                let (Some(style), Some(overlay)) = (refs.style.as_mut(), refs.overlay.as_mut())
                else {
                    return Err(RuntimeError::NoSession { session, operation: "sync_markers" });
                };
                let synced =
                    markers::sync_markers(&mut self.engine, &self.icons, style, overlay, &markers);
                let report = match synced {
                    Ok(report) => report,
                    Err(partial) => {
                        warn!(%session, drawn = partial.drawn.created, "marker sync stopped");
                        self.last_marker_sync = Some(partial.drawn);
                        return Err(RuntimeError::Engine(partial.error));
                    },
                };
                debug!(
                    %session,
                    created = report.created,
                    without_icon = report.without_icon,
                    "markers synced"
                );
                self.last_marker_sync = Some(report);
            },
            BridgeAction::ReleaseSession { session } => {
                match self.refs.take_if(|r| r.session == session) {
                    Some(refs) => self.engine.release(refs.map, refs.style, refs.overlay),
                    None => debug!(%session, "nothing to release"),
                }
            },
        }
        Ok(())
    }
}

/// Wait for a single-shot callback, optionally bounded by `limit`.
async fn await_callback<T, Err>(
    rx: oneshot::Receiver<T>,
    stage: AttachStage,
    limit: Option<Duration>,
) -> Result<T, RuntimeError<Err>>
where
    Err: std::error::Error + Send + Sync + 'static,
{
    let received = match limit {
        Some(after) => tokio::time::timeout(after, rx)
            .await
            .map_err(|_| RuntimeError::AttachTimeout { stage, after })?,
        None => rx.await,
    };
    received.map_err(|_| RuntimeError::CallbackDropped { stage })
}

fn live_refs<'a, E: MapEngine>(
    refs: &'a mut Option<MapRefs<E>>,
    session: SessionId,
    operation: &'static str,
) -> RuntimeResult<&'a mut MapRefs<E>, E> {
    refs.as_mut()
        .filter(|r| r.session == session)
        .ok_or(RuntimeError::NoSession { session, operation })
}
