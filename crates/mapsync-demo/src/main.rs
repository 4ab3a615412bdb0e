//! Scripted map session.
//!
//! Runs one view lifetime against the simulated engine: attach, markers,
//! camera moves, tracking, a user pan, then a saved-instance round trip
//! into a second session. Everything is reported through `tracing`.

use clap::{Parser, ValueEnum};
use mapsync_app::{IconImage, IconRegistry, MapRuntime, RuntimeConfig, RuntimeError};
use mapsync_core::{
    CameraPosition, Location, LocationPermission, MapState, MapStateChange, MapStateSnapshot,
    MapTheme, Marker, SessionConfig, SnapshotError,
};
use mapsync_harness::{SimEngine, SimEngineConfig, SimEngineError};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Runtime = MapRuntime<SimEngine, IconRegistry>;

/// Theme of the hosting view.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Theme {
    Light,
    Dark,
}

impl From<Theme> for MapTheme {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::Light,
            Theme::Dark => Self::Dark,
        }
    }
}

/// Location permission granted to the app.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Permission {
    Denied,
    Coarse,
    Fine,
}

impl From<Permission> for LocationPermission {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Denied => Self::Denied,
            Permission::Coarse => Self::Coarse,
            Permission::Fine => Self::Fine,
        }
    }
}

/// Scripted map session against the simulated engine
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// View theme, selects the style
    #[arg(long, value_enum, default_value = "light")]
    theme: Theme,

    /// Location permission granted to the app
    #[arg(long, value_enum, default_value = "fine")]
    permission: Permission,

    /// Number of markers to place
    #[arg(long, default_value_t = 4)]
    markers: u8,

    /// How many of the markers reference an icon that does not exist
    #[arg(long, default_value_t = 1)]
    missing_icons: u8,

    /// Camera latitude
    #[arg(long, default_value_t = 49.843, allow_hyphen_values = true)]
    latitude: f64,

    /// Camera longitude
    #[arg(long, default_value_t = 9.902, allow_hyphen_values = true)]
    longitude: f64,

    /// Camera zoom
    #[arg(long, default_value_t = 2.7)]
    zoom: f64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError<SimEngineError>),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let session_config = SessionConfig::default()
        .with_theme(args.theme.into())
        .with_location_permission(args.permission.into());

    let engine = SimEngineConfig {
        location_permission: args.permission.into(),
        ..SimEngineConfig::default()
    };
    let mut runtime = new_runtime(engine.clone(), MapState::default());
    let mut changes = runtime.subscribe();

    let session = runtime.attach(session_config.clone()).await?;
    info!(%session, style = session_config.style_url(), "attached");

    runtime.set_markers(markers(args.markers, args.missing_icons))?;
    if let Some(report) = runtime.last_marker_sync() {
        info!(created = report.created, without_icon = report.without_icon, "markers drawn");
    }

    runtime.set_camera_position(CameraPosition::new(args.latitude, args.longitude, args.zoom))?;
    runtime.engine_mut().settle_camera(session);
    runtime.pump_events()?;
    info!(position = ?runtime.state().position(), "camera settled");

    if let Err(err) = runtime.set_location_enabled(true) {
        warn!(error = %err, "location component not shown");
    }
    runtime.set_tracking_enabled(true)?;
    runtime.engine_mut().set_device_location(session, Location::new(52.52, 13.405, 12.0));
    runtime.pump_events()?;
    info!(
        position = ?runtime.state().position(),
        location = ?runtime.state().location(),
        "tracking"
    );

    runtime.engine_mut().user_pan(session, CameraPosition::new(48.137, 11.575, 10.0));
    runtime.pump_events()?;
    info!(tracking = runtime.state().is_tracking_location(), "user panned");

    log_changes(&mut changes);

    runtime.detach()?;
    let saved = MapStateSnapshot::capture(runtime.state()).to_cbor()?;
    info!(bytes = saved.len(), "state saved");

    let restored = MapStateSnapshot::from_cbor(&saved)?.restore();
    let mut runtime = new_runtime(engine, restored);
    let session = runtime.attach(session_config).await?;
    info!(
        %session,
        position = ?runtime.state().position(),
        annotations = runtime.engine().annotations(session).len(),
        "restored into a new session"
    );

    runtime.detach()?;
    Ok(())
}

fn new_runtime(engine: SimEngineConfig, state: MapState) -> Runtime {
    let pin = IconImage::rgba(1, 1, vec![0xd3, 0x2f, 0x2f, 0xff]);
    let icons = IconRegistry::new().with("pin", pin);
    MapRuntime::new(SimEngine::new(engine), icons, state, RuntimeConfig::default())
}

fn markers(count: u8, missing_icons: u8) -> Vec<Marker> {
    (0..count)
        .map(|i| {
            let icon = if i < missing_icons { "unknown" } else { "pin" };
            let offset = f64::from(i) * 0.01;
            Marker::new(icon, 49.843 + offset, 9.902 + offset).anchored_bottom()
        })
        .collect()
}

fn log_changes(changes: &mut broadcast::Receiver<MapStateChange>) {
    loop {
        match changes.try_recv() {
            Ok(change) => info!(?change, "state change"),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "missed state changes"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
