//! Arbitrary call sequences against the bridge state machine.
//!
//! Each input byte selects one call. Whatever the order, the bridge must
//! never panic and never hold more than one live session.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mapsync_core::{
    CameraPosition, MapBridge, MapState, Marker, SessionConfig, SessionId, SessionPhase,
};

fuzz_target!(|data: &[u8]| {
    let mut bridge = MapBridge::new(MapState::default());
    let mut last = SessionId::new(0);

    for &byte in data {
        let arg = byte >> 4;
        let session = SessionId::new(u64::from(arg % 3) + last.value().saturating_sub(1));

        match byte & 0x0f {
            0 => {
                if let Ok((session, _)) = bridge.begin_attach(SessionConfig::default()) {
                    last = session;
                }
            },
            1 => {
                let _ = bridge.on_map_ready(session);
            },
            2 => {
                let _ = bridge.on_style_loaded(session);
            },
            3 => {
                let _ = bridge.on_style_failed(session, "fuzz");
            },
            4 => {
                let _ = bridge.abort_attach(session);
            },
            5 => {
                bridge.detach();
            },
            6 => {
                let position = CameraPosition::new(f64::from(arg), -f64::from(arg), 1.0);
                bridge.on_camera_idle(session, position, None);
            },
            7 => {
                let _ = bridge.on_camera_mode_changed(session, u32::from(arg) * 4);
            },
            8 => {
                bridge.set_camera_position(CameraPosition::new(f64::from(arg), 0.0, 2.0));
            },
            9 => {
                bridge.set_tracking_enabled(arg % 2 == 0);
            },
            10 => {
                bridge.set_location_enabled(arg % 2 == 0);
            },
            _ => {
                let markers = (0..arg).map(|i| Marker::new("pin", f64::from(i), 0.0)).collect();
                bridge.set_markers(markers);
            },
        }

        match bridge.phase() {
            SessionPhase::Unattached => assert_eq!(bridge.attached_session(), None),
            SessionPhase::Attaching { session, .. } => assert_eq!(session, last),
            SessionPhase::Attached { session } => {
                assert_eq!(session, last);
                assert_eq!(bridge.attached_session(), Some(session));
            },
        }
    }
});
