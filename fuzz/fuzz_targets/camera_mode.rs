//! Raw camera mode to tracking flag.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mapsync_core::{CameraMode, camera_mode::tracking_flag};

fuzz_target!(|raw: u32| {
    match tracking_flag(raw) {
        Ok(tracking) => assert_eq!(CameraMode::for_tracking(tracking).to_raw(), raw),
        Err(_) => assert!(raw != CameraMode::None.to_raw() && raw != CameraMode::Tracking.to_raw()),
    }
});
