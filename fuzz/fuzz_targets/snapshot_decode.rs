//! Saved-state decoding on arbitrary bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mapsync_core::MapStateSnapshot;

fuzz_target!(|data: &[u8]| {
    // Accepted input restores into a state that encodes and decodes again
    if let Ok(snapshot) = MapStateSnapshot::from_cbor(data) {
        let state = snapshot.restore();
        let encoded = MapStateSnapshot::capture(&state).to_cbor();
        let Ok(bytes) = encoded else {
            panic!("restored state failed to encode");
        };
        assert!(MapStateSnapshot::from_cbor(&bytes).is_ok());
    }
});
