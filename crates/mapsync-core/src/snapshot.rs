//! Saved-instance encoding of [`MapState`].
//!
//! Mobile hosts may kill the process while the map screen is in the
//! background and recreate the view later. The snapshot carries everything
//! the state holder owns: camera position, markers and both flags. The device
//! location is transient and the engine session is never saved.
//!
//! The encoding is CBOR. Decoding validates the version and the camera
//! position before handing back a state, so a corrupt blob cannot produce a
//! camera the engine would reject.

use serde::{Deserialize, Serialize};

use crate::{error::SnapshotError, geo::CameraPosition, marker::Marker, state::MapState};

/// Persistable form of a [`MapState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStateSnapshot {
    version: u8,
    position: CameraPosition,
    markers: Vec<Marker>,
    location_enabled: bool,
    tracking_location: bool,
}

impl MapStateSnapshot {
    /// Format version written by this build.
    pub const VERSION: u8 = 1;

    /// Capture the state-owned fields of `state`.
    pub fn capture(state: &MapState) -> Self {
        Self {
            version: Self::VERSION,
            position: state.position(),
            markers: state.markers().to_vec(),
            location_enabled: state.is_location_enabled(),
            tracking_location: state.is_tracking_location(),
        }
    }

    /// Rebuild a state. The device location starts out unknown.
    pub fn restore(self) -> MapState {
        MapState::new(self.position)
            .with_markers(self.markers)
            .with_location_enabled(self.location_enabled)
            .with_tracking(self.tracking_location)
    }

    /// Encode as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode and validate CBOR bytes.
    ///
    /// # Errors
    ///
    /// - `Decode` if the bytes are not a snapshot
    /// - `UnsupportedVersion` if written by another format version
    /// - `InvalidPosition` if the camera position is out of range
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            ciborium::from_reader(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))?;

        if snapshot.version != Self::VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: Self::VERSION,
            });
        }

        validate_position(&snapshot.position)?;
        Ok(snapshot)
    }
}

fn validate_position(position: &CameraPosition) -> Result<(), SnapshotError> {
    if !position.is_finite() {
        return Err(SnapshotError::InvalidPosition { reason: "non-finite component" });
    }
    if !(-90.0..=90.0).contains(&position.latitude) {
        return Err(SnapshotError::InvalidPosition { reason: "latitude out of range" });
    }
    if position.zoom < 0.0 {
        return Err(SnapshotError::InvalidPosition { reason: "negative zoom" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::geo::Location;

    fn sample_state() -> MapState {
        MapState::new(CameraPosition::new(49.843, 9.902, 2.7))
            .with_markers(vec![
                Marker::new("pin", 49.843, 9.902).anchored_bottom(),
                Marker::new("avatar:@alice", 49.0, 9.0),
            ])
            .with_location_enabled(true)
            .with_tracking(true)
    }

    #[test]
    fn restores_state_owned_fields() {
        let state = sample_state();
        let bytes = MapStateSnapshot::capture(&state).to_cbor().unwrap();
        let restored = MapStateSnapshot::from_cbor(&bytes).unwrap().restore();
        assert_eq!(restored, state);
    }

    #[test]
    fn location_is_not_saved() {
        let mut bridge = crate::MapBridge::new(sample_state());
        let (session, _) = bridge.begin_attach(crate::SessionConfig::default()).unwrap();
        bridge.on_map_ready(session).unwrap();
        bridge.on_style_loaded(session).unwrap();
        bridge.on_camera_idle(
            session,
            CameraPosition::new(1.0, 1.0, 1.0),
            Some(Location::new(1.0, 1.0, 3.0)),
        );

        let restored = MapStateSnapshot::capture(bridge.state()).restore();
        assert_eq!(restored.location(), None);
        assert_eq!(restored.position(), CameraPosition::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn rejects_garbage() {
        let result = MapStateSnapshot::from_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn rejects_other_versions() {
        let mut snapshot = MapStateSnapshot::capture(&sample_state());
        snapshot.version = 9;
        let bytes = snapshot.to_cbor().unwrap();

        let result = MapStateSnapshot::from_cbor(&bytes);
        assert_eq!(result, Err(SnapshotError::UnsupportedVersion { found: 9, expected: 1 }));
    }

    #[test]
    fn rejects_invalid_positions() {
        let cases = [
            CameraPosition::new(f64::NAN, 0.0, 1.0),
            CameraPosition::new(0.0, f64::INFINITY, 1.0),
            CameraPosition::new(91.0, 0.0, 1.0),
            CameraPosition::new(0.0, 0.0, -1.0),
        ];

        for position in cases {
            let bytes = MapStateSnapshot::capture(&MapState::new(position)).to_cbor().unwrap();
            let result = MapStateSnapshot::from_cbor(&bytes);
            assert!(matches!(result, Err(SnapshotError::InvalidPosition { .. })), "{position:?}");
        }
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = MapStateSnapshot::from_cbor(&bytes);
        }
    }
}
