//! Engine camera modes.
//!
//! Raw values match the MapLibre `CameraMode` constants, which is what the
//! engine's mode-changed callback reports. The bridge only ever sets
//! [`CameraMode::None`] or [`CameraMode::Tracking`], so those are the only
//! two values that map onto the tracking flag. Anything else reaching the
//! bridge means the engine and the bridge disagree about who owns the
//! camera, and is reported as [`BridgeError::UnexpectedCameraMode`].

use crate::error::BridgeError;

/// Camera mode of the engine's location component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// Camera does not follow the device
    None,
    /// Not following, bearing follows the compass
    NoneCompass,
    /// Not following, bearing follows the GPS course
    NoneGps,
    /// Camera follows the device location
    Tracking,
    /// Following, bearing follows the compass
    TrackingCompass,
    /// Following, bearing follows the GPS course
    TrackingGps,
    /// Following with bearing locked north
    TrackingGpsNorth,
}

impl CameraMode {
    /// Raw engine value.
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::None => 8,
            Self::NoneCompass => 16,
            Self::NoneGps => 22,
            Self::Tracking => 24,
            Self::TrackingCompass => 32,
            Self::TrackingGps => 34,
            Self::TrackingGpsNorth => 36,
        }
    }

    /// Parse a raw engine value.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            8 => Some(Self::None),
            16 => Some(Self::NoneCompass),
            22 => Some(Self::NoneGps),
            24 => Some(Self::Tracking),
            32 => Some(Self::TrackingCompass),
            34 => Some(Self::TrackingGps),
            36 => Some(Self::TrackingGpsNorth),
            _ => None,
        }
    }

    /// Mode the bridge requests for a tracking flag.
    pub const fn for_tracking(tracking: bool) -> Self {
        if tracking { Self::Tracking } else { Self::None }
    }
}

/// Collapse a raw engine camera mode into the tracking flag.
///
/// # Errors
///
/// Returns `UnexpectedCameraMode` for any value other than `NONE` or
/// `TRACKING`, including values that are valid engine modes.
pub fn tracking_flag(raw: u32) -> Result<bool, BridgeError> {
    match CameraMode::from_raw(raw) {
        Some(CameraMode::Tracking) => Ok(true),
        Some(CameraMode::None) => Ok(false),
        _ => Err(BridgeError::UnexpectedCameraMode { raw }),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ALL: [CameraMode; 7] = [
        CameraMode::None,
        CameraMode::NoneCompass,
        CameraMode::NoneGps,
        CameraMode::Tracking,
        CameraMode::TrackingCompass,
        CameraMode::TrackingGps,
        CameraMode::TrackingGpsNorth,
    ];

    #[test]
    fn raw_values_match_engine_constants() {
        assert_eq!(CameraMode::None.to_raw(), 8);
        assert_eq!(CameraMode::Tracking.to_raw(), 24);
        for mode in ALL {
            assert_eq!(CameraMode::from_raw(mode.to_raw()), Some(mode));
        }
    }

    #[test]
    fn tracking_and_none_map_to_flag() {
        assert_eq!(tracking_flag(24), Ok(true));
        assert_eq!(tracking_flag(8), Ok(false));
    }

    #[test]
    fn other_engine_modes_are_contract_violations() {
        for mode in [CameraMode::TrackingGps, CameraMode::NoneCompass] {
            let raw = mode.to_raw();
            assert_eq!(tracking_flag(raw), Err(BridgeError::UnexpectedCameraMode { raw }));
        }
    }

    #[test]
    fn for_tracking_round_trips_through_flag() {
        for tracking in [true, false] {
            let raw = CameraMode::for_tracking(tracking).to_raw();
            assert_eq!(tracking_flag(raw), Ok(tracking));
        }
    }

    proptest! {
        #[test]
        fn only_two_raw_values_are_accepted(raw in any::<u32>()) {
            let result = tracking_flag(raw);
            prop_assert_eq!(result.is_ok(), raw == 8 || raw == 24);
        }
    }
}
