//! Reusable oracles.

use mapsync_core::CameraPosition;

use crate::scenario::{OracleFn, World};

/// All oracles must pass. Reports the first failure.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &World| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}

/// No step failed.
pub fn no_errors() -> OracleFn {
    Box::new(|world: &World| match world.errors() {
        [] => Ok(()),
        errors => Err(format!("{} step(s) failed: {errors:?}", errors.len())),
    })
}

/// A session is attached.
pub fn attached() -> OracleFn {
    Box::new(|world: &World| {
        if world.phase().is_attached() {
            Ok(())
        } else {
            Err(format!("expected an attached session, phase is {}", world.phase()))
        }
    })
}

/// No session is attached or attaching.
pub fn unattached() -> OracleFn {
    Box::new(|world: &World| match world.phase().session() {
        None => Ok(()),
        Some(_) => Err(format!("expected no session, phase is {}", world.phase())),
    })
}

/// The state holds exactly `expected` as camera position.
pub fn position_is(expected: CameraPosition) -> OracleFn {
    Box::new(move |world: &World| {
        let actual = world.state().position();
        if actual == expected {
            Ok(())
        } else {
            Err(format!("position {actual:?}, expected {expected:?}"))
        }
    })
}

/// The latest session draws one annotation per marker in the state.
pub fn markers_drawn() -> OracleFn {
    Box::new(|world: &World| {
        let drawn = world.annotations().len();
        let wanted = world.state().markers().len();
        if drawn == wanted {
            Ok(())
        } else {
            Err(format!("{drawn} annotation(s) drawn for {wanted} marker(s)"))
        }
    })
}
