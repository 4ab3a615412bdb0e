//! Scenario-based testing framework.
//!
//! A scenario is an initial map state, a simulated engine configuration and
//! a list of [`Step`]s: view writes, attach/detach, and engine-side input.
//! Every scenario must end in an oracle that checks the final [`World`].
//!
//! ```text
//! Scenario::new("name")
//!     .state(..).engine(..).icons(..)
//!     .step(Step::Attach(..))
//!     .step(Step::UserPan(..))
//!     .oracle(..)        <- mandatory
//!     .run()
//! ```
//!
//! Engine events are pumped after every step, so each step observes the
//! consequences of the previous one.

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario, Step};
pub use world::{SimRuntime, StepError, World};

/// Oracle verifying the final world.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
