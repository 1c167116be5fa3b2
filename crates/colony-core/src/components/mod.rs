//! Component definitions for the ECS simulation.
//!
//! Components are plain data attached to actor entities. Behavior lives in
//! the state machine and the systems that drive it.

mod actor;

pub use actor::*;
