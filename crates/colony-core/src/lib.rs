//! Colony Core - Actor and Job Simulation Engine
//!
//! Runs a colony of actors over the tile world from `colony-logic`. Actors
//! take jobs from a prioritized queue, haul the materials those jobs need,
//! walk to their sites and work them to completion.
//!
//! # Architecture
//!
//! Actors live in an Entity Component System (ECS) world via `hecs`:
//! - **Entities**: Actors
//! - **Components**: Pure data attached to actors (ActionPoints, Carried, Skills, etc.)
//! - **States**: A chain of behaviour states per actor (Idle, Job, Move, Haul, Dump)
//! - **Systems**: Logic that queries and updates components each tick
//!
//! The grid, pathfinder and job queue sit beside the ECS in a [`context::SimContext`].
//!
//! # Example
//!
//! ```rust,no_run
//! use colony_core::prelude::*;
//! use colony_logic::{TilePos, World};
//!
//! let mut engine = SimulationEngine::with_default_config(World::new(32, 32, 1));
//! engine.spawn_actor("Ada", TilePos::new(1, 1, 0));
//! engine.enqueue_job(&JobTemplate::construct("Wall"), TilePos::new(10, 10, 0));
//!
//! // Run simulation
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod config;
pub mod context;
pub mod engine;
pub mod jobs;
pub mod observers;
pub mod persistence;
pub mod states;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::engine::SimulationEngine;
    pub use crate::jobs::{Job, JobId, JobPriority, JobTemplate};
    pub use crate::states::State;
}
