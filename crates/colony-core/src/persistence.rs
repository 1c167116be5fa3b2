//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for binary serialization of the grid, the job queue and
//! every actor. Actor components are serialized individually and the
//! entities respawned under their original ids on load. Running states
//! are not saved; loaded actors start without one.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

use colony_logic::World as Grid;

use crate::components::*;
use crate::engine::SimulationEngine;
use crate::jobs::JobSnapshot;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Simulation time in AUT
    pub sim_time: f64,
    /// Time scale
    pub time_scale: f32,
    /// Tiles, structures, inventory and rooms
    pub world: Grid,
    /// Every queued job
    pub jobs: Vec<JobSnapshot>,
    pub next_job_id: u64,
    /// All actors with their components
    pub actors: Vec<ActorSnapshot>,
}

/// One actor's components
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActorSnapshot {
    /// Entity bits the actor id was derived from
    pub entity: u64,
    pub actor: Actor,
    pub points: ActionPoints,
    pub carried: Carried,
    pub preferences: JobPreferences,
    pub skills: Skills,
}

/// Extract all actors from a world into serializable form
fn serialize_actors(world: &World) -> Vec<ActorSnapshot> {
    let mut query = world.query::<(&Actor, &ActionPoints, &Carried, &JobPreferences, &Skills)>();
    query
        .iter()
        .map(|(entity, (actor, points, carried, preferences, skills))| ActorSnapshot {
            entity: entity.to_bits().get(),
            actor: actor.clone(),
            points: *points,
            carried: carried.clone(),
            preferences: preferences.clone(),
            skills: skills.clone(),
        })
        .collect()
}

/// Rebuild the actor world, keeping each actor on its saved entity.
fn deserialize_actors(actors: Vec<ActorSnapshot>) -> Result<World, SaveError> {
    let mut world = World::new();
    for snapshot in actors {
        let entity =
            Entity::from_bits(snapshot.entity).ok_or(SaveError::BadEntity(snapshot.entity))?;
        world.spawn_at(
            entity,
            (
                snapshot.actor,
                snapshot.points,
                snapshot.carried,
                snapshot.preferences,
                snapshot.skills,
                Behavior::default(),
            ),
        );
    }
    Ok(world)
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(writer: W, engine: &SimulationEngine) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time: engine.sim_time,
        time_scale: engine.time_scale(),
        world: engine.ctx.world.clone(),
        jobs: engine.ctx.jobs.snapshots(),
        next_job_id: engine.ctx.jobs.next_id(),
        actors: serialize_actors(&engine.actors),
    };

    bincode::serialize_into(writer, &save_data)?;
    log::debug!(
        target: "engine",
        "saved {} actors, {} jobs",
        save_data.actors.len(),
        save_data.jobs.len()
    );
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = save_data.world;
    world.rebuild_indexes();

    Ok(LoadedSimulation {
        world,
        sim_time: save_data.sim_time,
        time_scale: save_data.time_scale,
        jobs: save_data.jobs,
        next_job_id: save_data.next_job_id,
        actors: deserialize_actors(save_data.actors)?,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub world: Grid,
    pub sim_time: f64,
    pub time_scale: f32,
    pub jobs: Vec<JobSnapshot>,
    pub next_job_id: u64,
    pub actors: World,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("Invalid actor entity bits {0:#x}")]
    BadEntity(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobTemplate;
    use colony_logic::{Inventory, TilePos};

    fn colony() -> SimulationEngine {
        let mut grid = Grid::new(10, 10, 1);
        grid.place_inventory(TilePos::new(8, 8, 0), Inventory::new("Wood", 20, 50));
        let mut engine = SimulationEngine::with_default_config(grid);
        engine.spawn_actor("Ada", TilePos::new(1, 1, 0));
        engine.spawn_actor("Bo", TilePos::new(2, 1, 0));
        engine.enqueue_job(
            &JobTemplate::construct("Wall").require("Wood", 5, 5).cost(3.0),
            TilePos::new(5, 5, 0),
        );
        engine
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut engine = colony();

        // Run a few updates
        for _ in 0..10 {
            engine.update(0.1);
        }

        let original_time = engine.sim_time;
        let original_ids = engine.actor_ids();
        let original_jobs = engine.ctx.jobs.snapshots();

        // Save
        let mut save_buffer = Vec::new();
        engine.save(&mut save_buffer).expect("Save failed");

        // Load into new engine
        let mut loaded_engine = SimulationEngine::with_default_config(Grid::new(1, 1, 1));
        loaded_engine.load(&save_buffer[..]).expect("Load failed");

        // Verify
        assert!((loaded_engine.sim_time - original_time).abs() < 0.001);
        let mut loaded_ids = loaded_engine.actor_ids();
        let mut expected_ids = original_ids.clone();
        loaded_ids.sort();
        expected_ids.sort();
        assert_eq!(loaded_ids, expected_ids);
        for id in original_ids {
            assert_eq!(loaded_engine.actor(id), engine.actor(id));
            assert_eq!(loaded_engine.carried(id), engine.carried(id));
            assert_eq!(loaded_engine.state_name(id), None);
        }
        assert_eq!(loaded_engine.ctx.jobs.snapshots().len(), original_jobs.len());
        assert_eq!(loaded_engine.grid().width(), 10);
    }

    #[test]
    fn test_loaded_colony_keeps_running() {
        let engine = colony();
        let mut buffer = Vec::new();
        engine.save(&mut buffer).unwrap();

        let mut loaded = SimulationEngine::with_default_config(Grid::new(1, 1, 1));
        loaded.load(&buffer[..]).unwrap();
        for _ in 0..600 {
            loaded.update(0.1);
        }
        assert_eq!(loaded.job_count(), 0);
        assert!(loaded.grid().structure_at(TilePos::new(5, 5, 0)).is_some());
    }

    #[test]
    fn test_version_mismatch() {
        let engine = colony();
        let mut buffer = Vec::new();
        engine.save(&mut buffer).unwrap();
        // The version is the first field, a little-endian u32.
        buffer[0] = 99;
        match load_simulation(&buffer[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
