//! Everything a state or system needs, passed explicitly.

use colony_logic::{Pathfinder, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimConfig;
use crate::jobs::JobManager;

pub struct SimContext {
    pub world: World,
    pub pathfinder: Pathfinder,
    pub jobs: JobManager,
    pub config: SimConfig,
    pub rng: StdRng,
}

impl SimContext {
    pub fn new(mut world: World, config: SimConfig) -> Self {
        world.set_claim_duration(config.claim_duration);
        Self {
            pathfinder: Pathfinder::new(config.diagonal_movement),
            jobs: JobManager::new(&config),
            rng: StdRng::seed_from_u64(config.seed),
            world,
            config,
        }
    }
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("world", &(self.world.width(), self.world.height(), self.world.depth()))
            .field("jobs", &self.jobs)
            .finish()
    }
}
