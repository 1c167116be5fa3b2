//! Simulation engine - main entry point for running the simulation

use colony_logic::{ActorId, TilePos, World as Grid};
use hecs::World;

use crate::components::*;
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::jobs::{Job, JobEvent, JobId, JobTemplate};
use crate::states::State;
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    /// Grid, pathfinder, job queue, configuration and RNG
    pub ctx: SimContext,
    /// ECS world holding the actors
    pub actors: World,
    /// Simulation time in AUT
    pub sim_time: f64,
    /// Fast frames run so far
    frame: u64,
    /// AUT accumulated since the last slow update
    slow_accumulator: f32,
    time_scale: f32,
}

impl SimulationEngine {
    pub fn new(grid: Grid, config: SimConfig) -> Self {
        Self {
            ctx: SimContext::new(grid, config),
            actors: World::new(),
            sim_time: 0.0,
            frame: 0,
            slow_accumulator: 0.0,
            time_scale: 1.0,
        }
    }

    /// Engine over `grid` with the embedded default configuration.
    pub fn with_default_config(grid: Grid) -> Self {
        Self::new(grid, SimConfig::default())
    }

    pub fn config(&self) -> &SimConfig {
        &self.ctx.config
    }

    pub fn grid(&self) -> &Grid {
        &self.ctx.world
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.ctx.world
    }

    /// Advance the simulation by `delta_seconds` of wall time.
    pub fn update(&mut self, delta_seconds: f32) {
        let delta = delta_seconds * self.time_scale;
        if delta <= 0.0 {
            return;
        }
        self.sim_time += delta as f64;
        self.frame += 1;

        // Fast pass: doors and every actor.
        self.ctx.world.fast_update(delta);
        actor_system(&mut self.actors, &mut self.ctx, delta);
        self.dispatch_world_events();

        // Slow pass: growth and other structure behaviour.
        self.slow_accumulator += delta;
        let interval = u64::from(self.ctx.config.slow_update_frames.max(1));
        if self.frame % interval == 0 {
            let elapsed = std::mem::take(&mut self.slow_accumulator);
            log::trace!(target: "engine", "slow update after {:.2} AUT", elapsed);
            self.ctx.world.slow_update(elapsed);
            self.dispatch_world_events();
        }
    }

    /// Hand pending world events to the job queue and the harvest system.
    fn dispatch_world_events(&mut self) {
        let events = self.ctx.world.drain_events();
        if events.is_empty() {
            return;
        }
        self.ctx.jobs.handle_world_events(&events);
        harvest_system(&mut self.ctx, &events);
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ── Actors ─────────────────────────────────────────────────────────

    /// Spawn an actor accepting every configured job category at the top
    /// preference level.
    pub fn spawn_actor(&mut self, name: &str, tile: TilePos) -> ActorId {
        let preferences = JobPreferences::all(self.ctx.config.category_names(), 1);
        self.spawn_actor_with(name, tile, preferences)
    }

    pub fn spawn_actor_with(&mut self, name: &str, tile: TilePos, preferences: JobPreferences) -> ActorId {
        let config = &self.ctx.config;
        // The id comes from the entity, so reserve it before spawning.
        let entity = self.actors.reserve_entity();
        let id = actor_id(entity);
        self.actors.spawn_at(
            entity,
            (
                Actor {
                    id,
                    name: name.to_string(),
                    tile,
                },
                ActionPoints::new(config.action_point_rate, config.action_point_cap),
                Carried::new(config.carry_capacity),
                preferences,
                Skills::default(),
                Behavior::default(),
            ),
        );
        log::info!(target: "engine", "spawned {} '{}' at {}", id, name, tile);
        id
    }

    pub fn actor_count(&self) -> usize {
        self.actors.query::<&Actor>().iter().count()
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.query::<&Actor>().iter().map(|(_, a)| a.id).collect()
    }

    pub fn actor(&self, id: ActorId) -> Option<Actor> {
        let entity = entity_of(id)?;
        self.actors.get::<&Actor>(entity).ok().map(|a| (*a).clone())
    }

    pub fn actor_tile(&self, id: ActorId) -> Option<TilePos> {
        let entity = entity_of(id)?;
        self.actors.get::<&Actor>(entity).ok().map(|a| a.tile)
    }

    pub fn carried(&self, id: ActorId) -> Option<Carried> {
        let entity = entity_of(id)?;
        self.actors.get::<&Carried>(entity).ok().map(|c| (*c).clone())
    }

    pub fn skills(&self, id: ActorId) -> Option<Skills> {
        let entity = entity_of(id)?;
        self.actors.get::<&Skills>(entity).ok().map(|s| (*s).clone())
    }

    /// Name of the state the actor is running, if any.
    pub fn state_name(&self, id: ActorId) -> Option<&'static str> {
        let entity = entity_of(id)?;
        self.actors.get::<&Behavior>(entity).ok()?.current_name()
    }

    /// The job the actor is working toward, if any.
    pub fn current_job(&self, id: ActorId) -> Option<JobId> {
        let entity = entity_of(id)?;
        let behavior = self.actors.get::<&Behavior>(entity).ok()?;
        behavior.state.as_ref().and_then(State::job_id)
    }

    /// Interrupt the actor and start `state`.
    pub fn set_state(&mut self, id: ActorId, state: State) -> bool {
        self.with_actor(id, |behavior, agent, sim| behavior.set_state(state, agent, sim))
    }

    /// Run `state` after the actor's current chain.
    pub fn queue_state(&mut self, id: ActorId, state: State) -> bool {
        let Some(entity) = entity_of(id) else {
            return false;
        };
        match self.actors.get::<&mut Behavior>(entity) {
            Ok(mut behavior) => {
                behavior.queue_state(state);
                true
            }
            Err(_) => false,
        }
    }

    /// Interrupt the actor and have it take `job` next.
    pub fn prioritize_job(&mut self, id: ActorId, job: JobId) -> bool {
        self.with_actor(id, |behavior, agent, sim| behavior.prioritize_job(job, agent, sim))
    }

    /// Interrupt the actor, releasing its claims.
    pub fn interrupt_state(&mut self, id: ActorId) -> bool {
        self.with_actor(id, |behavior, agent, sim| behavior.interrupt(agent, sim))
    }

    fn with_actor(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut Behavior, &mut crate::states::Agent, &mut SimContext),
    ) -> bool {
        let Some(entity) = entity_of(id) else {
            return false;
        };
        with_agent(&mut self.actors, entity, &mut self.ctx, f).is_some()
    }

    // ── Jobs ───────────────────────────────────────────────────────────

    pub fn enqueue_job(&mut self, template: &JobTemplate, tile: TilePos) -> Option<JobId> {
        self.ctx.jobs.enqueue_template(&mut self.ctx.world, template, tile)
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.ctx.jobs.job(id)
    }

    pub fn job_count(&self) -> usize {
        self.ctx.jobs.len()
    }

    pub fn drain_job_events(&mut self) -> Vec<JobEvent> {
        self.ctx.jobs.drain_events()
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_simulation(writer, self)
    }

    /// Load simulation state from a reader. Actors come back without a
    /// state and pick up work on the next tick.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), crate::persistence::SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        self.ctx.world = loaded.world;
        self.ctx.world.set_claim_duration(self.ctx.config.claim_duration);
        self.ctx.pathfinder.invalidate();
        self.ctx.jobs.restore(loaded.jobs, loaded.next_job_id);
        self.sim_time = loaded.sim_time;
        self.time_scale = loaded.time_scale;
        self.actors = loaded.actors;

        // Reset update timers
        self.frame = 0;
        self.slow_accumulator = 0.0;

        log::info!(target: "engine", "loaded {} actors, {} jobs", self.actor_count(), self.job_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_logic::TilePath;

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::with_default_config(Grid::new(8, 8, 1));
        assert_eq!(engine.actor_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
    }

    #[test]
    fn test_time_scale() {
        let mut engine = SimulationEngine::with_default_config(Grid::new(8, 8, 1));
        engine.set_time_scale(2.0);
        engine.update(1.0);
        assert!((engine.sim_time() - 2.0).abs() < 1e-6);

        engine.set_time_scale(0.0);
        engine.update(1.0);
        assert!((engine.sim_time() - 2.0).abs() < 1e-6);
        assert_eq!(engine.frame(), 1);
    }

    #[test]
    fn test_spawned_actor_ids_resolve() {
        let mut engine = SimulationEngine::with_default_config(Grid::new(8, 8, 1));
        let a = engine.spawn_actor("Ada", TilePos::new(1, 1, 0));
        let b = engine.spawn_actor("Bo", TilePos::new(2, 1, 0));
        assert_ne!(a, b);
        let ada = engine.actor(a).unwrap();
        assert_eq!(ada.name, "Ada");
        assert_eq!(ada.id, a);
        assert_eq!(engine.carried(a).map(|c| c.capacity), Some(engine.config().carry_capacity));
        assert_eq!(engine.actor_tile(b), Some(TilePos::new(2, 1, 0)));
        assert_eq!(engine.actor_count(), 2);
        assert_eq!(entity_of(a).map(actor_id), Some(a));
    }

    #[test]
    fn test_prioritized_job_is_taken_first() {
        let mut engine = SimulationEngine::with_default_config(Grid::new(10, 10, 1));
        let actor = engine.spawn_actor("Ada", TilePos::new(0, 0, 0));
        let near = engine
            .enqueue_job(&JobTemplate::new("Sweep", "hauling").cost(100.0), TilePos::new(1, 0, 0))
            .unwrap();
        let far = engine
            .enqueue_job(&JobTemplate::new("Sort", "crafting").cost(100.0), TilePos::new(9, 9, 0))
            .unwrap();
        engine.update(0.1);
        assert_eq!(engine.current_job(actor), Some(near));

        assert!(engine.prioritize_job(actor, far));
        assert!(engine.job(near).unwrap().worker().is_none());
        engine.update(0.1);
        assert_eq!(engine.current_job(actor), Some(far));
        assert_eq!(engine.job(far).unwrap().worker(), Some(actor));
    }

    #[test]
    fn test_interrupt_releases_job() {
        let mut engine = SimulationEngine::with_default_config(Grid::new(10, 10, 1));
        let actor = engine.spawn_actor("Ada", TilePos::new(0, 0, 0));
        let job = engine
            .enqueue_job(&JobTemplate::new("Sweep", "hauling").cost(100.0), TilePos::new(5, 5, 0))
            .unwrap();
        engine.update(0.1);
        assert_eq!(engine.job(job).unwrap().worker(), Some(actor));
        assert!(engine.interrupt_state(actor));
        assert!(engine.job(job).unwrap().worker().is_none());
        assert_eq!(engine.state_name(actor), None);
    }

    #[test]
    fn test_queued_state_runs_next() {
        let mut engine = SimulationEngine::with_default_config(Grid::new(10, 10, 1));
        let actor = engine.spawn_actor_with("Ada", TilePos::new(0, 0, 0), JobPreferences::default());
        let path = TilePath::new([TilePos::new(0, 0, 0), TilePos::new(1, 0, 0)], 1.0);
        assert!(engine.queue_state(actor, State::move_along(path)));
        engine.update(0.5);
        assert_eq!(engine.actor_tile(actor), Some(TilePos::new(1, 0, 0)));
    }
}
