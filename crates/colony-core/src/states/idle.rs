use colony_logic::{Enterability, TilePath};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Agent, State, Transition};
use crate::context::SimContext;

/// Dwell for a random time, checking for work now and then, then wander
/// one tile.
#[derive(Debug, Default)]
pub struct IdleState {
    dwell: f32,
    search_timer: f32,
}

impl IdleState {
    pub(super) fn enter(&mut self, _agent: &mut Agent, sim: &mut SimContext) {
        let (min, max) = (sim.config.idle_dwell_min, sim.config.idle_dwell_max);
        self.dwell = if max > min {
            sim.rng.gen_range(min..=max)
        } else {
            min
        };
        self.search_timer = sim.config.job_search_interval;
    }

    pub(super) fn update(&mut self, agent: &mut Agent, sim: &mut SimContext, delta: f32) -> Transition {
        self.search_timer -= delta;
        if self.search_timer <= 0.0 {
            self.search_timer = sim.config.job_search_interval;
            let applicant = agent.applicant();
            if let Some(job) = sim.jobs.get_job(&sim.world, &mut sim.pathfinder, &applicant) {
                return Transition::Switch(State::job(job));
            }
        }

        self.dwell -= delta;
        if self.dwell > 0.0 {
            return Transition::Continue;
        }

        let here = agent.tile();
        let neighbours = sim.world.neighbors(here, sim.config.diagonal_movement, true);
        let Some(&target) = neighbours.choose(&mut sim.rng) else {
            return Transition::Switch(State::idle());
        };
        if sim.world.is_enterable(target) == Enterability::Never
            || sim.world.is_clipping_corner(here, target)
        {
            return Transition::Switch(State::idle());
        }
        let cost = sim.world.calculated_move_cost(target);
        Transition::Switch(State::move_along(TilePath::new([here, target], cost)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::components::{ActionPoints, Actor, Carried, JobPreferences, Skills};
    use crate::states::StateKind;
    use colony_logic::{ActorId, Structure, TilePos, World};

    #[test]
    fn test_boxed_in_actor_re_idles() {
        let mut world = World::new(3, 3, 1);
        for p in TilePos::new(1, 1, 0).orthogonal() {
            world.place_structure(p, Structure::wall());
        }
        let mut sim = SimContext::new(world, SimConfig::default());
        let mut actor = Actor { id: ActorId(1), name: "a".into(), tile: TilePos::new(1, 1, 0) };
        let mut points = ActionPoints::new(4.0, 8.0);
        let mut carried = Carried::new(10);
        let prefs = JobPreferences::default();
        let mut skills = Skills::default();
        let mut agent = Agent {
            id: ActorId(1),
            actor: &mut actor,
            points: &mut points,
            carried: &mut carried,
            preferences: &prefs,
            skills: &mut skills,
        };

        let mut idle = IdleState::default();
        idle.enter(&mut agent, &mut sim);
        assert!(idle.dwell >= 1.0 && idle.dwell <= 4.0);
        let transition = idle.update(&mut agent, &mut sim, 10.0);
        assert!(matches!(
            transition,
            Transition::Switch(State { kind: StateKind::Idle(_), .. })
        ));
    }
}
