//! Actor system - accrues action points and runs each actor's state

use hecs::World;

use crate::components::{ActionPoints, Actor, Behavior, Carried, JobPreferences, Skills};
use crate::context::SimContext;
use crate::states::Agent;

/// Run every actor's state once, sequentially, in entity order.
pub fn actor_system(actors: &mut World, sim: &mut SimContext, delta: f32) {
    for (_, (actor, points, carried, preferences, skills, behavior)) in actors.query_mut::<(
        &mut Actor,
        &mut ActionPoints,
        &mut Carried,
        &JobPreferences,
        &mut Skills,
        &mut Behavior,
    )>() {
        points.accrue(delta);
        let mut agent = Agent {
            id: actor.id,
            actor,
            points,
            carried,
            preferences,
            skills,
        };
        behavior.update(&mut agent, sim, delta);
    }
}

/// Apply `f` to one actor's agent view and behavior.
pub(crate) fn with_agent<R>(
    actors: &mut World,
    entity: hecs::Entity,
    sim: &mut SimContext,
    f: impl FnOnce(&mut Behavior, &mut Agent, &mut SimContext) -> R,
) -> Option<R> {
    let (actor, points, carried, preferences, skills, behavior) = actors
        .query_one_mut::<(
            &mut Actor,
            &mut ActionPoints,
            &mut Carried,
            &JobPreferences,
            &mut Skills,
            &mut Behavior,
        )>(entity)
        .ok()?;
    let mut agent = Agent {
        id: actor.id,
        actor,
        points,
        carried,
        preferences,
        skills,
    };
    Some(f(behavior, &mut agent, sim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use colony_logic::{ActorId, TilePos, World as Grid};

    #[test]
    fn test_idle_actors_stay_in_bounds() {
        let mut sim = SimContext::new(Grid::new(4, 4, 1), SimConfig::default());
        let mut actors = World::new();
        for i in 0..3 {
            actors.spawn((
                Actor { id: ActorId(i), name: format!("a{}", i), tile: TilePos::new(i as i32, 0, 0) },
                ActionPoints::new(4.0, 8.0),
                Carried::new(10),
                JobPreferences::default(),
                Skills::default(),
                Behavior::default(),
            ));
        }
        for _ in 0..200 {
            sim.world.fast_update(0.1);
            actor_system(&mut actors, &mut sim, 0.1);
        }
        for (_, actor) in actors.query_mut::<&Actor>() {
            assert!(sim.world.in_bounds(actor.tile));
            assert!(sim.world.is_walkable(actor.tile));
        }
    }
}
