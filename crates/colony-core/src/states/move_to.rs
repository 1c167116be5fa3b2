use colony_logic::{Enterability, TilePath, TilePos};

use super::{Agent, Transition};
use crate::context::SimContext;

/// Walk a tile path, one tile per affordable step.
#[derive(Debug)]
pub struct MoveState {
    path: TilePath,
    destination: Option<TilePos>,
}

impl MoveState {
    pub fn new(path: TilePath) -> Self {
        let destination = path.destination();
        Self { path, destination }
    }

    pub fn destination(&self) -> Option<TilePos> {
        self.destination
    }

    pub fn remaining(&self) -> usize {
        self.path.len()
    }

    pub(super) fn enter(&mut self, agent: &mut Agent, _sim: &mut SimContext) {
        if self.path.front() == Some(agent.tile()) {
            self.path.pop_front();
        }
    }

    pub(super) fn update(&mut self, agent: &mut Agent, sim: &mut SimContext) -> Transition {
        loop {
            let Some(next) = self.path.front() else {
                return Transition::Finished;
            };
            let here = agent.tile();
            if next == here {
                self.path.pop_front();
                continue;
            }
            if !is_step(here, next) {
                // Knocked off the route; plan again from here.
                let Some(destination) = self.destination else {
                    return Transition::Abort;
                };
                self.path = sim.pathfinder.find_path_to_tile(&sim.world, here, destination, false);
                if self.path.is_empty() {
                    return Transition::Abort;
                }
                continue;
            }

            match sim.world.is_enterable(next) {
                Enterability::Never => {
                    log::debug!(target: "actors", "{}: path blocked at {}", agent.id, next);
                    return Transition::Abort;
                }
                Enterability::Soon => {
                    sim.world.request_passage(next);
                    return Transition::Continue;
                }
                Enterability::Yes => {}
            }

            let cost = sim.world.calculated_move_cost(next);
            if !agent.points.try_spend(cost) {
                return Transition::Continue;
            }
            agent.actor.tile = next;
            self.path.pop_front();
        }
    }
}

fn is_step(from: TilePos, to: TilePos) -> bool {
    let (dx, dy, dz) = ((to.x - from.x).abs(), (to.y - from.y).abs(), (to.z - from.z).abs());
    match dz {
        0 => dx <= 1 && dy <= 1 && dx + dy > 0,
        1 => dx == 0 && dy == 0,
        _ => false,
    }
}
