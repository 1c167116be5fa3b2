use colony_logic::goals::goal_dump_evaluator;

use super::{Agent, State, Transition};
use crate::context::SimContext;

/// Put down everything the actor carries: here if the tile takes it,
/// otherwise at the nearest tile that does. Stockpiles are never dump sites.
#[derive(Debug, Default)]
pub struct DumpState;

impl DumpState {
    pub(super) fn update(&mut self, agent: &mut Agent, sim: &mut SimContext) -> Transition {
        let Some(item_type) = agent.carried.item_type().map(str::to_string) else {
            return Transition::Finished;
        };
        let here = agent.tile();
        if goal_dump_evaluator(&sim.world, &item_type)(here) {
            if let Some(load) = agent.carried.take() {
                let rest = sim.world.place_inventory(here, load);
                agent.carried.restore(rest);
            }
            if agent.carried.is_empty() {
                log::debug!(target: "actors", "{}: dumped {} at {}", agent.id, item_type, here);
                return Transition::Finished;
            }
        }

        let path = sim
            .pathfinder
            .find_path_to_dump_inventory(&sim.world, here, &item_type);
        match path.destination() {
            Some(dest) if dest != here => Transition::Push(State::move_along(path)),
            _ => {
                log::warn!(target: "actors", "{}: nowhere to put {}", agent.id, item_type);
                Transition::Abort
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::states::{StateKind, TestBody};
    use colony_logic::{Inventory, Structure, TilePos, World};

    fn carrying(item: &str, amount: u32, tile: TilePos) -> TestBody {
        let mut body = TestBody::at(1, tile);
        assert!(body.carried.add(Inventory::new(item, amount, 50)).is_none());
        body
    }

    fn move_destination(transition: &Transition) -> Option<TilePos> {
        match transition {
            Transition::Push(State { kind: StateKind::Move(m), .. }) => m.destination(),
            _ => None,
        }
    }

    #[test]
    fn test_dumps_on_current_tile() {
        let mut sim = SimContext::new(World::new(4, 4, 1), SimConfig::default());
        let here = TilePos::new(1, 1, 0);
        let mut body = carrying("Wood", 5, here);

        let transition = DumpState.update(&mut body.agent(), &mut sim);
        assert!(matches!(transition, Transition::Finished));
        assert!(body.carried.is_empty());
        assert_eq!(sim.world.inventory_at(here).unwrap().stack_size, 5);
    }

    #[test]
    fn test_walks_off_a_foreign_stack() {
        let mut world = World::new(4, 4, 1);
        let here = TilePos::new(1, 1, 0);
        world.place_inventory(here, Inventory::new("Stone", 3, 50));
        let mut sim = SimContext::new(world, SimConfig::default());
        let mut body = carrying("Wood", 5, here);

        let transition = DumpState.update(&mut body.agent(), &mut sim);
        let dest = move_destination(&transition).expect("walks somewhere else");
        assert_ne!(dest, here);
        assert!(sim.world.can_accept_inventory(dest, "Wood"));
        assert_eq!(body.carried.amount(), 5);
    }

    #[test]
    fn test_never_dumps_on_a_stockpile() {
        let mut world = World::new(4, 4, 1);
        let here = TilePos::new(1, 1, 0);
        world.place_structure(here, Structure::stockpile());
        let mut sim = SimContext::new(world, SimConfig::default());
        let mut body = carrying("Wood", 5, here);

        let transition = DumpState.update(&mut body.agent(), &mut sim);
        let dest = move_destination(&transition).expect("walks off the stockpile");
        assert!(!sim.world.is_on_stockpile(dest));
        assert!(sim.world.inventory_at(here).is_none());
    }

    #[test]
    fn test_aborts_with_nowhere_to_go() {
        let mut world = World::new(1, 1, 1);
        let here = TilePos::new(0, 0, 0);
        world.place_inventory(here, Inventory::new("Stone", 3, 50));
        let mut sim = SimContext::new(world, SimConfig::default());
        let mut body = carrying("Wood", 5, here);

        let transition = DumpState.update(&mut body.agent(), &mut sim);
        assert!(matches!(transition, Transition::Abort));
        assert_eq!(body.carried.amount(), 5);
    }

    #[test]
    fn test_empty_hands_finish() {
        let mut sim = SimContext::new(World::new(2, 2, 1), SimConfig::default());
        let mut body = TestBody::at(1, TilePos::new(0, 0, 0));
        assert!(matches!(DumpState.update(&mut body.agent(), &mut sim), Transition::Finished));
    }
}
