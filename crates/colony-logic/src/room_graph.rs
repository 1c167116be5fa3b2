//! Room-level navigation graph.
//!
//! One node per room, outside included. An edge `a -> b` exists for every
//! exit tile (a door, or any other enclosing structure that can be walked
//! through) with room `a` on one side and room `b` on another. Entering a
//! room costs its tile count; entering outside costs the whole world volume,
//! so routes only go outdoors when nothing else connects.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::TilePos;
use crate::ids::RoomId;
use crate::search::SearchGraph;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomEdge {
    pub to: RoomId,
    pub exit: TilePos,
    pub cost: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomNode {
    pub id: RoomId,
    pub edges: Vec<RoomEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomGraph {
    nodes: BTreeMap<RoomId, RoomNode>,
    /// World room version this graph reflects.
    version: u64,
}

/// Cost of entering a room.
pub fn room_weight(world: &World, id: RoomId) -> f32 {
    if id.is_outside() {
        return world.volume() as f32;
    }
    world.room(id).map(|r| r.tile_count() as f32).unwrap_or(f32::INFINITY)
}

impl RoomGraph {
    pub fn build(world: &World) -> Self {
        let mut nodes: BTreeMap<RoomId, RoomNode> = world
            .rooms()
            .ids()
            .map(|id| (id, RoomNode { id, edges: Vec::new() }))
            .collect();

        for exit in world.structures().filter(|s| s.is_exit()) {
            let sides: BTreeSet<RoomId> = exit
                .tile
                .orthogonal()
                .iter()
                .filter_map(|p| world.room_of(*p))
                .collect();
            for &from in &sides {
                for &to in &sides {
                    if from == to {
                        continue;
                    }
                    if let Some(node) = nodes.get_mut(&from) {
                        node.edges.push(RoomEdge {
                            to,
                            exit: exit.tile,
                            cost: room_weight(world, to),
                        });
                    }
                }
            }
        }

        log::debug!(target: "path", "built room graph with {} rooms", nodes.len());
        Self {
            nodes,
            version: world.room_version(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node(&self, id: RoomId) -> Option<&RoomNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Exit tiles leading from `from` directly into `to`.
    pub fn exits_between(&self, from: RoomId, to: RoomId) -> impl Iterator<Item = TilePos> + '_ {
        self.nodes
            .get(&from)
            .into_iter()
            .flat_map(|n| n.edges.iter())
            .filter(move |e| e.to == to)
            .map(|e| e.exit)
    }

    /// Whether two rooms share an exit.
    pub fn are_adjacent(&self, a: RoomId, b: RoomId) -> bool {
        self.exits_between(a, b).next().is_some()
    }
}

impl SearchGraph for RoomGraph {
    type Node = RoomId;

    fn contains(&self, node: RoomId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn for_each_edge(&self, node: RoomId, mut visit: impl FnMut(RoomId, f32)) {
        if let Some(n) = self.nodes.get(&node) {
            for edge in &n.edges {
                visit(edge.to, edge.cost);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;

    /// 3×3 room (interior 2..=4) with a door at (3, 1) to the outside.
    fn room_with_door() -> World {
        let mut world = World::new(7, 7, 1);
        for i in 1..=5 {
            for (x, y) in [(i, 1), (i, 5), (1, i), (5, i)] {
                let structure = if (x, y) == (3, 1) {
                    Structure::door()
                } else {
                    Structure::wall()
                };
                world.place_structure(TilePos::new(x, y, 0), structure);
            }
        }
        world
    }

    #[test]
    fn test_door_links_room_and_outside() {
        let world = room_with_door();
        let graph = RoomGraph::build(&world);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.are_adjacent(inside, RoomId::OUTSIDE));
        assert!(graph.are_adjacent(RoomId::OUTSIDE, inside));
        assert_eq!(
            graph.exits_between(inside, RoomId::OUTSIDE).collect::<Vec<_>>(),
            vec![TilePos::new(3, 1, 0)]
        );
    }

    #[test]
    fn test_entering_outside_costs_world_volume() {
        let world = room_with_door();
        let graph = RoomGraph::build(&world);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        let edge = graph.node(inside).unwrap().edges[0];
        assert_eq!(edge.cost, 49.0);
        let back = graph.node(RoomId::OUTSIDE).unwrap().edges[0];
        assert_eq!(back.cost, 9.0);
    }

    #[test]
    fn test_walls_do_not_connect() {
        let mut world = room_with_door();
        let door = world.structure_at(TilePos::new(3, 1, 0)).unwrap().id;
        world.remove_structure(door);
        world.place_structure(TilePos::new(3, 1, 0), Structure::wall());
        let graph = RoomGraph::build(&world);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        assert!(!graph.are_adjacent(inside, RoomId::OUTSIDE));
    }
}
