//! Sparse graph over walkable tiles.
//!
//! One node per tile with a non-zero calculated movement cost, with edges to
//! walkable orthogonal neighbours and to vertical neighbours through `Empty`
//! tiles. Edge weight is the destination's movement cost. With diagonal
//! movement enabled, diagonal edges cost √2 times as much and are omitted
//! where they would clip a blocked corner.

use std::collections::{BTreeSet, HashMap};

use crate::geometry::TilePos;
use crate::search::SearchGraph;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileEdge {
    pub to: TilePos,
    pub cost: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    pub pos: TilePos,
    pub edges: Vec<TileEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileGraph {
    nodes: HashMap<TilePos, TileNode>,
    /// World navigation version this graph reflects.
    version: u64,
    diagonal: bool,
}

impl TileGraph {
    /// Build from scratch, visiting tiles in z, y, x order.
    pub fn build(world: &World, diagonal: bool) -> Self {
        let mut nodes = HashMap::new();
        for tile in world.tiles() {
            if let Some(node) = Self::node_for(world, tile.pos, diagonal) {
                nodes.insert(tile.pos, node);
            }
        }
        log::debug!(target: "path", "built tile graph with {} nodes", nodes.len());
        Self {
            nodes,
            version: world.nav_version(),
            diagonal,
        }
    }

    fn node_for(world: &World, pos: TilePos, diagonal: bool) -> Option<TileNode> {
        if !world.is_walkable(pos) {
            return None;
        }
        let mut edges = Vec::new();
        for next in world.neighbors(pos, diagonal, true) {
            let mut cost = world.calculated_move_cost(next);
            if cost <= 0.0 {
                continue;
            }
            if pos.is_diagonal_to(next) {
                if world.is_clipping_corner(pos, next) {
                    continue;
                }
                cost *= std::f32::consts::SQRT_2;
            }
            edges.push(TileEdge { to: next, cost });
        }
        Some(TileNode { pos, edges })
    }

    /// Recompute the nodes around each changed tile: the tile itself, every
    /// horizontal neighbour (diagonals included, for corner clipping) and
    /// the tiles directly above and below.
    pub fn regenerate_around(&mut self, world: &World, changed: &[TilePos]) {
        let mut affected = BTreeSet::new();
        for &pos in changed {
            affected.insert(pos);
            affected.extend(pos.orthogonal());
            affected.extend(pos.diagonal());
            affected.insert(pos.above());
            affected.insert(pos.below());
        }
        for pos in affected.into_iter().filter(|p| world.in_bounds(*p)) {
            match Self::node_for(world, pos, self.diagonal) {
                Some(node) => {
                    self.nodes.insert(pos, node);
                }
                None => {
                    self.nodes.remove(&pos);
                }
            }
        }
        self.version = world.nav_version();
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn diagonal(&self) -> bool {
        self.diagonal
    }

    pub fn node(&self, pos: TilePos) -> Option<&TileNode> {
        self.nodes.get(&pos)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.edges.len()).sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TileNode> {
        self.nodes.values()
    }

    /// Whether `from` has an edge to `to`, and its cost.
    pub fn edge_cost(&self, from: TilePos, to: TilePos) -> Option<f32> {
        self.nodes
            .get(&from)?
            .edges
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.cost)
    }
}

impl SearchGraph for TileGraph {
    type Node = TilePos;

    fn contains(&self, node: TilePos) -> bool {
        self.nodes.contains_key(&node)
    }

    fn for_each_edge(&self, node: TilePos, mut visit: impl FnMut(TilePos, f32)) {
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
    use crate::tile::TileType;

    #[test]
    fn test_impassable_tiles_have_no_node() {
        let mut world = World::new(3, 3, 1);
        let wall = TilePos::new(1, 1, 0);
        world.place_structure(wall, Structure::wall());
        let graph = TileGraph::build(&world, false);
        assert_eq!(graph.node_count(), 8);
        assert!(!graph.contains(wall));
        assert!(graph.nodes().all(|n| n.edges.iter().all(|e| e.to != wall)));
    }

    #[test]
    fn test_edge_weight_is_destination_cost() {
        let mut world = World::new(2, 1, 1);
        world.set_tile_type(TilePos::new(1, 0, 0), TileType::Rough);
        let graph = TileGraph::build(&world, false);
        assert_eq!(graph.edge_cost(TilePos::new(0, 0, 0), TilePos::new(1, 0, 0)), Some(2.0));
        assert_eq!(graph.edge_cost(TilePos::new(1, 0, 0), TilePos::new(0, 0, 0)), Some(1.0));
    }

    #[test]
    fn test_degenerate_world_builds_empty_graph() {
        let world = World::filled(3, 3, 1, TileType::Solid);
        let graph = TileGraph::build(&world, false);
        assert_eq!(graph.node_count(), 0);
        let empty = World::new(0, 0, 0);
        assert_eq!(TileGraph::build(&empty, false).node_count(), 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut world = World::new(6, 6, 2);
        world.place_structure(TilePos::new(2, 2, 0), Structure::wall());
        world.set_tile_type(TilePos::new(4, 4, 1), TileType::Empty);
        let a = TileGraph::build(&world, true);
        let b = TileGraph::build(&world, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_diagonals_skip_clipped_corners() {
        let mut world = World::new(3, 3, 1);
        world.place_structure(TilePos::new(1, 0, 0), Structure::wall());
        let graph = TileGraph::build(&world, true);
        let origin = TilePos::new(0, 0, 0);
        assert_eq!(graph.edge_cost(origin, TilePos::new(1, 1, 0)), None);
        let cost = graph
            .edge_cost(TilePos::new(0, 1, 0), TilePos::new(1, 2, 0))
            .unwrap();
        assert!((cost - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_edges_through_empty() {
        let mut world = World::new(2, 2, 2);
        let low = TilePos::new(0, 0, 0);
        world.set_tile_type(low.above(), TileType::Empty);
        let graph = TileGraph::build(&world, false);
        assert!(graph.edge_cost(low, low.above()).is_some());
        assert!(graph.edge_cost(low.above(), low).is_some());
    }

    #[test]
    fn test_regeneration_matches_full_rebuild() {
        let mut world = World::new(6, 6, 2);
        let mut graph = TileGraph::build(&world, true);
        let v = world.nav_version();
        world.place_structure(TilePos::new(3, 3, 0), Structure::wall());
        world.set_tile_type(TilePos::new(1, 1, 1), TileType::Empty);
        world.set_tile_type(TilePos::new(5, 0, 0), TileType::Rough);
        let changed = world.changes_since(v).unwrap();
        graph.regenerate_around(&world, &changed);
        assert_eq!(graph, TileGraph::build(&world, true));
    }
}
