//! Pathfinding facade over the tile and room graphs.
//!
//! The pathfinder owns both graph caches and refreshes them against the
//! world's version counters at the start of every query, so no search ever
//! runs on a stale graph. Small batches of tile changes regenerate only the
//! affected nodes; anything the world's change log no longer covers triggers
//! a full rebuild.
//!
//! "Find the nearest X" queries route at room granularity first, then run a
//! single tile search to the closest candidate in the destination room. If
//! the room route fails, a tile-level Dijkstra over the whole graph is the
//! fallback.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::geometry::TilePos;
use crate::goals::{
    goal_dump_evaluator, goal_has_room_evaluator, goal_inventory_evaluator, goal_room_evaluator,
    goal_structure_evaluator, goal_tile_evaluator, manhattan_heuristic, zero_heuristic,
};
use crate::ids::RoomId;
use crate::room_graph::RoomGraph;
use crate::search::{astar, dijkstra, SearchGraph, SearchOutcome, SearchResult};
use crate::tile_graph::TileGraph;
use crate::world::World;

/// More changed tiles than this and a full rebuild is cheaper.
const MAX_INCREMENTAL_CHANGES: usize = 32;

/// A tile route. Includes the start tile; empty when no route exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePath {
    tiles: VecDeque<TilePos>,
    cost: f32,
}

impl TilePath {
    pub fn new(tiles: impl IntoIterator<Item = TilePos>, cost: f32) -> Self {
        Self {
            tiles: tiles.into_iter().collect(),
            cost,
        }
    }

    fn from_search(result: SearchResult<TilePos>) -> Self {
        if result.is_found() {
            Self::new(result.path, result.cost)
        } else {
            Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Total edge cost from the first tile to the last.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn start(&self) -> Option<TilePos> {
        self.tiles.front().copied()
    }

    pub fn destination(&self) -> Option<TilePos> {
        self.tiles.back().copied()
    }

    pub fn front(&self) -> Option<TilePos> {
        self.tiles.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<TilePos> {
        self.tiles.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<TilePos> {
        self.tiles.iter().copied().collect()
    }
}

/// Cached graphs plus the queries built on them.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    tiles: Option<TileGraph>,
    rooms: Option<RoomGraph>,
    diagonal: bool,
}

impl Pathfinder {
    pub fn new(diagonal: bool) -> Self {
        Self {
            tiles: None,
            rooms: None,
            diagonal,
        }
    }

    /// Bring both graphs up to date with `world`.
    pub fn refresh(&mut self, world: &World) {
        let nav_version = world.nav_version();
        match &mut self.tiles {
            Some(graph) if graph.version() == nav_version => {}
            Some(graph) => match world.changes_since(graph.version()) {
                Some(changed) if changed.len() <= MAX_INCREMENTAL_CHANGES => {
                    log::trace!(target: "path", "regenerating tile graph around {} tiles", changed.len());
                    graph.regenerate_around(world, &changed);
                }
                _ => *graph = TileGraph::build(world, self.diagonal),
            },
            None => self.tiles = Some(TileGraph::build(world, self.diagonal)),
        }

        let room_version = world.room_version();
        if self.rooms.as_ref().map(|g| g.version()) != Some(room_version) {
            self.rooms = Some(RoomGraph::build(world));
        }
    }

    /// Drop both caches; the next query rebuilds them.
    pub fn invalidate(&mut self) {
        self.tiles = None;
        self.rooms = None;
    }

    pub fn tile_graph(&mut self, world: &World) -> &TileGraph {
        self.refresh(world);
        self.tiles.get_or_insert_with(|| TileGraph::build(world, self.diagonal))
    }

    pub fn room_graph(&mut self, world: &World) -> &RoomGraph {
        self.refresh(world);
        self.rooms.get_or_insert_with(|| RoomGraph::build(world))
    }

    fn graphs(&mut self, world: &World) -> (&TileGraph, &RoomGraph) {
        self.refresh(world);
        let diagonal = self.diagonal;
        let tiles = self.tiles.get_or_insert_with(|| TileGraph::build(world, diagonal));
        let rooms = self.rooms.get_or_insert_with(|| RoomGraph::build(world));
        (tiles, rooms)
    }

    // ── Tile queries ───────────────────────────────────────────────────

    /// Route from `start` to `target`, or next to it with `adjacent`.
    pub fn find_path_to_tile(
        &mut self,
        world: &World,
        start: TilePos,
        target: TilePos,
        adjacent: bool,
    ) -> TilePath {
        let (graph, _) = self.graphs(world);
        if !adjacent && !graph.contains(target) {
            log::error!(target: "path", "goal {} is not in the tile graph", target);
            return TilePath::default();
        }
        let result = astar(
            graph,
            start,
            goal_tile_evaluator(world, target, adjacent),
            manhattan_heuristic(target),
            None,
        );
        log_result("tile", start, &result);
        TilePath::from_search(result)
    }

    /// Cost of the cheapest route to `target`, or `f32::INFINITY` when there
    /// is none within `budget`.
    pub fn find_min_path_time(
        &mut self,
        world: &World,
        start: TilePos,
        target: TilePos,
        adjacent: bool,
        budget: Option<f32>,
    ) -> f32 {
        let (graph, _) = self.graphs(world);
        if !adjacent && !graph.contains(target) {
            return f32::INFINITY;
        }
        let result = astar(
            graph,
            start,
            goal_tile_evaluator(world, target, adjacent),
            manhattan_heuristic(target),
            budget,
        );
        if result.is_found() {
            result.cost
        } else {
            f32::INFINITY
        }
    }

    /// Route to the nearest pickable stack of any of `item_types`.
    pub fn find_path_to_inventory(
        &mut self,
        world: &World,
        start: TilePos,
        item_types: &[&str],
        can_take_from_stockpile: bool,
    ) -> TilePath {
        if item_types.is_empty() {
            return TilePath::default();
        }
        let candidates: Vec<TilePos> = item_types
            .iter()
            .flat_map(|t| world.tiles_with_inventory(t))
            .filter(|p| world.can_pick_up_from(*p, can_take_from_stockpile))
            .collect();
        if candidates.is_empty() {
            log::debug!(target: "path", "no pickable {:?} anywhere", item_types);
            return TilePath::default();
        }

        let (graph, rooms) = self.graphs(world);
        if let Some(path) = route_via_rooms(world, graph, rooms, start, &candidates) {
            return path;
        }

        log::debug!(target: "path", "room route to {:?} failed, falling back to tile search", item_types);
        let result = dijkstra(
            graph,
            start,
            goal_inventory_evaluator(world, item_types, can_take_from_stockpile),
            None,
        );
        log_result("inventory", start, &result);
        TilePath::from_search(result)
    }

    /// Route to the nearest structure of `kind`.
    pub fn find_path_to_structure(&mut self, world: &World, start: TilePos, kind: &str) -> TilePath {
        let (graph, _) = self.graphs(world);
        let result = dijkstra(graph, start, goal_structure_evaluator(world, kind), None);
        log_result("structure", start, &result);
        TilePath::from_search(result)
    }

    /// Route to the nearest tile that can take items of `item_type`.
    pub fn find_path_to_dump_inventory(&mut self, world: &World, start: TilePos, item_type: &str) -> TilePath {
        let (graph, _) = self.graphs(world);
        let result = dijkstra(graph, start, goal_dump_evaluator(world, item_type), None);
        log_result("dump", start, &result);
        TilePath::from_search(result)
    }

    /// Route to the nearest tile of `room`.
    pub fn find_path_to_room(&mut self, world: &World, start: TilePos, room: RoomId) -> TilePath {
        let (graph, _) = self.graphs(world);
        let result = dijkstra(graph, start, goal_room_evaluator(world, room), None);
        log_result("room", start, &result);
        TilePath::from_search(result)
    }

    /// The room of the nearest tile that has one, starting from `start`.
    pub fn find_nearest_room(&mut self, world: &World, start: TilePos) -> Option<RoomId> {
        if let Some(room) = world.room_of(start) {
            return Some(room);
        }
        let (graph, _) = self.graphs(world);
        let result = dijkstra(graph, start, goal_has_room_evaluator(world), None);
        result.path.last().and_then(|p| world.room_of(*p))
    }

    // ── Room queries ───────────────────────────────────────────────────

    /// Cheapest room chain from `start` into any of `targets`, both ends
    /// included.
    pub fn find_room_path(
        &mut self,
        world: &World,
        start: RoomId,
        targets: &BTreeSet<RoomId>,
    ) -> Option<Vec<RoomId>> {
        let (_, rooms) = self.graphs(world);
        let result = astar(rooms, start, |r| targets.contains(&r), zero_heuristic, None);
        result.is_found().then_some(result.path)
    }

    /// Whether any room in `targets` can be reached from `start` through
    /// exits. Returns as soon as a target is the start or next to a visited
    /// room.
    pub fn is_room_reachable(&mut self, world: &World, start: RoomId, targets: &BTreeSet<RoomId>) -> bool {
        if targets.contains(&start) {
            return true;
        }
        if targets.is_empty() {
            return false;
        }
        let (_, rooms) = self.graphs(world);
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let mut found = false;
            rooms.for_each_edge(current, |next, _| {
                if targets.contains(&next) {
                    found = true;
                } else if visited.insert(next) {
                    queue.push_back(next);
                }
            });
            if found {
                return true;
            }
        }
        false
    }
}

/// Two-tier search: room chain, then the candidate closest to where the
/// chain enters the destination room, then one tile search to it.
fn route_via_rooms(
    world: &World,
    graph: &TileGraph,
    rooms: &RoomGraph,
    start: TilePos,
    candidates: &[TilePos],
) -> Option<TilePath> {
    let start_room = world.room_of(start)?;
    let target_rooms: BTreeSet<RoomId> = candidates.iter().filter_map(|p| world.room_of(*p)).collect();
    let chain = astar(rooms, start_room, |r| target_rooms.contains(&r), zero_heuristic, None);
    if !chain.is_found() {
        return None;
    }

    // Follow the chain, taking at each hop the exit nearest the last one.
    let mut anchor = start;
    for hop in chain.path.windows(2) {
        anchor = rooms
            .exits_between(hop[0], hop[1])
            .min_by_key(|exit| exit.manhattan(anchor))?;
    }

    let destination = *chain.path.last()?;
    let target = candidates
        .iter()
        .copied()
        .filter(|p| world.room_of(*p) == Some(destination))
        .min_by_key(|p| (p.manhattan(anchor), *p))?;

    let result = astar(
        graph,
        start,
        goal_tile_evaluator(world, target, false),
        manhattan_heuristic(target),
        None,
    );
    log_result("inventory", start, &result);
    result.is_found().then(|| TilePath::from_search(result))
}

fn log_result(kind: &str, start: TilePos, result: &SearchResult<TilePos>) {
    match result.outcome {
        SearchOutcome::Found => log::trace!(
            target: "path",
            "{} search from {}: {} tiles, cost {:.1}, {} expanded in {:?}",
            kind,
            start,
            result.path.len(),
            result.cost,
            result.expanded,
            result.elapsed
        ),
        SearchOutcome::NoPath | SearchOutcome::BudgetExceeded => log::debug!(
            target: "path",
            "{} search from {}: {:?} after {} expanded",
            kind,
            start,
            result.outcome,
            result.expanded
        ),
        // Already reported by the search itself.
        SearchOutcome::InvalidEndpoint => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Inventory;
    use crate::structure::Structure;

    #[test]
    fn test_graph_refreshes_after_mutation() {
        let mut world = World::new(5, 1, 1);
        let mut pf = Pathfinder::new(false);
        let start = TilePos::new(0, 0, 0);
        let goal = TilePos::new(4, 0, 0);
        assert_eq!(pf.find_path_to_tile(&world, start, goal, false).len(), 5);

        world.place_structure(TilePos::new(2, 0, 0), Structure::wall());
        assert!(pf.find_path_to_tile(&world, start, goal, false).is_empty());
    }

    #[test]
    fn test_impassable_goal_returns_empty() {
        let mut world = World::new(3, 3, 1);
        let wall = TilePos::new(2, 2, 0);
        world.place_structure(wall, Structure::wall());
        let mut pf = Pathfinder::new(false);
        assert!(pf.find_path_to_tile(&world, TilePos::new(0, 0, 0), wall, false).is_empty());
        // Working next to it is fine.
        let path = pf.find_path_to_tile(&world, TilePos::new(0, 0, 0), wall, true);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_min_path_time_respects_budget() {
        let world = World::new(10, 1, 1);
        let mut pf = Pathfinder::new(false);
        let start = TilePos::new(0, 0, 0);
        let goal = TilePos::new(9, 0, 0);
        assert_eq!(pf.find_min_path_time(&world, start, goal, false, None), 9.0);
        assert_eq!(pf.find_min_path_time(&world, start, goal, false, Some(5.0)), f32::INFINITY);
    }

    #[test]
    fn test_inventory_path_prefers_nearest_stack() {
        let mut world = World::new(10, 1, 1);
        world.place_inventory(TilePos::new(9, 0, 0), Inventory::new("Wood", 5, 50));
        world.place_inventory(TilePos::new(3, 0, 0), Inventory::new("Wood", 5, 50));
        let mut pf = Pathfinder::new(false);
        let path = pf.find_path_to_inventory(&world, TilePos::new(0, 0, 0), &["Wood"], false);
        assert_eq!(path.destination(), Some(TilePos::new(3, 0, 0)));
        assert!(pf
            .find_path_to_inventory(&world, TilePos::new(0, 0, 0), &["Stone"], false)
            .is_empty());
        assert!(pf.find_path_to_inventory(&world, TilePos::new(0, 0, 0), &[], false).is_empty());
    }

    #[test]
    fn test_inventory_through_door() {
        // Actor inside a doored room, wood outside.
        let mut world = World::new(7, 7, 1);
        for i in 1..=5 {
            for (x, y) in [(i, 1), (i, 5), (1, i), (5, i)] {
                let s = if (x, y) == (3, 5) { Structure::door() } else { Structure::wall() };
                world.place_structure(TilePos::new(x, y, 0), s);
            }
        }
        world.place_inventory(TilePos::new(3, 6, 0), Inventory::new("Wood", 5, 50));
        world.place_inventory(TilePos::new(0, 0, 0), Inventory::new("Wood", 5, 50));
        let mut pf = Pathfinder::new(false);
        let path = pf.find_path_to_inventory(&world, TilePos::new(3, 3, 0), &["Wood"], false);
        assert_eq!(path.destination(), Some(TilePos::new(3, 6, 0)));
        assert!(path.iter().any(|p| p == TilePos::new(3, 5, 0)));
    }

    #[test]
    fn test_nearest_room_from_door() {
        let mut world = World::new(5, 1, 1);
        let door = TilePos::new(2, 0, 0);
        world.place_structure(door, Structure::door());
        let mut pf = Pathfinder::new(false);
        assert_eq!(world.room_of(door), None);
        assert_eq!(pf.find_nearest_room(&world, door), Some(RoomId::OUTSIDE));
    }

    #[test]
    fn test_dump_and_structure_queries() {
        let mut world = World::new(5, 1, 1);
        world.place_inventory(TilePos::new(0, 0, 0), Inventory::new("Stone", 1, 50));
        world.place_structure(TilePos::new(4, 0, 0), Structure::new("Workbench"));
        let mut pf = Pathfinder::new(false);
        let dump = pf.find_path_to_dump_inventory(&world, TilePos::new(0, 0, 0), "Wood");
        assert_eq!(dump.destination(), Some(TilePos::new(1, 0, 0)));
        let bench = pf.find_path_to_structure(&world, TilePos::new(0, 0, 0), "Workbench");
        assert_eq!(bench.destination(), Some(TilePos::new(4, 0, 0)));
        assert_eq!(bench.cost(), 4.0);
    }
}
