//! Integration tests for tile and room navigation.
//!
//! Exercises: World mutation → TileGraph refresh → A* → Pathfinder queries,
//! plus room reachability over doors.
//!
//! All tests are pure logic with hand-built worlds.

use std::collections::BTreeSet;

use colony_logic::pathfinder::{Pathfinder, TilePath};
use colony_logic::room::validate_rooms;
use colony_logic::search::{astar, SearchGraph};
use colony_logic::tile_graph::TileGraph;
use colony_logic::{RoomId, Structure, TilePos, TileType, World};

// ── Helpers ────────────────────────────────────────────────────────────

fn p(x: i32, y: i32) -> TilePos {
    TilePos::new(x, y, 0)
}

/// Every step is a graph edge and the step costs add up to the total.
fn assert_path_valid(graph: &TileGraph, path: &TilePath, start: TilePos, goal: TilePos) {
    let tiles = path.to_vec();
    assert_eq!(tiles.first(), Some(&start));
    assert_eq!(tiles.last(), Some(&goal));
    let mut total = 0.0;
    for step in tiles.windows(2) {
        assert!(graph.contains(step[0]), "{} not in graph", step[0]);
        let cost = graph
            .edge_cost(step[0], step[1])
            .unwrap_or_else(|| panic!("no edge {} -> {}", step[0], step[1]));
        total += cost;
    }
    assert!((total - path.cost()).abs() < 1e-3, "{} vs {}", total, path.cost());
}

/// Room at (2..=4, 2..=4) with walls at 1 and 5 and an optional door.
fn build_room(world: &mut World, origin: (i32, i32), door: Option<(i32, i32)>) {
    let (ox, oy) = origin;
    for i in 0..=4 {
        for (x, y) in [(ox + i, oy), (ox + i, oy + 4), (ox, oy + i), (ox + 4, oy + i)] {
            let s = if Some((x, y)) == door {
                Structure::door()
            } else {
                Structure::wall()
            };
            world.place_structure(p(x, y), s);
        }
    }
}

// ── Tile paths ─────────────────────────────────────────────────────────

#[test]
fn open_floor_path_is_manhattan_optimal() {
    let world = World::new(10, 10, 1);
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(9, 9), false);
    assert_eq!(path.len(), 19);
    assert_eq!(path.cost(), 18.0);
    assert_path_valid(pf.tile_graph(&world), &path, p(0, 0), p(9, 9));
}

#[test]
fn walled_column_forces_the_gap() {
    let mut world = World::new(10, 10, 1);
    for y in 0..9 {
        world.place_structure(p(5, y), Structure::wall());
    }
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(9, 0), false);
    assert!(!path.is_empty());
    assert!(path.iter().any(|t| t == p(5, 9)));
    assert!(path.iter().all(|t| t.x != 5 || t.y == 9));
    assert_path_valid(pf.tile_graph(&world), &path, p(0, 0), p(9, 0));
}

#[test]
fn sealed_goal_has_no_path() {
    let mut world = World::new(7, 7, 1);
    build_room(&mut world, (1, 1), None);
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(3, 3), false);
    assert!(path.is_empty());
    assert_eq!(pf.find_min_path_time(&world, p(0, 0), p(3, 3), true, None), f32::INFINITY);
}

#[test]
fn paths_are_valid_on_a_cluttered_grid() {
    let mut world = World::new(12, 12, 1);
    // Scattered walls and rough ground in a fixed pattern.
    for x in 0..12 {
        for y in 0..12 {
            if (x * 7 + y * 3) % 11 == 0 && (x, y) != (0, 0) {
                world.place_structure(p(x, y), Structure::wall());
            } else if (x + y) % 5 == 0 {
                world.set_tile_type(p(x, y), TileType::Rough);
            }
        }
    }
    let mut pf = Pathfinder::new(true);
    let goals: Vec<TilePos> = world
        .tiles()
        .filter(|t| world.is_walkable(t.pos))
        .map(|t| t.pos)
        .step_by(7)
        .collect();
    for goal in goals {
        let path = pf.find_path_to_tile(&world, p(0, 0), goal, false);
        if path.is_empty() {
            continue;
        }
        assert_path_valid(pf.tile_graph(&world), &path, p(0, 0), goal);
    }
}

#[test]
fn incremental_and_full_rebuilds_agree_after_many_edits() {
    let mut world = World::new(16, 16, 2);
    let mut pf = Pathfinder::new(false);
    pf.refresh(&world);
    for i in 0..10 {
        world.place_structure(p(i, 4), Structure::wall());
        world.set_tile_type(TilePos::new(i, 8, 1), TileType::Empty);
        pf.refresh(&world);
    }
    assert_eq!(pf.tile_graph(&world), &TileGraph::build(&world, false));
}

#[test]
fn multi_level_route_uses_empty_shafts() {
    let mut world = World::new(5, 5, 2);
    world.set_tile_type(TilePos::new(4, 4, 1), TileType::Empty);
    let mut pf = Pathfinder::new(false);
    let start = TilePos::new(0, 0, 1);
    let goal = TilePos::new(0, 0, 0);
    let path = pf.find_path_to_tile(&world, start, goal, false);
    assert!(path.iter().any(|t| t == TilePos::new(4, 4, 1)));
    assert_eq!(path.cost(), 17.0);
}

#[test]
fn dijkstra_and_astar_agree_on_cost() {
    let mut world = World::new(8, 8, 1);
    for y in 1..8 {
        world.place_structure(p(3, y), Structure::wall());
    }
    let graph = TileGraph::build(&world, false);
    let goal = p(7, 7);
    let a = astar(&graph, p(0, 7), |t| t == goal, |t| t.manhattan(goal) as f32, None);
    let d = astar(&graph, p(0, 7), |t| t == goal, |_| 0.0, None);
    assert!(a.is_found() && d.is_found());
    assert_eq!(a.cost, d.cost);
    assert!(a.expanded <= d.expanded);
}

// ── Rooms ──────────────────────────────────────────────────────────────

#[test]
fn start_room_in_targets_is_trivially_reachable() {
    let world = World::new(3, 3, 1);
    let mut pf = Pathfinder::new(false);
    let targets = BTreeSet::from([RoomId::OUTSIDE]);
    assert!(pf.is_room_reachable(&world, RoomId::OUTSIDE, &targets));
}

#[test]
fn rooms_reachable_only_through_doors() {
    let mut world = World::new(14, 7, 1);
    build_room(&mut world, (1, 1), Some((3, 5)));
    build_room(&mut world, (8, 1), None);
    assert!(validate_rooms(&world).is_empty());

    let doored = world.room_of(p(3, 3)).unwrap();
    let sealed = world.room_of(p(10, 3)).unwrap();
    let mut pf = Pathfinder::new(false);

    assert!(pf.is_room_reachable(&world, RoomId::OUTSIDE, &BTreeSet::from([doored])));
    assert!(!pf.is_room_reachable(&world, doored, &BTreeSet::from([sealed])));

    let chain = pf
        .find_room_path(&world, doored, &BTreeSet::from([RoomId::OUTSIDE]))
        .unwrap();
    assert_eq!(chain, vec![doored, RoomId::OUTSIDE]);

    // Opening the sealed room with a door connects it.
    let wall = world.structure_at(p(10, 1)).unwrap().id;
    world.remove_structure(wall);
    world.place_structure(p(10, 1), Structure::door());
    let sealed = world.room_of(p(10, 3)).unwrap();
    assert!(pf.is_room_reachable(&world, doored, &BTreeSet::from([sealed])));
}

#[test]
fn path_into_room_crosses_the_door() {
    let mut world = World::new(7, 7, 1);
    build_room(&mut world, (1, 1), Some((3, 1)));
    let inside = world.room_of(p(3, 3)).unwrap();
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_room(&world, p(3, 0), inside);
    assert_eq!(path.to_vec(), vec![p(3, 0), p(3, 1), p(3, 2)]);
}
