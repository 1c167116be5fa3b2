//! Colony Headless Simulation Harness
//!
//! Validates navigation, rooms, job scheduling and a short colony run.
//! Runs entirely in-process with no rendering.
//!
//! Usage:
//!   cargo run -p colony-simtest
//!   cargo run -p colony-simtest -- --verbose

use std::collections::BTreeSet;

use colony_core::config::SimConfig;
use colony_core::jobs::{JobPriority, JobTemplate, WorkOutcome};
use colony_core::engine::SimulationEngine;
use colony_logic::pathfinder::Pathfinder;
use colony_logic::room::validate_rooms;
use colony_logic::tile_graph::TileGraph;
use colony_logic::{Inventory, RoomId, Structure, TilePos, World};

// ── Simulation config (same JSON the engine embeds) ─────────────────────
const CONFIG_JSON: &str = include_str!("../../../data/sim_config.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn p(x: i32, y: i32) -> TilePos {
    TilePos::new(x, y, 0)
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Colony Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Config validation
    results.extend(validate_config(verbose));

    // 2. Tile pathfinding
    results.extend(validate_pathfinding(verbose));

    // 3. Room detection and reachability
    results.extend(validate_rooms_logic(verbose));

    // 4. Job arithmetic
    results.extend(validate_job_logic(verbose));

    // 5. Colony run
    results.extend(validate_colony_run(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_config(verbose: bool) -> Vec<TestResult> {
    println!("--- Simulation Config ---");
    let mut results = Vec::new();

    let config: SimConfig = match serde_json::from_str(CONFIG_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(check("config_parse", false, format!("JSON parse error: {}", e)));
            return results;
        }
    };

    results.push(check(
        "config_valid",
        config.validate().is_ok(),
        format!("{} job categories", config.job_categories.len()),
    ));

    let names: Vec<&str> = config.category_names().collect();
    results.push(check(
        "config_has_hauling",
        config.has_category("hauling"),
        format!("categories: {:?}", names),
    ));

    results.push(check(
        "config_matches_default",
        config == SimConfig::default(),
        "embedded JSON agrees with SimConfig::default()",
    ));

    if verbose {
        println!(
            "  ap rate {}/AUT cap {}, claims last {} AUT",
            config.action_point_rate, config.action_point_cap, config.claim_duration
        );
    }
    results
}

// ── 2. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    // Open floor: Manhattan-optimal
    let world = World::new(10, 10, 1);
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(9, 9), false);
    results.push(check(
        "open_floor_optimal",
        path.len() == 19 && path.cost() == 18.0,
        format!("{} tiles, cost {}", path.len(), path.cost()),
    ));

    // Walled column with a single gap
    let mut world = World::new(10, 10, 1);
    for y in 0..9 {
        world.place_structure(p(5, y), Structure::wall());
    }
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(9, 0), false);
    let through_gap = path.iter().any(|t| t == p(5, 9));
    let crosses_wall = path.iter().any(|t| t.x == 5 && t.y != 9);
    results.push(check(
        "walled_column_uses_gap",
        !path.is_empty() && through_gap && !crosses_wall,
        format!("{} tiles, cost {}", path.len(), path.cost()),
    ));

    // Sealed goal: empty path, infinite time
    let mut world = World::new(7, 7, 1);
    for i in 1..=5 {
        for (x, y) in [(i, 1), (i, 5), (1, i), (5, i)] {
            world.place_structure(p(x, y), Structure::wall());
        }
    }
    let mut pf = Pathfinder::new(false);
    let path = pf.find_path_to_tile(&world, p(0, 0), p(3, 3), false);
    let time = pf.find_min_path_time(&world, p(0, 0), p(3, 3), false, None);
    results.push(check(
        "sealed_goal_no_path",
        path.is_empty() && time.is_infinite(),
        format!("path {} tiles, time {}", path.len(), time),
    ));

    // Rebuild idempotence
    let a = TileGraph::build(&world, false);
    let b = TileGraph::build(&world, false);
    results.push(check(
        "graph_rebuild_idempotent",
        a == b,
        format!("{} nodes, {} edges", a.node_count(), a.edge_count()),
    ));

    // Incremental regeneration agrees with a full build
    let mut pf = Pathfinder::new(false);
    pf.refresh(&world);
    let wall = world.structure_at(p(3, 1)).map(|s| s.id);
    if let Some(id) = wall {
        world.remove_structure(id);
    }
    let incremental_ok = pf.tile_graph(&world) == &TileGraph::build(&world, false);
    let reopened = pf.find_path_to_tile(&world, p(0, 0), p(3, 3), false);
    results.push(check(
        "incremental_regeneration",
        incremental_ok && !reopened.is_empty(),
        format!("path after opening wall: {} tiles", reopened.len()),
    ));

    if verbose {
        println!("  sealed search returned {} tiles", path.len());
    }
    results
}

// ── 3. Rooms ────────────────────────────────────────────────────────────

fn validate_rooms_logic(verbose: bool) -> Vec<TestResult> {
    println!("--- Rooms ---");
    let mut results = Vec::new();

    let mut world = World::new(9, 9, 1);
    results.push(check(
        "open_world_is_outside",
        world.rooms().len() == 1 && world.room_of(p(4, 4)) == Some(RoomId::OUTSIDE),
        format!("{} rooms", world.rooms().len()),
    ));

    // Enclose a 3x3 room with a door
    for i in 2..=6 {
        for (x, y) in [(i, 2), (i, 6), (2, i), (6, i)] {
            let s = if (x, y) == (4, 2) {
                Structure::door()
            } else {
                Structure::wall()
            };
            world.place_structure(p(x, y), s);
        }
    }
    let inside = world.room_of(p(4, 4));
    let violations = validate_rooms(&world);
    results.push(check(
        "enclosure_splits_room",
        inside.is_some() && inside != Some(RoomId::OUTSIDE) && violations.is_empty(),
        format!("{} rooms, {} violations", world.rooms().len(), violations.len()),
    ));

    let mut pf = Pathfinder::new(false);
    let trivial = match inside {
        Some(room) => pf.is_room_reachable(&world, room, &BTreeSet::from([room])),
        None => false,
    };
    results.push(check("start_room_reachable", trivial, "target set holds the start room"));

    let through_door = match inside {
        Some(room) => pf.is_room_reachable(&world, RoomId::OUTSIDE, &BTreeSet::from([room])),
        None => false,
    };
    results.push(check("room_reachable_through_door", through_door, "outside -> inside"));

    // Split the inner room in two with a wall line
    for x in 3..=5 {
        world.place_structure(p(x, 4), Structure::wall());
    }
    let north = world.room_of(p(4, 3));
    let south = world.room_of(p(4, 5));
    let split_ok = north.is_some() && south.is_some() && north != south;
    let sealed = match (north, south) {
        (Some(n), Some(s)) => !pf.is_room_reachable(&world, n, &BTreeSet::from([s])),
        _ => false,
    };
    results.push(check(
        "wall_line_splits_room",
        split_ok && sealed && validate_rooms(&world).is_empty(),
        format!("north {:?}, south {:?}", north, south),
    ));

    // Remove it again: the halves merge
    let line: Vec<_> = (3..=5)
        .filter_map(|x| world.structure_at(p(x, 4)).map(|s| s.id))
        .collect();
    for id in line {
        world.remove_structure(id);
    }
    let merged = world.room_of(p(4, 3)) == world.room_of(p(4, 5));
    results.push(check(
        "removing_wall_merges_rooms",
        merged && validate_rooms(&world).is_empty(),
        format!("{} rooms", world.rooms().len()),
    ));

    if verbose {
        for room in world.rooms().iter() {
            println!("  {}: {} tiles", room.id, room.tile_count());
        }
    }
    results
}

// ── 4. Jobs ─────────────────────────────────────────────────────────────

fn validate_job_logic(_verbose: bool) -> Vec<TestResult> {
    println!("--- Jobs ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::with_default_config(World::new(8, 8, 1));
    let wall = JobTemplate::construct("Wall").require("Wood", 10, 10).cost(5.0);
    let Some(id) = engine.enqueue_job(&wall, p(4, 4)) else {
        results.push(check("job_enqueue", false, "construction job rejected"));
        return results;
    };

    let jobs = &mut engine.ctx.jobs;
    jobs.deliver(id, Inventory::new("Wood", 4, 50));
    let outcome = jobs.do_work(&mut engine.ctx.world, id, 100.0);
    let cost = jobs.job(id).map_or(-1.0, |j| j.cost);
    results.push(check(
        "partial_materials_waste_work",
        outcome == Some(WorkOutcome::Wasted) && cost == 5.0,
        format!("{:?}, cost {}", outcome, cost),
    ));

    jobs.deliver(id, Inventory::new("Wood", 6, 50));
    let outcome = jobs.do_work(&mut engine.ctx.world, id, 5.0);
    let built = engine.grid().structure_at(p(4, 4)).map(|s| s.kind.clone());
    results.push(check(
        "full_materials_complete",
        outcome == Some(WorkOutcome::Completed) && built.as_deref() == Some("Wall"),
        format!("{:?}, built {:?}", outcome, built),
    ));

    let repeating = JobTemplate::new("Brew", "crafting").cost(2.0).repeating();
    let mut cycles = 0;
    if let Some(id) = engine.enqueue_job(&repeating, p(1, 1)) {
        for _ in 0..10 {
            if engine.ctx.jobs.do_work(&mut engine.ctx.world, id, 1.0) == Some(WorkOutcome::Repeated) {
                cycles += 1;
            }
        }
    }
    results.push(check(
        "repeating_job_cycles",
        cycles == 5,
        format!("{} cycles over 10 work", cycles),
    ));

    let unknown = engine.enqueue_job(&JobTemplate::new("Paint", "painting"), p(2, 2));
    results.push(check(
        "unknown_category_rejected",
        unknown.is_none(),
        "category not in config",
    ));

    results
}

// ── 5. Colony run ───────────────────────────────────────────────────────

fn validate_colony_run(verbose: bool) -> Vec<TestResult> {
    println!("--- Colony Run ---");
    let mut results = Vec::new();

    // Priority beats distance
    let mut engine = SimulationEngine::with_default_config(World::new(10, 3, 1));
    let actor = engine.spawn_actor("Ada", p(0, 1));
    let far = engine.enqueue_job(
        &JobTemplate::new("Far", "hauling").priority(JobPriority::High).cost(100.0),
        p(5, 1),
    );
    engine.enqueue_job(
        &JobTemplate::new("Near", "hauling").priority(JobPriority::Medium).cost(100.0),
        p(1, 1),
    );
    engine.update(0.1);
    let chosen = engine.current_job(actor);
    results.push(check(
        "priority_beats_distance",
        chosen.is_some() && chosen == far,
        format!("chose {:?}", chosen),
    ));

    // Two actors haul wood and build two walls
    let mut grid = World::new(12, 12, 1);
    grid.place_inventory(p(10, 10), Inventory::new("Wood", 20, 50));
    let mut engine = SimulationEngine::with_default_config(grid);
    let actors = [engine.spawn_actor("Ada", p(1, 1)), engine.spawn_actor("Bo", p(2, 1))];
    let wall = JobTemplate::construct("Wall").require("Wood", 5, 5).cost(3.0);
    let sites = [p(5, 5), p(6, 8)];
    for site in sites {
        engine.enqueue_job(&wall, site);
    }

    let mut exclusive = true;
    let mut ticks = 0;
    while ticks < 2000 && engine.job_count() > 0 {
        engine.update(0.1);
        ticks += 1;
        let current: Vec<_> = actors.iter().filter_map(|&a| engine.current_job(a)).collect();
        if current.len() == 2 && current[0] == current[1] {
            exclusive = false;
        }
    }
    results.push(check(
        "one_worker_per_job",
        exclusive,
        "no two actors held the same job",
    ));

    let built = sites
        .iter()
        .filter(|&&s| engine.grid().structure_at(s).is_some_and(|st| st.kind == "Wall"))
        .count();
    results.push(check(
        "colony_builds_walls",
        engine.job_count() == 0 && built == 2,
        format!("{} walls after {} ticks ({:.1} AUT)", built, ticks, engine.sim_time()),
    ));

    let carried: u32 = actors
        .iter()
        .map(|&a| engine.carried(a).map_or(0, |c| c.amount()))
        .sum();
    let left = engine.grid().total_available("Wood", true);
    results.push(check(
        "wood_conserved",
        left + carried == 10,
        format!("{} on the ground, {} carried", left, carried),
    ));

    // Save, load, and compare
    let mut buffer = Vec::new();
    let saved = engine.save(&mut buffer);
    let mut loaded = SimulationEngine::with_default_config(World::new(1, 1, 1));
    let load = saved.and_then(|_| loaded.load(&buffer[..]));
    results.push(check(
        "save_load_roundtrip",
        load.is_ok() && loaded.actor_count() == 2 && loaded.grid().structure_at(p(5, 5)).is_some(),
        match &load {
            Ok(()) => format!("{} bytes", buffer.len()),
            Err(e) => e.to_string(),
        },
    ));

    if verbose {
        for &a in &actors {
            if let (Some(actor), Some(skills)) = (engine.actor(a), engine.skills(a)) {
                println!(
                    "  {} at {}: construction xp {:.1}",
                    actor.name,
                    actor.tile,
                    skills.xp("construction")
                );
            }
        }
    }
    results
}
