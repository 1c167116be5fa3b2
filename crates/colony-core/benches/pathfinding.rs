use colony_core::prelude::*;
use colony_logic::{Inventory, Pathfinder, Structure, TilePos, World};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// 64x64 map split into four rooms by walls with one door each.
fn walled_map() -> World {
    let mut world = World::new(64, 64, 1);
    for i in 0..64 {
        if i != 16 && i != 48 {
            world.place_structure(TilePos::new(32, i, 0), Structure::prototype("Wall"));
            world.place_structure(TilePos::new(i, 32, 0), Structure::prototype("Wall"));
        }
    }
    world.place_inventory(TilePos::new(60, 60, 0), Inventory::new("Wood", 50, 50));
    world
}

fn bench_tile_path(c: &mut Criterion) {
    let world = walled_map();
    let mut pathfinder = Pathfinder::new(false);
    pathfinder.refresh(&world);

    c.bench_function("find_path_to_tile across rooms", |b| {
        b.iter(|| {
            pathfinder.find_path_to_tile(
                &world,
                black_box(TilePos::new(2, 2, 0)),
                black_box(TilePos::new(60, 60, 0)),
                false,
            )
        })
    });

    c.bench_function("find_path_to_inventory", |b| {
        b.iter(|| pathfinder.find_path_to_inventory(&world, black_box(TilePos::new(2, 2, 0)), &["Wood"], true))
    });
}

fn bench_graph_rebuild(c: &mut Criterion) {
    let world = walled_map();
    c.bench_function("tile graph rebuild", |b| {
        b.iter(|| {
            let mut pathfinder = Pathfinder::new(false);
            pathfinder.refresh(black_box(&world));
        })
    });
}

fn bench_colony_tick(c: &mut Criterion) {
    let mut engine = SimulationEngine::with_default_config(walled_map());
    for i in 0..20 {
        engine.spawn_actor(&format!("actor{}", i), TilePos::new(1 + i % 10, 1 + i / 10, 0));
    }
    for i in 0..20 {
        engine.enqueue_job(&JobTemplate::construct("Wall").require("Wood", 1, 1), TilePos::new(40 + i, 10, 0));
    }

    c.bench_function("colony tick (20 actors)", |b| b.iter(|| engine.update(black_box(0.1))));
}

criterion_group!(benches, bench_tile_path, bench_graph_rebuild, bench_colony_tick);
criterion_main!(benches);
