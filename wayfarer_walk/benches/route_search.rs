//! Route search benchmarks.
//!
//! Measures full `find_path` runs on synthetic maps: an open field, a
//! serpentine maze that forces long detours, and an unreachable target that
//! exhausts the node budget.
//!
//! ```bash
//! cargo bench --package wayfarer_walk --bench route_search
//! ```

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::atomic::AtomicBool;
use wayfarer_walk::config::WalkConfig;
use wayfarer_walk::graph::SearchGraph;
use wayfarer_walk::pathfinding::{RouteRequest, find_path};
use wayfarer_walk::step::StepContext;
use wayfarer_walk::types::{MovementMode, Position};
use wayfarer_walk::world::{
    LandTile, StaticObject, StaticTileData, TileFlags, TileMap, WorldObject,
};

const GRASS: u16 = 0x0003;
const WALL: u16 = 0x0080;

fn field(size: u32) -> TileMap {
    let mut map = TileMap::new(size, size, LandTile::flat(GRASS, 0, TileFlags::empty()));
    map.define_static(WALL, StaticTileData::new(TileFlags::IMPASSABLE, 20));
    map
}

fn wall(map: &mut TileMap, x: i32, y: i32) {
    map.place(x, y, WorldObject::Static(StaticObject { graphic: WALL, z: 0 }));
}

/// Vertical walls every fourth column, alternately open at the top and bottom.
fn serpentine(size: u32) -> TileMap {
    let mut map = field(size);
    let size = size as i32;
    for (i, x) in (4..size - 4).step_by(4).enumerate() {
        let gap = if i % 2 == 0 { size - 2 } else { 1 };
        for y in 0..size {
            if y != gap {
                wall(&mut map, x, y);
            }
        }
    }
    map
}

fn run(map: &TileMap, config: &WalkConfig, request: RouteRequest) -> usize {
    let ctx = StepContext::new(map, config, MovementMode::Normal);
    let mut graph = SearchGraph::new();
    let active = AtomicBool::new(true);
    match find_path(&ctx, &mut graph, &request, &active) {
        Ok(outcome) => outcome.stats.closed,
        Err(err) => panic!("graph error: {err}"),
    }
}

fn bench_open_field(c: &mut Criterion) {
    let map = field(128);
    let config = WalkConfig::default();
    let request = RouteRequest {
        start: Position::new(4, 4, 0),
        target: Position::new(120, 90, 0),
        tolerance: 0,
    };
    c.bench_function("route_search/open_field", |b| {
        b.iter(|| black_box(run(&map, &config, black_box(request))));
    });
}

fn bench_serpentine(c: &mut Criterion) {
    let map = serpentine(64);
    let config = WalkConfig::default();
    let request = RouteRequest {
        start: Position::new(1, 1, 0),
        target: Position::new(62, 62, 0),
        tolerance: 0,
    };
    c.bench_function("route_search/serpentine", |b| {
        b.iter(|| black_box(run(&map, &config, black_box(request))));
    });
}

fn bench_budget_exhaustion(c: &mut Criterion) {
    let mut map = field(160);
    for (x, y) in [(149, 149), (150, 149), (151, 149), (149, 150)] {
        wall(&mut map, x, y);
    }
    for (x, y) in [(151, 150), (149, 151), (150, 151), (151, 151)] {
        wall(&mut map, x, y);
    }
    let config = WalkConfig::default();
    let request = RouteRequest {
        start: Position::new(10, 10, 0),
        target: Position::new(150, 150, 0),
        tolerance: 0,
    };
    let mut group = c.benchmark_group("route_search");
    group.sample_size(10);
    group.bench_function("budget_exhaustion", |b| {
        b.iter(|| black_box(run(&map, &config, black_box(request))));
    });
    group.finish();
}

criterion_group!(benches, bench_open_field, bench_serpentine, bench_budget_exhaustion);
criterion_main!(benches);
