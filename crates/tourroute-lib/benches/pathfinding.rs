use criterion::{criterion_group, criterion_main, Criterion};
use once_cell::sync::Lazy;
use std::hint::black_box;
use tourroute_lib::geo::meters_to_degrees;
use tourroute_lib::{GraphCache, LatLon, Node, PathFinder, RouteComposer, SpatialIndex};

const SIDE: i64 = 60;
const SPACING_METERS: f64 = 50.0;

/// Street grid of `SIDE` x `SIDE` intersections with two-way blocks.
fn street_grid() -> GraphCache {
    let step = meters_to_degrees(SPACING_METERS);
    let id = |row: i64, col: i64| row * SIDE + col + 1;

    let nodes = (0..SIDE).flat_map(|row| {
        (0..SIDE).map(move |col| Node {
            id: id(row, col),
            lat: 48.0 + step * row as f64,
            lon: 11.0 + step * col as f64,
        })
    });

    let mut edges = Vec::new();
    for row in 0..SIDE {
        for col in 0..SIDE {
            if col + 1 < SIDE {
                edges.push((id(row, col), id(row, col + 1)));
                edges.push((id(row, col + 1), id(row, col)));
            }
            if row + 1 < SIDE {
                edges.push((id(row, col), id(row + 1, col)));
                edges.push((id(row + 1, col), id(row, col)));
            }
        }
    }
    GraphCache::from_parts(nodes, edges)
}

static GRAPH: Lazy<GraphCache> = Lazy::new(street_grid);
static INDEX: Lazy<SpatialIndex> = Lazy::new(|| SpatialIndex::build(&GRAPH));

fn corner(graph: &GraphCache, id: i64) -> LatLon {
    graph.node(id).expect("corner exists").position()
}

fn benchmark_pathfinding(c: &mut Criterion) {
    let graph = &*GRAPH;
    let index = &*INDEX;
    let last = SIDE * SIDE;

    c.bench_function("astar_grid_diagonal", |b| {
        let finder = PathFinder::new(graph);
        b.iter(|| {
            let path = finder.shortest_path(1, last).expect("nodes exist");
            black_box(path.path.len())
        });
    });

    c.bench_function("nearest_connected_snap", |b| {
        let probe = corner(graph, SIDE * (SIDE / 2) + SIDE / 2);
        b.iter(|| black_box(index.nearest_connected(probe.lat + 1e-5, probe.lon - 1e-5)));
    });

    c.bench_function("multi_stop_three_legs", |b| {
        let composer = RouteComposer::new(graph, index);
        let waypoints = [
            corner(graph, 1),
            corner(graph, SIDE),
            corner(graph, last),
            corner(graph, last - SIDE + 1),
        ];
        b.iter(|| {
            let plan = composer.route(&waypoints).expect("waypoints resolve");
            black_box(plan.distance_meters)
        });
    });
}

criterion_group!(benches, benchmark_pathfinding);
criterion_main!(benches);
