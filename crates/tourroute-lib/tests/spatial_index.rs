mod common;

use common::{line_dataset, line_point, step_deg, FixtureDataset};
use tourroute_lib::{GraphCache, NodeFilter, SpatialIndex};

fn load(fixture: FixtureDataset) -> GraphCache {
    let dataset = fixture.write();
    GraphCache::load(&dataset.path).expect("fixture loads")
}

#[test]
fn exact_node_coordinates_snap_to_that_node() {
    let graph = load(line_dataset());
    let index = SpatialIndex::build(&graph);

    for (i, id) in (1..=4).enumerate() {
        let point = line_point(i as u32);
        let snap = index
            .nearest_within(point.lat, point.lon, NodeFilter::Any)
            .expect("index is not empty");
        assert_eq!(snap.node, id);
        assert!(snap.distance_meters < 1e-6);
    }
}

#[test]
fn nearest_connected_never_returns_an_orphan() {
    // Orphans sit right next to every query point; the road pair is far off.
    let step = step_deg(100.0);
    let graph = load(
        FixtureDataset::new()
            .node(1, 0.0, 0.0)
            .node(2, 0.0, step)
            .node(3, 0.0, 2.0 * step)
            .node(10, 0.2, 0.2)
            .node(11, 0.2, 0.2 + step)
            .road(10, 11),
    );
    let index = SpatialIndex::build(&graph);

    for lon in [0.0, step, 2.0 * step] {
        let id = index.nearest_connected(0.0, lon).expect("roads exist");
        assert!(graph.is_routable(id), "node {id} is not routable");
        assert!(id == 10 || id == 11);
        assert!(index.nearest(0.0, lon).is_some_and(|n| n <= 3));
    }
}

#[test]
fn distant_queries_fall_back_to_a_full_scan() {
    let graph = load(line_dataset());
    let index = SpatialIndex::build(&graph);

    // Far outside the searched rings in every direction.
    assert_eq!(index.nearest(45.0, 90.0), Some(4));
    assert_eq!(index.nearest(-45.0, -90.0), Some(1));
}

#[test]
fn empty_dataset_has_no_nearest_node() {
    let graph = load(FixtureDataset::new());
    let index = SpatialIndex::build(&graph);

    assert!(index.is_empty());
    assert_eq!(index.nearest(0.0, 0.0), None);
    assert_eq!(index.nearest_connected(0.0, 0.0), None);
}

#[test]
fn custom_cell_size_changes_bucketing_not_answers() {
    let graph = load(line_dataset());
    let coarse = SpatialIndex::with_settings(&graph, 1.0, 2);
    let fine = SpatialIndex::with_settings(&graph, 0.0001, 2);

    assert_eq!(coarse.cell_count(), 1);
    assert!(fine.cell_count() > 1);
    let probe = line_point(2);
    assert_eq!(
        coarse.nearest(probe.lat, probe.lon),
        fine.nearest(probe.lat, probe.lon)
    );
}
