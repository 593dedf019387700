mod common;

use common::{line_dataset, line_point, step_deg};
use tourroute_lib::{
    CategoryWeights, Error, PoiCatalog, RouteRequest, RoutingConfig, RoutingContext,
};

#[test]
fn proximity_cut_is_strictly_below_500_metres() {
    let dataset = line_dataset()
        .poi(1, "Inside", "museum", step_deg(499.0), 0.0)
        .poi(2, "Outside", "museum", step_deg(501.0), 0.0)
        .write();
    let catalog = PoiCatalog::load(&dataset.path).expect("pois load");
    let weights: CategoryWeights = [("museum", 1)].into_iter().collect();

    let path = vec![line_point(0), line_point(1)];
    let found = catalog.along(&path, &weights);
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Inside"]);
}

#[test]
fn categories_outside_the_request_are_ignored() {
    let dataset = line_dataset()
        .poi(1, "Gallery", "museum", 0.0, step_deg(50.0))
        .poi(2, "Diner", "food", 0.0, step_deg(60.0))
        .write();
    let weights: CategoryWeights = [("museum", 2)].into_iter().collect();

    let catalog = PoiCatalog::load_for_categories(&dataset.path, &weights.categories())
        .expect("pois load");
    assert_eq!(catalog.len(), 1, "SQL prefilter drops other categories");

    let everything = PoiCatalog::load(&dataset.path).expect("pois load");
    let found = everything.along(&[line_point(0)], &weights);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].category, "museum");
}

#[test]
fn heavier_categories_rank_first_and_ties_keep_table_order() {
    let dataset = line_dataset()
        .poi(1, "Cafe A", "cafe", 0.0, step_deg(10.0))
        .poi(2, "Park", "park", 0.0, step_deg(20.0))
        .poi(3, "Cafe B", "cafe", 0.0, step_deg(30.0))
        .poi(4, "Museum", "museum", 0.0, step_deg(40.0))
        .write();
    let weights: CategoryWeights = [("cafe", 1), ("park", 5), ("museum", 3)]
        .into_iter()
        .collect();

    let catalog = PoiCatalog::load(&dataset.path).expect("pois load");
    let names: Vec<String> = catalog
        .along(&[line_point(0)], &weights)
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Park", "Museum", "Cafe A", "Cafe B"]);
}

#[test]
fn route_with_pois_carries_plan_and_interests() {
    let dataset = line_dataset()
        .poi(1, "Gallery", "museum", step_deg(100.0), step_deg(200.0))
        .poi(2, "Far gallery", "museum", 1.0, 1.0)
        .write();
    let context =
        RoutingContext::load(&RoutingConfig::for_dataset(&dataset.path)).expect("context loads");
    let weights: CategoryWeights = [("museum", 4)].into_iter().collect();

    let route = context
        .route_with_pois(&RouteRequest::between(line_point(0), line_point(3)), &weights)
        .expect("route builds");

    assert!((route.plan.distance_meters - 300.0).abs() < 1e-6);
    assert_eq!(route.user_interests, weights);
    assert_eq!(route.pois.len(), 1);
    assert_eq!(route.pois[0].name, "Gallery");

    let json = serde_json::to_value(&route).expect("serializes");
    assert!(json.get("distanceMeters").is_some());
    assert_eq!(json["userInterests"]["museum"], 4);
    assert_eq!(json["stopsCount"], 0);
}

#[test]
fn separate_poi_file_is_used_when_configured() {
    let routing = line_dataset().write();
    let pois = common::FixtureDataset::new()
        .poi(7, "Harbour", "viewpoint", 0.0, step_deg(300.0))
        .write();

    let mut config = RoutingConfig::for_dataset(&routing.path);
    config.poi_path = Some(pois.path.clone());
    let context = RoutingContext::load(&config).expect("context loads");
    let weights: CategoryWeights = [("viewpoint", 2)].into_iter().collect();

    let found = context
        .pois_along(&[line_point(3)], &weights)
        .expect("pois load");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 7);
}

#[test]
fn missing_poi_table_is_unsupported() {
    let dataset = line_dataset().write();
    dataset.execute("DROP TABLE pois;");

    let err = PoiCatalog::load(&dataset.path).expect_err("no pois table");
    assert!(matches!(err, Error::UnsupportedSchema));
}

#[test]
fn malformed_poi_rows_are_skipped() {
    let dataset = line_dataset()
        .poi(1, "Good", "museum", 0.0, 0.0)
        .write();
    dataset.execute(
        "INSERT INTO pois VALUES (2, 'No lat', 'museum', NULL, 0.0);
         INSERT INTO pois VALUES (3, 'Bad lat', 'museum', 'north', 0.0);
         INSERT INTO pois VALUES (4, 'Off the map', 'museum', 95.0, 0.0);
         INSERT INTO pois VALUES (5, X'00', 'museum', 0.0, 0.0);",
    );

    let catalog = PoiCatalog::load(&dataset.path).expect("bad rows are skipped");
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.records()[0].name, "Good");
}
