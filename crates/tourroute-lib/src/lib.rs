//! tourroute library entry points.
//!
//! This crate loads a SQLite node/edge dataset into memory, indexes its nodes
//! on a lat/lon grid, and answers shortest-path, multi-stop and
//! points-of-interest queries with A*. Higher-level consumers (the CLI or a
//! web service) should only depend on the functions exported here instead of
//! reimplementing behavior.

#![deny(warnings)]

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod graph;
pub mod path;
pub mod poi;
pub mod provider;
pub mod routing;
pub mod spatial;

pub use config::{default_dataset_path, RoutingConfig};
pub use db::Dataset;
pub use error::{Error, Result};
pub use geo::{haversine_meters, LatLon, EARTH_RADIUS_METERS};
pub use graph::{ComponentId, Edge, GraphCache, GraphStats, Node, NodeId};
pub use path::{NodePath, PathFinder, PathResult};
pub use poi::{
    augment_route, nearby_by_category, rank_by_weight, CategoryWeights, Interest, PoiCatalog,
    PoiRecord, PoiRoute, POI_PROXIMITY_METERS,
};
pub use provider::{GraphProvider, RoutingContext};
pub use routing::{
    ResolvedWaypoint, RouteComposer, RoutePlan, RouteRequest, SegmentSummary, SnapPolicy,
};
pub use spatial::{NodeFilter, Snap, SpatialIndex};
