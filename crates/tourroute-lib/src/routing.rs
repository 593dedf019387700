use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::LatLon;
use crate::graph::{GraphCache, NodeId};
use crate::path::{PathFinder, PathResult};
use crate::spatial::{NodeFilter, SpatialIndex};

/// How waypoint coordinates are matched to graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapPolicy {
    /// Closest node of any kind.
    Nearest,
    /// Closest node that can leave or enter the network.
    #[default]
    NearestConnected,
}

impl SnapPolicy {
    fn filter(self) -> NodeFilter {
        match self {
            SnapPolicy::Nearest => NodeFilter::Any,
            SnapPolicy::NearestConnected => NodeFilter::Connected,
        }
    }
}

impl fmt::Display for SnapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SnapPolicy::Nearest => "nearest",
            SnapPolicy::NearestConnected => "nearest_connected",
        };
        f.write_str(value)
    }
}

/// Ordered trip through two or more coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub waypoints: Vec<LatLon>,
    pub snap: SnapPolicy,
}

impl RouteRequest {
    /// Single-leg request between two coordinates.
    pub fn between(start: LatLon, end: LatLon) -> Self {
        Self {
            waypoints: vec![start, end],
            snap: SnapPolicy::default(),
        }
    }

    /// Start, intermediate stops in order, then end.
    pub fn multi_stop(start: LatLon, stops: impl IntoIterator<Item = LatLon>, end: LatLon) -> Self {
        let mut waypoints = vec![start];
        waypoints.extend(stops);
        waypoints.push(end);
        Self {
            waypoints,
            snap: SnapPolicy::default(),
        }
    }

    pub fn with_snap(mut self, snap: SnapPolicy) -> Self {
        self.snap = snap;
        self
    }
}

/// A waypoint matched to a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedWaypoint {
    pub index: usize,
    pub requested: LatLon,
    pub node: NodeId,
    pub snap_distance_meters: f64,
}

/// Outcome of one leg between consecutive waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub from: NodeId,
    pub to: NodeId,
    pub distance_meters: f64,
    pub reachable: bool,
}

/// Composed multi-leg route.
///
/// `distance_meters` is infinite when any leg is unreachable; the path then
/// only holds the geometry of the reachable legs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub distance_meters: f64,
    pub path: Vec<LatLon>,
    pub waypoints: Vec<ResolvedWaypoint>,
    pub segments: Vec<SegmentSummary>,
    pub stops_count: usize,
}

impl RoutePlan {
    pub fn is_reachable(&self) -> bool {
        self.distance_meters.is_finite()
    }

    /// Number of legs that could not be routed.
    pub fn unreachable_segments(&self) -> usize {
        self.segments.iter().filter(|s| !s.reachable).count()
    }

    pub fn to_path_result(&self) -> PathResult {
        PathResult {
            distance_meters: self.distance_meters,
            path: self.path.clone(),
        }
    }
}

/// Chains shortest-path searches through an ordered list of waypoints.
#[derive(Debug, Clone, Copy)]
pub struct RouteComposer<'a> {
    graph: &'a GraphCache,
    index: &'a SpatialIndex,
    max_expansions: Option<usize>,
    max_snap_distance_meters: Option<f64>,
}

impl<'a> RouteComposer<'a> {
    pub fn new(graph: &'a GraphCache, index: &'a SpatialIndex) -> Self {
        Self {
            graph,
            index,
            max_expansions: None,
            max_snap_distance_meters: None,
        }
    }

    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    /// Reject waypoints whose closest eligible node is farther than `limit`.
    pub fn with_max_snap_distance(mut self, limit: Option<f64>) -> Self {
        self.max_snap_distance_meters = limit;
        self
    }

    /// Route through `waypoints`, snapping each to its nearest connected node.
    pub fn route(&self, waypoints: &[LatLon]) -> Result<RoutePlan> {
        self.plan(&RouteRequest {
            waypoints: waypoints.to_vec(),
            snap: SnapPolicy::NearestConnected,
        })
    }

    pub fn plan(&self, request: &RouteRequest) -> Result<RoutePlan> {
        if request.waypoints.len() < 2 {
            return Err(Error::InsufficientWaypoints {
                count: request.waypoints.len(),
            });
        }

        let resolved = self.resolve_waypoints(&request.waypoints, request.snap)?;
        let nodes: Vec<NodeId> = resolved.iter().map(|w| w.node).collect();
        let (distance_meters, path, segments) = self.compose(&nodes)?;

        Ok(RoutePlan {
            distance_meters,
            path,
            stops_count: resolved.len() - 2,
            waypoints: resolved,
            segments,
        })
    }

    /// Match every coordinate to a node under `snap`.
    pub fn resolve_waypoints(
        &self,
        waypoints: &[LatLon],
        snap: SnapPolicy,
    ) -> Result<Vec<ResolvedWaypoint>> {
        waypoints
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let unresolvable = || Error::UnresolvableWaypoint {
                    index,
                    lat: point.lat,
                    lon: point.lon,
                };

                let found = self
                    .index
                    .nearest_within(point.lat, point.lon, snap.filter())
                    .ok_or_else(unresolvable)?;
                if self
                    .max_snap_distance_meters
                    .is_some_and(|limit| found.distance_meters > limit)
                {
                    return Err(unresolvable());
                }

                debug!(
                    index,
                    node = found.node,
                    snap_distance_m = found.distance_meters,
                    %snap,
                    "resolved waypoint"
                );
                Ok(ResolvedWaypoint {
                    index,
                    requested: *point,
                    node: found.node,
                    snap_distance_meters: found.distance_meters,
                })
            })
            .collect()
    }

    /// Route consecutive node pairs and stitch their geometry.
    ///
    /// Once the path holds any coordinate, each further leg's first
    /// coordinate is dropped as the shared junction. Unreachable legs add
    /// nothing, so the next drawn leg still loses its first point.
    pub fn compose(&self, nodes: &[NodeId]) -> Result<(f64, Vec<LatLon>, Vec<SegmentSummary>)> {
        let finder = PathFinder::new(self.graph).with_max_expansions(self.max_expansions);

        let mut total = 0.0;
        let mut path: Vec<LatLon> = Vec::new();
        let mut segments = Vec::with_capacity(nodes.len().saturating_sub(1));

        for pair in nodes.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let leg = finder.shortest_path(from, to)?;

            if leg.is_reachable() {
                debug!(from, to, distance_m = leg.distance_meters, "routed segment");
            } else {
                debug!(from, to, "segment unreachable");
            }

            total += leg.distance_meters;
            segments.push(SegmentSummary {
                from,
                to,
                distance_meters: leg.distance_meters,
                reachable: leg.is_reachable(),
            });

            let skip = usize::from(!path.is_empty());
            path.extend(leg.path.into_iter().skip(skip));
        }

        Ok((total, path, segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::meters_to_degrees;
    use crate::graph::Node;

    /// Five nodes 100 m apart on the equator, linked both ways, plus an
    /// orphan close to the first node.
    fn fixture() -> (GraphCache, SpatialIndex) {
        let step = meters_to_degrees(100.0);
        let mut nodes: Vec<Node> = (0..5)
            .map(|i| Node {
                id: i + 1,
                lat: 0.0,
                lon: step * i as f64,
            })
            .collect();
        nodes.push(Node {
            id: 99,
            lat: 0.0,
            lon: -step / 10.0,
        });
        let mut edges = Vec::new();
        for i in 1..5 {
            edges.push((i, i + 1));
            edges.push((i + 1, i));
        }
        let graph = GraphCache::from_parts(nodes, edges);
        let index = SpatialIndex::build(&graph);
        (graph, index)
    }

    fn point(node: NodeId) -> LatLon {
        let step = meters_to_degrees(100.0);
        LatLon::new(0.0, step * (node - 1) as f64)
    }

    #[test]
    fn needs_two_waypoints() {
        let (graph, index) = fixture();
        let err = RouteComposer::new(&graph, &index)
            .route(&[point(1)])
            .expect_err("single waypoint");
        assert!(matches!(err, Error::InsufficientWaypoints { count: 1 }));
    }

    #[test]
    fn connected_snap_skips_orphan() {
        let (graph, index) = fixture();
        let composer = RouteComposer::new(&graph, &index);
        let near_orphan = LatLon::new(0.0, -meters_to_degrees(10.0));

        let plan = composer.route(&[near_orphan, point(3)]).expect("routes");
        assert_eq!(plan.waypoints[0].node, 1);

        let plan = composer
            .plan(&RouteRequest::between(near_orphan, point(3)).with_snap(SnapPolicy::Nearest))
            .expect("routes");
        assert_eq!(plan.waypoints[0].node, 99);
        assert!(!plan.is_reachable());
    }

    #[test]
    fn stitches_legs_without_duplicate_junction() {
        let (graph, index) = fixture();
        let composer = RouteComposer::new(&graph, &index);

        let plan = composer
            .plan(&RouteRequest::multi_stop(point(1), [point(3)], point(5)))
            .expect("routes");

        assert_eq!(plan.stops_count, 1);
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.path.len(), 3 + 3 - 1);
        assert!((plan.distance_meters - 400.0).abs() < 1e-6);
        let leg_sum: f64 = plan.segments.iter().map(|s| s.distance_meters).sum();
        assert_eq!(plan.distance_meters, leg_sum);
    }

    #[test]
    fn backtracking_stop_keeps_both_passes() {
        let (graph, index) = fixture();
        let plan = RouteComposer::new(&graph, &index)
            .route(&[point(1), point(3), point(2)])
            .expect("routes");
        let lons: Vec<f64> = plan.path.iter().map(|p| p.lon).collect();
        assert_eq!(lons, vec![point(1).lon, point(2).lon, point(3).lon, point(2).lon]);
    }

    #[test]
    fn snap_distance_limit_rejects_far_waypoints() {
        let (graph, index) = fixture();
        let composer = RouteComposer::new(&graph, &index).with_max_snap_distance(Some(50.0));
        let far = LatLon::new(0.01, 0.0);

        let err = composer.route(&[point(1), far]).expect_err("too far");
        assert!(matches!(err, Error::UnresolvableWaypoint { index: 1, .. }));
    }

    #[test]
    fn unreachable_leg_makes_total_infinite() {
        let step = meters_to_degrees(100.0);
        let graph = GraphCache::from_parts(
            (0..4).map(|i| Node {
                id: i + 1,
                lat: 0.0,
                lon: step * i as f64,
            }),
            [(1, 2), (2, 1), (3, 4), (4, 3)],
        );
        let index = SpatialIndex::build(&graph);
        let composer = RouteComposer::new(&graph, &index);

        let plan = composer
            .route(&[point(1), point(2), point(4)])
            .expect("waypoints resolve");

        assert!(!plan.is_reachable());
        assert_eq!(plan.unreachable_segments(), 1);
        assert!(plan.segments[0].reachable);
        assert_eq!(plan.path.len(), 2, "only the reachable leg is drawn");
    }
}
