//! Uniform lat/lon grid for nearest-node lookups.
//!
//! Nodes are bucketed by `floor(lon / cell)` and `floor(lat / cell)`. A query
//! inspects the square ring of cells at Chebyshev radius 0, 1, 2, ... around
//! its own cell and stops at the first ring that contains a candidate. When
//! no ring up to the configured bound yields a candidate the index falls back
//! to a linear scan, so lookups only come back empty for an empty index.
//!
//! The first non-empty ring is not guaranteed to contain the globally closest
//! node (a node just across a ring boundary can be nearer); this matches the
//! behavior the routing service has always had.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::geo::haversine_meters;
use crate::graph::{GraphCache, NodeId};

/// Default cell edge length in degrees.
pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.005;

/// Default number of rings searched before the linear-scan fallback.
pub const DEFAULT_MAX_RING_RADIUS: u32 = 8;

/// Smallest accepted cell edge length in degrees (roughly 1 cm).
pub const MIN_CELL_SIZE_DEG: f64 = 1e-7;

/// Largest accepted ring bound.
pub const MAX_RING_RADIUS_LIMIT: u32 = 1024;

type CellKey = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct IndexedNode {
    id: NodeId,
    lat: f64,
    lon: f64,
    routable: bool,
}

/// Result of snapping a coordinate to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snap {
    pub node: NodeId,
    pub distance_meters: f64,
}

/// Which nodes are eligible as query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeFilter {
    /// Every indexed node.
    #[default]
    Any,
    /// Only nodes that can start or end a route.
    Connected,
}

impl NodeFilter {
    fn accepts(self, node: &IndexedNode) -> bool {
        match self {
            NodeFilter::Any => true,
            NodeFilter::Connected => node.routable,
        }
    }
}

/// Grid-bucketed index over every node of a [`GraphCache`].
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size_deg: f64,
    max_ring_radius: u32,
    cells: HashMap<CellKey, Vec<IndexedNode>>,
    /// Lowest and highest occupied cell coordinates.
    extent: Option<(CellKey, CellKey)>,
    len: usize,
}

impl SpatialIndex {
    /// Build the index with the default cell size and ring bound.
    pub fn build(graph: &GraphCache) -> Self {
        Self::with_settings(graph, DEFAULT_CELL_SIZE_DEG, DEFAULT_MAX_RING_RADIUS)
    }

    /// Build the index with an explicit cell size (degrees) and ring bound.
    ///
    /// `cell_size_deg` must be positive and finite; configuration validation
    /// guarantees this for indexes built by the provider.
    pub fn with_settings(graph: &GraphCache, cell_size_deg: f64, max_ring_radius: u32) -> Self {
        let mut cells: HashMap<CellKey, Vec<IndexedNode>> = HashMap::new();
        let mut len = 0usize;

        for node in graph.nodes() {
            let key = cell_key(cell_size_deg, node.lat, node.lon);
            cells.entry(key).or_default().push(IndexedNode {
                id: node.id,
                lat: node.lat,
                lon: node.lon,
                routable: graph.is_routable(node.id),
            });
            len += 1;
        }

        // Stable candidate order keeps equidistant ties deterministic.
        for bucket in cells.values_mut() {
            bucket.sort_unstable_by_key(|node| node.id);
        }

        let extent = cells.keys().fold(None, |acc: Option<(CellKey, CellKey)>, &(x, y)| {
            Some(match acc {
                Some(((lx, ly), (hx, hy))) => ((lx.min(x), ly.min(y)), (hx.max(x), hy.max(y))),
                None => ((x, y), (x, y)),
            })
        });

        info!(
            nodes = len,
            cells = cells.len(),
            cell_size_deg,
            "built grid index"
        );

        Self {
            cell_size_deg,
            max_ring_radius,
            cells,
            extent,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size_deg(&self) -> f64 {
        self.cell_size_deg
    }

    pub fn max_ring_radius(&self) -> u32 {
        self.max_ring_radius
    }

    /// Closest node to `(lat, lon)`.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.nearest_within(lat, lon, NodeFilter::Any)
            .map(|snap| snap.node)
    }

    /// Closest node with at least one outgoing edge to `(lat, lon)`.
    pub fn nearest_connected(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.nearest_within(lat, lon, NodeFilter::Connected)
            .map(|snap| snap.node)
    }

    /// Ring search restricted to nodes accepted by `filter`.
    pub fn nearest_within(&self, lat: f64, lon: f64, filter: NodeFilter) -> Option<Snap> {
        if self.is_empty() {
            return None;
        }

        let (cx, cy) = cell_key(self.cell_size_deg, lat, lon);
        for radius in 0..=self.last_useful_ring(cx, cy) {
            let mut best: Option<Snap> = None;
            for key in ring_cells(cx, cy, radius) {
                if let Some(bucket) = self.cells.get(&key) {
                    closest_in(bucket.iter(), lat, lon, filter, &mut best);
                }
            }
            if best.is_some() {
                return best;
            }
        }

        let mut best = None;
        closest_in(self.cells.values().flatten(), lat, lon, filter, &mut best);
        best
    }
}

impl SpatialIndex {
    /// Ring bound clipped to the occupied part of the grid: rings past the
    /// farthest occupied cell are always empty.
    fn last_useful_ring(&self, cx: i64, cy: i64) -> i64 {
        let reach = self.extent.map_or(0, |((lx, ly), (hx, hy))| {
            cx.abs_diff(lx)
                .max(cx.abs_diff(hx))
                .max(cy.abs_diff(ly))
                .max(cy.abs_diff(hy))
        });
        // Bounded by a u32, so the cast back is lossless.
        reach.min(u64::from(self.max_ring_radius)) as i64
    }
}

fn closest_in<'a>(
    candidates: impl Iterator<Item = &'a IndexedNode>,
    lat: f64,
    lon: f64,
    filter: NodeFilter,
    best: &mut Option<Snap>,
) {
    for node in candidates.filter(|node| filter.accepts(node)) {
        let distance = haversine_meters(lat, lon, node.lat, node.lon);
        let closer = match best {
            Some(current) => {
                distance < current.distance_meters
                    || (distance == current.distance_meters && node.id < current.node)
            }
            None => true,
        };
        if closer {
            *best = Some(Snap {
                node: node.id,
                distance_meters: distance,
            });
        }
    }
}

/// Float-to-int casts saturate, so out-of-range quotients clamp to the
/// outermost cells.
fn cell_key(cell_size_deg: f64, lat: f64, lon: f64) -> CellKey {
    (
        (lon / cell_size_deg).floor() as i64,
        (lat / cell_size_deg).floor() as i64,
    )
}

/// Cells on the perimeter of the square at Chebyshev distance `radius`.
fn ring_cells(cx: i64, cy: i64, radius: i64) -> impl Iterator<Item = CellKey> {
    (-radius..=radius).flat_map(move |dx| {
        (-radius..=radius)
            .filter(move |dy| dx.abs() == radius || dy.abs() == radius)
            .map(move |dy| (cx.saturating_add(dx), cy.saturating_add(dy)))
    })
}
