//! One-time construction of the shared routing state.
//!
//! The graph and grid index are expensive to build and immutable afterwards,
//! so a [`GraphProvider`] builds them on first use and hands out the same
//! [`Arc<RoutingContext>`] to every later caller. Concurrent first calls are
//! serialized by the cell; only one of them performs the load.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::config::RoutingConfig;
use crate::error::Result;
use crate::geo::LatLon;
use crate::graph::{GraphCache, Node, NodeId};
use crate::path::{PathFinder, PathResult};
use crate::poi::{augment_route, CategoryWeights, PoiCatalog, PoiRecord, PoiRoute};
use crate::routing::{RouteComposer, RoutePlan, RouteRequest};
use crate::spatial::{NodeFilter, Snap, SpatialIndex};

/// Loaded graph, grid index and the settings used to query them.
#[derive(Debug)]
pub struct RoutingContext {
    graph: GraphCache,
    index: SpatialIndex,
    config: RoutingConfig,
    dataset_path: PathBuf,
}

impl RoutingContext {
    /// Load the dataset named by `config` and build the grid index.
    pub fn load(config: &RoutingConfig) -> Result<Self> {
        config.validate()?;
        let dataset_path = config.resolved_dataset_path()?;

        let total_start = Instant::now();
        let graph = GraphCache::load(&dataset_path)?;
        let graph_load_ms = total_start.elapsed().as_millis();

        let index_start = Instant::now();
        let index =
            SpatialIndex::with_settings(&graph, config.grid_cell_size_deg, config.max_ring_radius);
        let index_build_ms = index_start.elapsed().as_millis();

        info!(
            graph_load_ms,
            index_build_ms,
            total_init_ms = total_start.elapsed().as_millis(),
            path = %dataset_path.display(),
            "routing context ready"
        );

        Ok(Self {
            graph,
            index,
            config: config.clone(),
            dataset_path,
        })
    }

    /// Wrap an already built graph; the index is built from `config`.
    pub fn from_graph(graph: GraphCache, config: RoutingConfig) -> Result<Self> {
        config.validate()?;
        let index =
            SpatialIndex::with_settings(&graph, config.grid_cell_size_deg, config.max_ring_radius);
        let dataset_path = config.dataset_path.clone().unwrap_or_default();
        Ok(Self {
            graph,
            index,
            config,
            dataset_path,
        })
    }

    pub fn graph(&self) -> &GraphCache {
        &self.graph
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn dataset_path(&self) -> &std::path::Path {
        &self.dataset_path
    }

    pub fn path_finder(&self) -> PathFinder<'_> {
        PathFinder::new(&self.graph).with_max_expansions(self.config.max_expansions)
    }

    pub fn composer(&self) -> RouteComposer<'_> {
        RouteComposer::new(&self.graph, &self.index)
            .with_max_expansions(self.config.max_expansions)
            .with_max_snap_distance(self.config.max_snap_distance_meters)
    }

    pub fn shortest_path(&self, source: NodeId, target: NodeId) -> Result<PathResult> {
        self.path_finder().shortest_path(source, target)
    }

    pub fn route(&self, request: &RouteRequest) -> Result<RoutePlan> {
        self.composer().plan(request)
    }

    /// Closest node to `point`, optionally restricted to routable nodes.
    pub fn snap(&self, point: LatLon, filter: NodeFilter) -> Option<(Node, Snap)> {
        let snap = self.index.nearest_within(point.lat, point.lon, filter)?;
        self.graph.node(snap.node).map(|node| (*node, snap))
    }

    pub fn nearest(&self, point: LatLon) -> Option<NodeId> {
        self.index.nearest(point.lat, point.lon)
    }

    pub fn nearest_connected(&self, point: LatLon) -> Option<NodeId> {
        self.index.nearest_connected(point.lat, point.lon)
    }

    /// Route `request` and attach POIs from the configured POI dataset.
    pub fn route_with_pois(
        &self,
        request: &RouteRequest,
        weights: &CategoryWeights,
    ) -> Result<PoiRoute> {
        let plan = self.route(request)?;
        let catalog = self.poi_catalog(weights)?;
        Ok(augment_route(plan, &catalog, weights))
    }

    /// POIs in the weighted categories near `path`, heaviest category first.
    pub fn pois_along(
        &self,
        path: &[LatLon],
        weights: &CategoryWeights,
    ) -> Result<Vec<PoiRecord>> {
        Ok(self.poi_catalog(weights)?.along(path, weights))
    }

    fn poi_catalog(&self, weights: &CategoryWeights) -> Result<PoiCatalog> {
        let poi_path = self.config.poi_path.as_deref().unwrap_or(self.dataset_path.as_path());
        PoiCatalog::load_for_categories(poi_path, &weights.categories())
    }
}

/// Builds the [`RoutingContext`] at most once.
#[derive(Debug)]
pub struct GraphProvider {
    config: RoutingConfig,
    context: OnceCell<Arc<RoutingContext>>,
}

impl GraphProvider {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            context: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Shared routing state, loading it on the first call.
    ///
    /// A failed load is returned to the caller and nothing is cached, so the
    /// next call retries.
    pub fn context(&self) -> Result<Arc<RoutingContext>> {
        self.context
            .get_or_try_init(|| {
                RoutingContext::load(&self.config)
                    .map(Arc::new)
                    .inspect_err(|e| error!(error = %e, "routing context initialization failed"))
            })
            .cloned()
    }

    /// Whether the context has already been built.
    pub fn is_loaded(&self) -> bool {
        self.context.get().is_some()
    }
}
