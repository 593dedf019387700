use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{valid_coordinate, Dataset, EdgeRow};
use crate::error::Result;
use crate::geo::{haversine_meters, LatLon};

/// Identifier of a node in the routing dataset.
pub type NodeId = i64;

/// Identifier of a component discovered by the connectivity pass.
pub type ComponentId = u32;

/// A routable point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    /// Great-circle distance to another node in meters.
    pub fn distance_to(&self, other: &Node) -> f64 {
        haversine_meters(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Directed edge leaving a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub to: NodeId,
    /// Haversine distance between the endpoints.
    pub weight_meters: f64,
}

/// Summary counts for a loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub routable_nodes: usize,
    pub skipped_rows: usize,
    pub dropped_edges: usize,
}

/// In-memory node/edge graph with precomputed connectivity.
///
/// Built once and only read afterwards, so a single instance can be shared
/// across threads without locking.
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    nodes: HashMap<NodeId, Node>,
    adjacency: HashMap<NodeId, Vec<Edge>>,
    components: HashMap<NodeId, ComponentId>,
    component_sizes: Vec<usize>,
    edge_count: usize,
    skipped_rows: usize,
    dropped_edges: usize,
}

impl GraphCache {
    /// Load every node and edge from the dataset at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let dataset = Dataset::open(path)?;
        Self::from_dataset(&dataset)
    }

    /// Build the cache from an already opened dataset.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let nodes = dataset.load_nodes()?;
        let edges = dataset.load_edges()?;

        let mut graph = Self::build(nodes.rows, edges.rows);
        graph.skipped_rows = nodes.skipped + edges.skipped;
        graph.log_summary();
        Ok(graph)
    }

    /// Build the cache from in-memory rows.
    ///
    /// Rows follow the same rules as a dataset load: nodes with invalid
    /// coordinates are skipped and edges referencing unknown nodes are
    /// dropped.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Self {
        let mut skipped = 0usize;
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| {
                let keep = valid_coordinate(node.lat, node.lon);
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .collect();
        let edges = edges
            .into_iter()
            .map(|(from, to)| EdgeRow { from, to })
            .collect();

        let mut graph = Self::build(nodes, edges);
        graph.skipped_rows = skipped;
        graph
    }

    fn build(nodes: Vec<Node>, edges: Vec<EdgeRow>) -> Self {
        let mut node_map: HashMap<NodeId, Node> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            node_map.insert(node.id, node);
        }

        let mut adjacency: HashMap<NodeId, Vec<Edge>> = HashMap::new();
        let mut edge_count = 0usize;
        let mut dropped_edges = 0usize;
        for EdgeRow { from, to } in edges {
            let (Some(a), Some(b)) = (node_map.get(&from), node_map.get(&to)) else {
                dropped_edges += 1;
                continue;
            };
            adjacency.entry(from).or_default().push(Edge {
                to,
                weight_meters: a.distance_to(b),
            });
            edge_count += 1;
        }

        if dropped_edges > 0 {
            warn!(dropped_edges, "ignored edges referencing unknown nodes");
        }

        let mut graph = Self {
            nodes: node_map,
            adjacency,
            components: HashMap::new(),
            component_sizes: Vec::new(),
            edge_count,
            skipped_rows: 0,
            dropped_edges,
        };
        graph.compute_components();
        graph
    }

    /// Stamp every node with the id of the traversal that first reached it.
    ///
    /// Traversals follow edges in their stored direction only, so a node that
    /// only points *into* a component can end up in a component of its own.
    /// The numbering is reported in stats and is not a reachability guarantee.
    fn compute_components(&mut self) {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();

        let mut components: HashMap<NodeId, ComponentId> = HashMap::with_capacity(ids.len());
        let mut sizes: Vec<usize> = Vec::new();
        let mut queue = VecDeque::new();

        for start in ids {
            if components.contains_key(&start) {
                continue;
            }

            let component = sizes.len() as ComponentId;
            let mut size = 0usize;
            components.insert(start, component);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                size += 1;
                for edge in self.neighbors(current) {
                    if components.contains_key(&edge.to) {
                        continue;
                    }
                    components.insert(edge.to, component);
                    queue.push_back(edge.to);
                }
            }
            sizes.push(size);
        }

        self.components = components;
        self.component_sizes = sizes;
    }

    fn log_summary(&self) {
        info!(
            nodes = self.node_count(),
            edges = self.edge_count,
            components = self.component_count(),
            skipped_rows = self.skipped_rows,
            dropped_edges = self.dropped_edges,
            "loaded routing graph"
        );
    }

    /// Lookup a node by identifier.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate over every node in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Outgoing edges of `id`, in dataset order. Unknown ids have none.
    pub fn neighbors(&self, id: NodeId) -> &[Edge] {
        self.adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_outgoing(&self, id: NodeId) -> bool {
        !self.neighbors(id).is_empty()
    }

    pub fn component_of(&self, id: NodeId) -> Option<ComponentId> {
        self.components.get(&id).copied()
    }

    /// Number of nodes stamped with `component`.
    pub fn component_size(&self, component: ComponentId) -> usize {
        self.component_sizes
            .get(component as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Whether `id` may serve as a route endpoint: it has an outgoing edge.
    ///
    /// Component numbering depends on traversal order, so it never decides
    /// eligibility.
    pub fn is_routable(&self, id: NodeId) -> bool {
        self.has_outgoing(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn component_count(&self) -> usize {
        self.component_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count,
            components: self.component_count(),
            routable_nodes: self.nodes.keys().filter(|id| self.is_routable(**id)).count(),
            skipped_rows: self.skipped_rows,
            dropped_edges: self.dropped_edges,
        }
    }
}
