use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::LatLon;
use crate::graph::{GraphCache, Node, NodeId};

/// Node sequence produced by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePath {
    pub distance_meters: f64,
    pub nodes: Vec<NodeId>,
}

impl NodePath {
    pub fn no_path() -> Self {
        Self {
            distance_meters: f64::INFINITY,
            nodes: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.distance_meters.is_finite()
    }
}

/// Route geometry returned to callers.
///
/// An infinite distance with an empty path means no path exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub distance_meters: f64,
    pub path: Vec<LatLon>,
}

impl PathResult {
    pub fn no_path() -> Self {
        Self {
            distance_meters: f64::INFINITY,
            path: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.distance_meters.is_finite()
    }
}

/// A* search over a [`GraphCache`] using the Haversine distance to the target
/// as heuristic.
///
/// Edge weights are Haversine distances as well, so the heuristic never
/// overestimates and the first time the target is popped its cost is optimal.
/// Every call allocates its own search state; a finder can be shared freely.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'g> {
    graph: &'g GraphCache,
    max_expansions: Option<usize>,
}

impl<'g> PathFinder<'g> {
    pub fn new(graph: &'g GraphCache) -> Self {
        Self {
            graph,
            max_expansions: None,
        }
    }

    /// Give up with the no-path result after `limit` node expansions.
    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    /// Shortest path between two nodes as coordinates.
    pub fn shortest_path(&self, source: NodeId, target: NodeId) -> Result<PathResult> {
        let found = self.find_node_path(source, target)?;
        if !found.is_reachable() {
            return Ok(PathResult::no_path());
        }

        let mut path = Vec::with_capacity(found.nodes.len());
        for id in &found.nodes {
            let node = self.node(*id)?;
            path.push(node.position());
        }

        Ok(PathResult {
            distance_meters: found.distance_meters,
            path,
        })
    }

    /// Shortest path between two nodes as node identifiers.
    pub fn find_node_path(&self, source: NodeId, target: NodeId) -> Result<NodePath> {
        let source_node = self.node(source)?;
        let target_node = self.node(target)?;

        if source == target {
            return Ok(NodePath {
                distance_meters: 0.0,
                nodes: vec![source],
            });
        }

        let mut g_score: HashMap<NodeId, f64> = HashMap::new();
        let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
        let mut closed: HashSet<NodeId> = HashSet::new();
        let mut open = BinaryHeap::new();

        g_score.insert(source, 0.0);
        open.push(AStarEntry::new(
            source,
            0.0,
            source_node.distance_to(target_node),
        ));

        let mut expansions = 0usize;
        while let Some(entry) = open.pop() {
            // Stale duplicates of an already settled node.
            if !closed.insert(entry.node) {
                continue;
            }

            if entry.node == target {
                let distance = entry.cost.0;
                return Ok(reconstruct_path(&came_from, source, target)
                    .map(|nodes| NodePath {
                        distance_meters: distance,
                        nodes,
                    })
                    .unwrap_or_else(NodePath::no_path));
            }

            expansions += 1;
            if self.max_expansions.is_some_and(|limit| expansions > limit) {
                debug!(source, target, expansions, "expansion cap reached");
                return Ok(NodePath::no_path());
            }

            for edge in self.graph.neighbors(entry.node) {
                if closed.contains(&edge.to) {
                    continue;
                }

                let tentative_g = entry.cost.0 + edge.weight_meters;
                if tentative_g < g_score.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                    let Some(next) = self.graph.node(edge.to) else {
                        continue;
                    };
                    g_score.insert(edge.to, tentative_g);
                    came_from.insert(edge.to, entry.node);
                    open.push(AStarEntry::new(
                        edge.to,
                        tentative_g,
                        next.distance_to(target_node),
                    ));
                }
            }
        }

        debug!(source, target, expansions, "no path between nodes");
        Ok(NodePath::no_path())
    }

    fn node(&self, id: NodeId) -> Result<&'g Node> {
        self.graph.node(id).ok_or(Error::InvalidNode { id })
    }
}

/// Walk predecessors back from `target`. `None` if the chain is broken.
fn reconstruct_path(
    came_from: &HashMap<NodeId, NodeId>,
    source: NodeId,
    target: NodeId,
) -> Option<Vec<NodeId>> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        current = *came_from.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct AStarEntry {
    node: NodeId,
    cost: FloatOrd,
    estimate: FloatOrd,
}

impl AStarEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
        }
    }
}

impl Ord for AStarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap pops the smallest estimate first.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for AStarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
