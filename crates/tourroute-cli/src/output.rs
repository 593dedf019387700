//! Output formatting for route, POI, nearest-node and stats results.
//!
//! Text renderers return strings so they can be checked without capturing
//! stdout; `main` prints them.

use std::cmp::Reverse;
use std::fmt::Write as _;
use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use tourroute_lib::poi::group_by_category;
use tourroute_lib::{
    CategoryWeights, GraphStats, LatLon, Node, PoiRoute, RoutePlan, Snap, SpatialIndex,
};

use crate::terminal::{format_distance, group_digits, ColorPalette};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON with camelCase keys.
    Json,
}

/// Result of a `nearest` query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestOutput {
    pub query: LatLon,
    pub node: Node,
    pub distance_meters: f64,
    pub routable: bool,
}

impl NearestOutput {
    pub fn new(query: LatLon, node: Node, snap: Snap, routable: bool) -> Self {
        Self {
            query,
            node,
            distance_meters: snap.distance_meters,
            routable,
        }
    }
}

/// Dataset summary printed by `stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOutput {
    pub dataset: String,
    #[serde(flatten)]
    pub graph: GraphStats,
    pub cells: usize,
    pub cell_size_deg: f64,
}

impl StatsOutput {
    pub fn new(dataset: &std::path::Path, graph: GraphStats, index: &SpatialIndex) -> Self {
        Self {
            dataset: dataset.display().to_string(),
            graph,
            cells: index.cell_count(),
            cell_size_deg: index.cell_size_deg(),
        }
    }
}

/// Write `value` as pretty JSON followed by a newline.
///
/// Non-finite distances serialize as `null`.
pub fn render_json<T: Serialize>(value: &T) -> io::Result<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::other)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// Route summary followed by the path using `+`/`|`/`-` prefixes for
/// first, middle and last points.
pub fn format_route(plan: &RoutePlan, palette: &ColorPalette) -> String {
    let p = palette;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}Route: {}{} ({} points, {} stops)",
        p.white_bold,
        format_distance(plan.distance_meters),
        p.reset,
        plan.path.len(),
        plan.stops_count
    );

    for waypoint in &plan.waypoints {
        let _ = writeln!(
            out,
            "{}waypoint {} {} -> node {} ({:.1} m away){}",
            p.gray,
            waypoint.index,
            waypoint.requested,
            waypoint.node,
            waypoint.snap_distance_meters,
            p.reset
        );
    }

    if plan.segments.len() > 1 || !plan.is_reachable() {
        for segment in &plan.segments {
            let (color, label) = if segment.reachable {
                (p.green, format_distance(segment.distance_meters))
            } else {
                (p.red, "unreachable".to_string())
            };
            let _ = writeln!(
                out,
                "leg {} -> {}: {}{}{}",
                segment.from, segment.to, color, label, p.reset
            );
        }
    }

    if !plan.is_reachable() {
        let _ = writeln!(
            out,
            "{}No path connects every waypoint ({} unreachable legs).{}",
            p.red,
            plan.unreachable_segments(),
            p.reset
        );
    }

    let len = plan.path.len();
    for (i, point) in plan.path.iter().enumerate() {
        let prefix = if i == 0 {
            '+'
        } else if i + 1 == len {
            '-'
        } else {
            '|'
        };
        let _ = writeln!(out, "{prefix} {point}");
    }
    out
}

/// Route followed by its POIs grouped by category, heaviest category first.
pub fn format_poi_route(route: &PoiRoute, palette: &ColorPalette) -> String {
    let p = palette;
    let mut out = format_route(&route.plan, palette);

    let _ = writeln!(
        out,
        "\n{}Points of interest: {}{}",
        p.white_bold,
        route.pois.len(),
        p.reset
    );
    let _ = writeln!(
        out,
        "{}interests: {}{}",
        p.gray,
        format_interests(&route.user_interests),
        p.reset
    );

    let groups = group_by_category(&route.pois);
    let mut categories: Vec<&str> = groups.keys().copied().collect();
    categories.sort_by_key(|c| (Reverse(route.user_interests.weight(c)), *c));

    for category in categories {
        let _ = writeln!(
            out,
            "{}{category}{} (weight {})",
            p.cyan,
            p.reset,
            route.user_interests.weight(category)
        );
        for poi in &groups[category] {
            let _ = writeln!(
                out,
                " - {} {}{}{}",
                poi.name,
                p.gray,
                poi.position(),
                p.reset
            );
        }
    }
    out
}

pub fn format_nearest(nearest: &NearestOutput, palette: &ColorPalette) -> String {
    let p = palette;
    format!(
        "Nearest node to {}: {}{}{} at {} ({:.1} m away, {})\n",
        nearest.query,
        p.white_bold,
        nearest.node.id,
        p.reset,
        nearest.node.position(),
        nearest.distance_meters,
        if nearest.routable {
            "routable"
        } else {
            "not routable"
        }
    )
}

pub fn format_stats(stats: &StatsOutput, palette: &ColorPalette) -> String {
    let p = palette;
    let count = group_digits;
    let mut out = String::new();
    let _ = writeln!(out, "{}Dataset: {}{}", p.white_bold, stats.dataset, p.reset);
    let _ = writeln!(out, "Nodes:          {}", count(stats.graph.nodes));
    let _ = writeln!(out, "Edges:          {}", count(stats.graph.edges));
    let _ = writeln!(out, "Components:     {}", count(stats.graph.components));
    let _ = writeln!(out, "Routable nodes: {}", count(stats.graph.routable_nodes));
    let _ = writeln!(
        out,
        "Grid cells:     {} ({} deg)",
        count(stats.cells),
        stats.cell_size_deg
    );
    if stats.graph.skipped_rows > 0 || stats.graph.dropped_edges > 0 {
        let _ = writeln!(
            out,
            "{}Ignored:        {} malformed rows, {} dangling edges{}",
            p.gray,
            count(stats.graph.skipped_rows),
            count(stats.graph.dropped_edges),
            p.reset
        );
    }
    out
}

/// Categories and weights as `category=weight` pairs.
pub fn format_interests(weights: &CategoryWeights) -> String {
    let mut categories: Vec<String> = weights.categories().into_iter().collect();
    categories.sort();
    categories
        .iter()
        .map(|c| format!("{c}={}", weights.weight(c)))
        .collect::<Vec<_>>()
        .join(", ")
}
