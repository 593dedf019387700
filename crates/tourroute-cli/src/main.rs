use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tourroute_cli::logging::{init_tracing, LogFormat};
use tourroute_cli::output::{
    format_nearest, format_poi_route, format_route, format_stats, render_json, NearestOutput,
    OutputFormat, StatsOutput,
};
use tourroute_cli::terminal::ColorPalette;
use tourroute_lib::{
    CategoryWeights, GraphProvider, Interest, LatLon, NodeFilter, RouteRequest, RoutingConfig,
    RoutingContext, SnapPolicy,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Shortest routes, multi-stop tours and POI suggestions over a SQLite road graph"
)]
struct Cli {
    /// Node/edge SQLite dataset. Overrides the config file and TOURROUTE_DATASET.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Separate SQLite file holding the `pois` table.
    #[arg(long, global = true)]
    poi_dataset: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reject waypoints farther than this many meters from any eligible node.
    #[arg(long, global = true, value_name = "METERS")]
    max_snap_distance: Option<f64>,

    /// Result format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Log format written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct Endpoints {
    /// Start coordinate as LAT,LON.
    #[arg(long, allow_hyphen_values = true)]
    from: LatLon,

    /// End coordinate as LAT,LON.
    #[arg(long, allow_hyphen_values = true)]
    to: LatLon,

    /// Snap waypoints to the closest node even when it cannot be routed from.
    #[arg(long)]
    snap_any: bool,
}

impl Endpoints {
    fn request(&self, stops: &[LatLon]) -> RouteRequest {
        let snap = if self.snap_any {
            SnapPolicy::Nearest
        } else {
            SnapPolicy::NearestConnected
        };
        RouteRequest::multi_stop(self.from, stops.iter().copied(), self.to).with_snap(snap)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shortest path between two coordinates.
    Route {
        #[command(flatten)]
        endpoints: Endpoints,
    },
    /// Route from start to end through ordered intermediate stops.
    MultiStop {
        #[command(flatten)]
        endpoints: Endpoints,
        /// Intermediate stop as LAT,LON; repeat in visiting order.
        #[arg(long = "stop", allow_hyphen_values = true)]
        stops: Vec<LatLon>,
    },
    /// Route with nearby points of interest ranked by category weight.
    Poi {
        #[command(flatten)]
        endpoints: Endpoints,
        /// Intermediate stop as LAT,LON; repeat in visiting order.
        #[arg(long = "stop", allow_hyphen_values = true)]
        stops: Vec<LatLon>,
        /// Category of interest as CATEGORY=WEIGHT (or CATEGORY for weight 1).
        #[arg(long = "interest")]
        interests: Vec<Interest>,
        /// JSON object mapping categories to weights, e.g. {"museum": 3}.
        #[arg(long)]
        interests_file: Option<PathBuf>,
    },
    /// Closest node to a coordinate.
    Nearest {
        /// Query coordinate as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        at: LatLon,
        /// Only consider nodes that can start or end a route.
        #[arg(long)]
        connected: bool,
    },
    /// Node, edge, component and grid counts for the dataset.
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = build_config(&cli)?;
    let provider = GraphProvider::new(config);
    let context = load_context(&provider)?;
    let palette = ColorPalette::detect();

    match &cli.command {
        Command::Route { endpoints } => {
            handle_route(&context, &endpoints.request(&[]), cli.format, &palette)
        }
        Command::MultiStop { endpoints, stops } => {
            handle_route(&context, &endpoints.request(stops), cli.format, &palette)
        }
        Command::Poi {
            endpoints,
            stops,
            interests,
            interests_file,
        } => {
            let weights = collect_interests(interests, interests_file.as_ref())?;
            handle_poi(
                &context,
                &endpoints.request(stops),
                &weights,
                cli.format,
                &palette,
            )
        }
        Command::Nearest { at, connected } => {
            handle_nearest(&context, *at, *connected, cli.format, &palette)
        }
        Command::Stats => handle_stats(&context, cli.format, &palette),
    }
}

/// Defaults, then the config file, then `TOURROUTE_*` variables, then flags.
fn build_config(cli: &Cli) -> Result<RoutingConfig> {
    let mut config = match &cli.config {
        Some(path) => RoutingConfig::from_json_file(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?,
        None => RoutingConfig::default(),
    };
    config
        .apply_env()
        .context("invalid TOURROUTE_* environment variable")?;

    if let Some(path) = &cli.dataset {
        config.dataset_path = Some(path.clone());
    }
    if let Some(path) = &cli.poi_dataset {
        config.poi_path = Some(path.clone());
    }
    if let Some(limit) = cli.max_snap_distance {
        config.max_snap_distance_meters = Some(limit);
    }
    config.validate().context("invalid routing configuration")?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn load_context(provider: &GraphProvider) -> Result<Arc<RoutingContext>> {
    let dataset = provider
        .config()
        .resolved_dataset_path()
        .context("could not determine the dataset location; pass --dataset")?;
    provider
        .context()
        .with_context(|| format!("failed to load routing dataset from {}", dataset.display()))
}

fn collect_interests(
    interests: &[Interest],
    interests_file: Option<&PathBuf>,
) -> Result<CategoryWeights> {
    let mut weights = match interests_file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read interests file {}", path.display()))?;
            CategoryWeights::from_json(&raw)
                .with_context(|| format!("invalid interests file {}", path.display()))?
        }
        None => CategoryWeights::new(),
    };
    for interest in interests {
        weights.insert(interest.category.clone(), interest.weight);
    }
    if weights.is_empty() {
        bail!("at least one --interest CATEGORY=WEIGHT (or --interests-file) is required");
    }
    Ok(weights)
}

fn handle_route(
    context: &RoutingContext,
    request: &RouteRequest,
    format: OutputFormat,
    palette: &ColorPalette,
) -> Result<()> {
    let plan = context.route(request).context("failed to plan route")?;
    match format {
        OutputFormat::Json => render_json(&plan)?,
        OutputFormat::Text => print!("{}", format_route(&plan, palette)),
    }
    Ok(())
}

fn handle_poi(
    context: &RoutingContext,
    request: &RouteRequest,
    weights: &CategoryWeights,
    format: OutputFormat,
    palette: &ColorPalette,
) -> Result<()> {
    let route = context
        .route_with_pois(request, weights)
        .context("failed to plan route with points of interest")?;
    match format {
        OutputFormat::Json => render_json(&route)?,
        OutputFormat::Text => print!("{}", format_poi_route(&route, palette)),
    }
    Ok(())
}

fn handle_nearest(
    context: &RoutingContext,
    at: LatLon,
    connected: bool,
    format: OutputFormat,
    palette: &ColorPalette,
) -> Result<()> {
    let filter = if connected {
        NodeFilter::Connected
    } else {
        NodeFilter::Any
    };
    let Some((node, snap)) = context.snap(at, filter) else {
        if connected {
            bail!("the dataset has no routable nodes");
        }
        bail!("the dataset has no nodes");
    };

    let nearest = NearestOutput::new(at, node, snap, context.graph().is_routable(node.id));
    match format {
        OutputFormat::Json => render_json(&nearest)?,
        OutputFormat::Text => print!("{}", format_nearest(&nearest, palette)),
    }
    Ok(())
}

fn handle_stats(
    context: &RoutingContext,
    format: OutputFormat,
    palette: &ColorPalette,
) -> Result<()> {
    let stats = StatsOutput::new(
        context.dataset_path(),
        context.graph().stats(),
        context.index(),
    );
    match format {
        OutputFormat::Json => render_json(&stats)?,
        OutputFormat::Text => print!("{}", format_stats(&stats, palette)),
    }
    Ok(())
}
