//! Routing configuration.
//!
//! Values are layered: defaults, then an optional JSON file, then
//! environment variables. Command-line flags are applied last by the CLI.
//!
//! # Environment Variables
//!
//! - `TOURROUTE_DATASET`: path to the node/edge SQLite dataset
//! - `TOURROUTE_POI_DATASET`: path to a separate POI SQLite file
//! - `TOURROUTE_GRID_CELL_SIZE_DEG`: grid cell edge in degrees (default `0.005`)
//! - `TOURROUTE_MAX_RING_RADIUS`: rings searched before the linear scan (default `8`)
//! - `TOURROUTE_MAX_EXPANSIONS`: A* expansion cap, `0` disables it

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::spatial::{
    DEFAULT_CELL_SIZE_DEG, DEFAULT_MAX_RING_RADIUS, MAX_RING_RADIUS_LIMIT, MIN_CELL_SIZE_DEG,
};

/// Default filename of the routing dataset.
const DATASET_FILENAME: &str = "routing.db";

/// Default A* expansion cap.
pub const DEFAULT_MAX_EXPANSIONS: usize = 1_000_000;

pub const ENV_DATASET: &str = "TOURROUTE_DATASET";
pub const ENV_POI_DATASET: &str = "TOURROUTE_POI_DATASET";
pub const ENV_GRID_CELL_SIZE_DEG: &str = "TOURROUTE_GRID_CELL_SIZE_DEG";
pub const ENV_MAX_RING_RADIUS: &str = "TOURROUTE_MAX_RING_RADIUS";
pub const ENV_MAX_EXPANSIONS: &str = "TOURROUTE_MAX_EXPANSIONS";

/// Settings for the routing subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Node/edge dataset. Resolved to the platform data directory when unset.
    pub dataset_path: Option<PathBuf>,
    /// POI dataset. The routing dataset is used when unset.
    pub poi_path: Option<PathBuf>,
    pub grid_cell_size_deg: f64,
    pub max_ring_radius: u32,
    pub max_expansions: Option<usize>,
    /// Waypoints farther than this from every eligible node are rejected.
    pub max_snap_distance_meters: Option<f64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            poi_path: None,
            grid_cell_size_deg: DEFAULT_CELL_SIZE_DEG,
            max_ring_radius: DEFAULT_MAX_RING_RADIUS,
            max_expansions: Some(DEFAULT_MAX_EXPANSIONS),
            max_snap_distance_meters: None,
        }
    }
}

impl RoutingConfig {
    /// Configuration for a dataset at `path` with default tuning.
    pub fn for_dataset(path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Read a JSON configuration file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "loaded routing configuration file");
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields with any `TOURROUTE_*` variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup(ENV_DATASET).filter(|v| !v.is_empty()) {
            self.dataset_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_POI_DATASET).filter(|v| !v.is_empty()) {
            self.poi_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_GRID_CELL_SIZE_DEG) {
            self.grid_cell_size_deg = parse_var(ENV_GRID_CELL_SIZE_DEG, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RING_RADIUS) {
            self.max_ring_radius = parse_var(ENV_MAX_RING_RADIUS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_EXPANSIONS) {
            let limit: usize = parse_var(ENV_MAX_EXPANSIONS, &raw)?;
            self.max_expansions = (limit > 0).then_some(limit);
        }
        Ok(())
    }

    /// Reject values that would make the index or search misbehave.
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_cell_size_deg.is_finite() && self.grid_cell_size_deg >= MIN_CELL_SIZE_DEG)
        {
            return Err(Error::InvalidConfig {
                message: format!(
                    "grid cell size must be at least {MIN_CELL_SIZE_DEG} degrees, got {}",
                    self.grid_cell_size_deg
                ),
            });
        }
        if self.max_ring_radius > MAX_RING_RADIUS_LIMIT {
            return Err(Error::InvalidConfig {
                message: format!(
                    "max ring radius must be at most {MAX_RING_RADIUS_LIMIT}, got {}",
                    self.max_ring_radius
                ),
            });
        }
        if let Some(limit) = self.max_snap_distance_meters {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("max snap distance must be non-negative, got {limit}"),
                });
            }
        }
        Ok(())
    }

    /// Dataset path, falling back to the platform data directory.
    pub fn resolved_dataset_path(&self) -> Result<PathBuf> {
        match &self.dataset_path {
            Some(path) => Ok(path.clone()),
            None => default_dataset_path(),
        }
    }

    /// POI dataset path, falling back to the routing dataset.
    pub fn resolved_poi_path(&self) -> Result<PathBuf> {
        match &self.poi_path {
            Some(path) => Ok(path.clone()),
            None => self.resolved_dataset_path(),
        }
    }
}

/// Resolve the default dataset location using platform-specific project directories.
pub fn default_dataset_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("com", "tourroute", "tourroute").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATASET_FILENAME))
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::InvalidConfig {
        message: format!("{key} has invalid value '{raw}'"),
    })
}
