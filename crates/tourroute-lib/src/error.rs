use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Convenient result alias for the routing library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Dataset could not be located at the resolved path.
    #[error("dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    /// Dataset exists but could not be opened or read.
    #[error("failed to read dataset at {path}: {source}")]
    DataSource {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Raised when the dataset lacks the node or edge tables.
    #[error("unsupported dataset schema; expected nodes(id, lat, lon) and edges(from_node, to_node) tables")]
    UnsupportedSchema,

    /// Raised when a caller passes a node identifier absent from the graph.
    #[error("node {id} does not exist in the graph")]
    InvalidNode { id: NodeId },

    /// Raised when no connected node could be matched to a waypoint.
    #[error("no connected node near waypoint {index} ({lat}, {lon})")]
    UnresolvableWaypoint { index: usize, lat: f64, lon: f64 },

    /// Raised when a route request has fewer than two waypoints.
    #[error("a route needs at least two waypoints, got {count}")]
    InsufficientWaypoints { count: usize },

    /// Raised when configuration values are out of range.
    #[error("invalid routing configuration: {message}")]
    InvalidConfig { message: String },

    /// Raised when an interest weight string cannot be parsed.
    #[error("invalid interest '{value}'; expected CATEGORY=WEIGHT")]
    InvalidInterest { value: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the default dataset location")]
    ProjectDirsUnavailable,

    /// Wrapper for SQLite errors raised after the dataset was opened.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON configuration errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures raised while opening or validating a dataset.
    ///
    /// These abort construction of the routing subsystem.
    pub fn is_data_source(&self) -> bool {
        matches!(
            self,
            Error::DatasetNotFound { .. } | Error::DataSource { .. } | Error::UnsupportedSchema
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_source_classification() {
        let missing = Error::DatasetNotFound {
            path: PathBuf::from("missing.db"),
        };
        assert!(missing.is_data_source());
        assert!(Error::UnsupportedSchema.is_data_source());
        assert!(!Error::InvalidNode { id: 7 }.is_data_source());
    }

    #[test]
    fn waypoint_error_mentions_index() {
        let err = Error::UnresolvableWaypoint {
            index: 2,
            lat: 6.9,
            lon: 79.8,
        };
        assert!(err.to_string().contains("waypoint 2"));
    }
}
