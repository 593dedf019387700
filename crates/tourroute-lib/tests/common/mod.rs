//! Common test utilities and fixture helpers.
//!
//! Integration tests build small SQLite datasets on the fly so they run
//! without any checked-in map extract.

use std::path::PathBuf;

use rusqlite::{params, Connection};
use tempfile::TempDir;
use tourroute_lib::geo::meters_to_degrees;
use tourroute_lib::LatLon;

/// Longitude step that places equator nodes exactly `meters` apart.
#[allow(dead_code)]
pub fn step_deg(meters: f64) -> f64 {
    meters_to_degrees(meters)
}

/// Builder for a temporary routing dataset.
pub struct FixtureDataset {
    nodes: Vec<(i64, f64, f64)>,
    edges: Vec<(i64, i64)>,
    pois: Vec<(i64, String, String, f64, f64)>,
}

#[allow(dead_code)]
impl FixtureDataset {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            pois: Vec::new(),
        }
    }

    pub fn node(mut self, id: i64, lat: f64, lon: f64) -> Self {
        self.nodes.push((id, lat, lon));
        self
    }

    /// Directed edge.
    pub fn edge(mut self, from: i64, to: i64) -> Self {
        self.edges.push((from, to));
        self
    }

    /// Edge in both directions.
    pub fn road(self, a: i64, b: i64) -> Self {
        self.edge(a, b).edge(b, a)
    }

    pub fn poi(mut self, id: i64, name: &str, category: &str, lat: f64, lon: f64) -> Self {
        self.pois
            .push((id, name.to_string(), category.to_string(), lat, lon));
        self
    }

    /// Write the dataset into a fresh temporary directory.
    pub fn write(self) -> WrittenDataset {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("routing.db");
        let conn = Connection::open(&path).expect("create dataset");
        conn.execute_batch(
            "CREATE TABLE nodes (id INTEGER PRIMARY KEY, lat REAL, lon REAL);
             CREATE TABLE edges (from_node INTEGER, to_node INTEGER);
             CREATE INDEX edges_from ON edges(from_node);
             CREATE TABLE pois (id INTEGER PRIMARY KEY, name TEXT, category TEXT, lat REAL, lon REAL);",
        )
        .expect("create schema");

        for (id, lat, lon) in &self.nodes {
            conn.execute("INSERT INTO nodes VALUES (?1, ?2, ?3)", params![id, lat, lon])
                .expect("insert node");
        }
        for (from, to) in &self.edges {
            conn.execute("INSERT INTO edges VALUES (?1, ?2)", params![from, to])
                .expect("insert edge");
        }
        for (id, name, category, lat, lon) in &self.pois {
            conn.execute(
                "INSERT INTO pois VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, category, lat, lon],
            )
            .expect("insert poi");
        }

        WrittenDataset { _dir: dir, path }
    }
}

/// Dataset on disk; the directory is removed when this is dropped.
pub struct WrittenDataset {
    _dir: TempDir,
    pub path: PathBuf,
}

#[allow(dead_code)]
impl WrittenDataset {
    /// Run extra SQL against the dataset, e.g. to inject malformed rows.
    pub fn execute(&self, sql: &str) {
        let conn = Connection::open(&self.path).expect("reopen dataset");
        conn.execute_batch(sql).expect("execute fixture sql");
    }
}

/// Four nodes on the equator, 100 m apart, linked both ways: A(1)-B(2)-C(3)-D(4).
#[allow(dead_code)]
pub fn line_dataset() -> FixtureDataset {
    let step = step_deg(100.0);
    FixtureDataset::new()
        .node(1, 0.0, 0.0)
        .node(2, 0.0, step)
        .node(3, 0.0, 2.0 * step)
        .node(4, 0.0, 3.0 * step)
        .road(1, 2)
        .road(2, 3)
        .road(3, 4)
}

/// Coordinate of the `index`-th node (0-based) of [`line_dataset`].
#[allow(dead_code)]
pub fn line_point(index: u32) -> LatLon {
    LatLon::new(0.0, step_deg(100.0) * f64::from(index))
}
