//! Shared helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Longitude step between neighbouring line nodes (100 m on the equator).
pub fn step() -> f64 {
    (100.0_f64 / 6_371_000.0).to_degrees()
}

/// `LAT,LON` argument for the `index`-th line node.
pub fn line_arg(index: u32) -> String {
    format!("0,{}", step() * f64::from(index))
}

/// Temporary dataset: nodes 1-4 on the equator 100 m apart linked both ways,
/// an unconnected pair 5-6 far to the north, an orphan node 7, and a few POIs.
pub struct Fixture {
    dir: TempDir,
    pub path: PathBuf,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("routing.db");
        let conn = Connection::open(&path).expect("create dataset");
        conn.execute_batch(
            "CREATE TABLE nodes (id INTEGER PRIMARY KEY, lat REAL, lon REAL);
             CREATE TABLE edges (from_node INTEGER, to_node INTEGER);
             CREATE TABLE pois (id INTEGER PRIMARY KEY, name TEXT, category TEXT, lat REAL, lon REAL);",
        )
        .expect("create schema");

        let s = step();
        let nodes = [
            (1, 0.0, 0.0),
            (2, 0.0, s),
            (3, 0.0, 2.0 * s),
            (4, 0.0, 3.0 * s),
            (5, 1.0, 0.0),
            (6, 1.0, s),
            (7, -0.5, 0.0),
        ];
        for (id, lat, lon) in nodes {
            conn.execute("INSERT INTO nodes VALUES (?1, ?2, ?3)", params![id, lat, lon])
                .expect("insert node");
        }
        for (a, b) in [(1, 2), (2, 3), (3, 4), (5, 6)] {
            conn.execute("INSERT INTO edges VALUES (?1, ?2)", params![a, b])
                .expect("insert edge");
            conn.execute("INSERT INTO edges VALUES (?1, ?2)", params![b, a])
                .expect("insert edge");
        }

        let pois = [
            (1, "City Museum", "museum", s, s),
            (2, "Corner Cafe", "cafe", 0.0, 2.0 * s),
            (3, "Distant Museum", "museum", 0.5, 0.5),
        ];
        for (id, name, category, lat, lon) in pois {
            conn.execute(
                "INSERT INTO pois VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, category, lat, lon],
            )
            .expect("insert poi");
        }

        Self { dir, path }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// CLI command pointed at this dataset with quiet logs and no colors.
    pub fn cmd(&self) -> Command {
        let mut cmd = bare_cmd();
        cmd.arg("--dataset").arg(&self.path);
        cmd
    }
}

/// CLI command with quiet logs, no colors and no dataset override.
#[allow(dead_code)]
pub fn bare_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("tourroute");
    cmd.env("RUST_LOG", "error")
        .env("NO_COLOR", "1")
        .env_remove("TOURROUTE_DATASET")
        .env_remove("TOURROUTE_POI_DATASET")
        .env_remove("TOURROUTE_GRID_CELL_SIZE_DEG")
        .env_remove("TOURROUTE_MAX_RING_RADIUS")
        .env_remove("TOURROUTE_MAX_EXPANSIONS");
    cmd
}

/// Parse stdout of a successful command as JSON.
pub fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}
