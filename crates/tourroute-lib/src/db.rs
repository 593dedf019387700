use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::{Node, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeColumns {
    id: &'static str,
    lat: &'static str,
    lon: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeColumns {
    from: &'static str,
    to: &'static str,
}

const NODE_COLUMN_CANDIDATES: [NodeColumns; 2] = [
    NodeColumns {
        id: "id",
        lat: "lat",
        lon: "lon",
    },
    NodeColumns {
        id: "id",
        lat: "latitude",
        lon: "longitude",
    },
];

const EDGE_COLUMN_CANDIDATES: [EdgeColumns; 2] = [
    EdgeColumns {
        from: "from_node",
        to: "to_node",
    },
    EdgeColumns {
        from: "source",
        to: "target",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SchemaDefinition {
    nodes_table: &'static str,
    node_columns: NodeColumns,
    edges_table: &'static str,
    edge_columns: EdgeColumns,
}

impl fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {}) / {}({}, {})",
            self.nodes_table,
            self.node_columns.id,
            self.node_columns.lat,
            self.node_columns.lon,
            self.edges_table,
            self.edge_columns.from,
            self.edge_columns.to
        )
    }
}

/// Rows read from a dataset table along with the number of rows that were
/// skipped because they were malformed.
#[derive(Debug, Clone)]
pub struct LoadedRows<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for LoadedRows<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: 0,
        }
    }
}

/// Directed edge row as stored in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRow {
    pub from: NodeId,
    pub to: NodeId,
}

/// Read-only handle to a SQLite node/edge dataset.
///
/// The file must already exist; it is never created or modified. Schema
/// detection runs once when the handle is opened so later queries can rely on
/// the resolved table and column names.
pub struct Dataset {
    path: PathBuf,
    connection: Connection,
    schema: SchemaDefinition,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("schema", &self.schema.to_string())
            .finish()
    }
}

impl Dataset {
    /// Open a dataset and detect its schema.
    pub fn open(path: &Path) -> Result<Self> {
        let connection = open_read_only(path)?;
        let schema = detect_schema(&connection).map_err(|err| with_path(err, path))?;
        debug!(%schema, path = %path.display(), "opened dataset");

        Ok(Self {
            path: path.to_path_buf(),
            connection,
            schema,
        })
    }

    /// Location of the dataset on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every node, skipping rows with missing or malformed coordinates.
    pub fn load_nodes(&self) -> Result<LoadedRows<Node>> {
        let columns = self.schema.node_columns;
        let sql = format!(
            "SELECT {id}, {lat}, {lon} FROM {table}",
            id = columns.id,
            lat = columns.lat,
            lon = columns.lon,
            table = self.schema.nodes_table
        );

        let mut stmt = self.connection.prepare(&sql).map_err(|e| self.source(e))?;
        let rows = stmt
            .query_map([], row_to_node)
            .map_err(|e| self.source(e))?;

        let mut loaded = LoadedRows::default();
        for entry in rows {
            match entry {
                Ok(Some(node)) => loaded.rows.push(node),
                Ok(None) => loaded.skipped += 1,
                Err(err) if is_row_defect(&err) => loaded.skipped += 1,
                Err(err) => return Err(self.source(err)),
            }
        }

        if loaded.skipped > 0 {
            warn!(skipped_rows = loaded.skipped, "ignored malformed node rows");
        }
        Ok(loaded)
    }

    /// Read every directed edge row, skipping rows with missing endpoints.
    ///
    /// Endpoints are not checked against the node table here; the graph
    /// builder drops edges that reference unknown nodes.
    pub fn load_edges(&self) -> Result<LoadedRows<EdgeRow>> {
        let columns = self.schema.edge_columns;
        let sql = format!(
            "SELECT {from}, {to} FROM {table}",
            from = columns.from,
            to = columns.to,
            table = self.schema.edges_table
        );

        let mut stmt = self.connection.prepare(&sql).map_err(|e| self.source(e))?;
        let rows = stmt
            .query_map([], |row| {
                let from: Option<NodeId> = row.get(0)?;
                let to: Option<NodeId> = row.get(1)?;
                Ok(from.zip(to).map(|(from, to)| EdgeRow { from, to }))
            })
            .map_err(|e| self.source(e))?;

        let mut loaded = LoadedRows::default();
        for entry in rows {
            match entry {
                Ok(Some(edge)) => loaded.rows.push(edge),
                Ok(None) => loaded.skipped += 1,
                Err(err) if is_row_defect(&err) => loaded.skipped += 1,
                Err(err) => return Err(self.source(err)),
            }
        }

        if loaded.skipped > 0 {
            warn!(skipped_rows = loaded.skipped, "ignored malformed edge rows");
        }
        Ok(loaded)
    }

    /// Look up a single node by identifier.
    pub fn node_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        let columns = self.schema.node_columns;
        let sql = format!(
            "SELECT {id_col}, {lat}, {lon} FROM {table} WHERE {id_col} = ?1 LIMIT 1",
            id_col = columns.id,
            lat = columns.lat,
            lon = columns.lon,
            table = self.schema.nodes_table
        );

        let mut stmt = self.connection.prepare(&sql).map_err(|e| self.source(e))?;
        let node = stmt
            .query_row([id], row_to_node)
            .optional()
            .map_err(|e| self.source(e))?;
        Ok(node.flatten())
    }

    /// Targets of the edges leaving `id`, in stored order.
    pub fn outgoing_targets(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let columns = self.schema.edge_columns;
        let sql = format!(
            "SELECT {to} FROM {table} WHERE {from} = ?1",
            to = columns.to,
            from = columns.from,
            table = self.schema.edges_table
        );

        let mut stmt = self.connection.prepare(&sql).map_err(|e| self.source(e))?;
        let rows = stmt
            .query_map([id], |row| row.get::<_, Option<NodeId>>(0))
            .map_err(|e| self.source(e))?;

        let mut targets = Vec::new();
        for entry in rows {
            match entry {
                Ok(Some(to)) => targets.push(to),
                Ok(None) => {}
                Err(err) if is_row_defect(&err) => {}
                Err(err) => return Err(self.source(err)),
            }
        }
        Ok(targets)
    }

    fn source(&self, err: rusqlite::Error) -> Error {
        Error::DataSource {
            path: self.path.clone(),
            source: err,
        }
    }
}

/// Open an existing SQLite file without creating it.
pub(crate) fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(Error::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| Error::DataSource {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn with_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Sqlite(source) => Error::DataSource {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

/// Column type mismatches and NULLs only spoil a single row.
pub(crate) fn is_row_defect(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<Node>> {
    let id: Option<NodeId> = row.get(0)?;
    let lat: Option<f64> = row.get(1)?;
    let lon: Option<f64> = row.get(2)?;

    let (Some(id), Some(lat), Some(lon)) = (id, lat, lon) else {
        return Ok(None);
    };
    if !valid_coordinate(lat, lon) {
        return Ok(None);
    }
    Ok(Some(Node { id, lat, lon }))
}

pub(crate) fn valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

fn detect_schema(connection: &Connection) -> Result<SchemaDefinition> {
    const NODES_TABLE: &str = "nodes";
    const EDGES_TABLE: &str = "edges";

    if !table_exists(connection, NODES_TABLE)? || !table_exists(connection, EDGES_TABLE)? {
        return Err(Error::UnsupportedSchema);
    }

    let mut node_columns = None;
    for candidate in NODE_COLUMN_CANDIDATES {
        if table_has_columns(
            connection,
            NODES_TABLE,
            &[candidate.id, candidate.lat, candidate.lon],
        )? {
            node_columns = Some(candidate);
            break;
        }
    }

    let mut edge_columns = None;
    for candidate in EDGE_COLUMN_CANDIDATES {
        if table_has_columns(connection, EDGES_TABLE, &[candidate.from, candidate.to])? {
            edge_columns = Some(candidate);
            break;
        }
    }

    match (node_columns, edge_columns) {
        (Some(node_columns), Some(edge_columns)) => Ok(SchemaDefinition {
            nodes_table: NODES_TABLE,
            node_columns,
            edges_table: EDGES_TABLE,
            edge_columns,
        }),
        _ => Err(Error::UnsupportedSchema),
    }
}

pub(crate) fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

pub(crate) fn table_has_columns(
    connection: &Connection,
    table: &str,
    required: &[&str],
) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}
