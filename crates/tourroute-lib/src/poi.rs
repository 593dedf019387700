//! Points of interest near a route.
//!
//! POIs are filtered with a plain scan: every POI in a requested category is
//! compared against every path vertex. Both collections are small next to the
//! graph, so no dedicated index is kept. Reusing the grid index for POIs is
//! the natural next step if catalogs grow.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::{
    is_row_defect, open_read_only, table_exists, table_has_columns, valid_coordinate, with_path,
};
use crate::error::{Error, Result};
use crate::geo::{haversine_meters, LatLon};
use crate::routing::RoutePlan;

/// POIs closer than this to any path vertex are reported.
pub const POI_PROXIMITY_METERS: f64 = 500.0;

/// Weight applied to categories without an explicit weight.
pub const DEFAULT_CATEGORY_WEIGHT: i64 = 1;

const POI_TABLE: &str = "pois";
const POI_COLUMNS: [&str; 5] = ["id", "name", "category", "lat", "lon"];

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lon: f64,
}

impl PoiRecord {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Caller-supplied preference weights keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryWeights(BTreeMap<String, i64>);

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, weight: i64) {
        self.0.insert(category.into(), weight);
    }

    /// Weight for `category`, falling back to the default weight.
    pub fn weight(&self, category: &str) -> i64 {
        self.0
            .get(category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
    }

    /// Requested categories.
    pub fn categories(&self) -> HashSet<String> {
        self.0.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parse weights from a JSON object such as `{"museum": 3}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A single `CATEGORY=WEIGHT` pair. A bare `CATEGORY` gets the default weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub category: String,
    pub weight: i64,
}

impl FromStr for Interest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInterest {
            value: s.to_string(),
        };
        let (category, weight) = match s.split_once('=') {
            Some((category, weight)) => (
                category.trim(),
                weight.trim().parse::<i64>().map_err(|_| invalid())?,
            ),
            None => (s.trim(), DEFAULT_CATEGORY_WEIGHT),
        };
        if category.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            category: category.to_string(),
            weight,
        })
    }
}

/// In-memory POI collection.
#[derive(Debug, Clone, Default)]
pub struct PoiCatalog {
    records: Vec<PoiRecord>,
}

impl PoiCatalog {
    pub fn from_records(records: Vec<PoiRecord>) -> Self {
        Self { records }
    }

    /// Load every POI from the `pois` table of the SQLite file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let connection = open_read_only(path)?;
        let records = query_pois(&connection, None).map_err(|err| with_path(err, path))?;
        debug!(pois = records.len(), path = %path.display(), "loaded POI catalog");
        Ok(Self { records })
    }

    /// Load only POIs whose category is in `categories`.
    pub fn load_for_categories(path: &Path, categories: &HashSet<String>) -> Result<Self> {
        if categories.is_empty() {
            return Ok(Self::default());
        }
        let connection = open_read_only(path)?;
        let mut wanted: Vec<&str> = categories.iter().map(String::as_str).collect();
        wanted.sort_unstable();
        let records =
            query_pois(&connection, Some(&wanted)).map_err(|err| with_path(err, path))?;
        debug!(
            pois = records.len(),
            categories = wanted.len(),
            "loaded POIs for categories"
        );
        Ok(Self { records })
    }

    pub fn records(&self) -> &[PoiRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// POIs near `path` in the weighted categories, ranked by weight.
    pub fn along(&self, path: &[LatLon], weights: &CategoryWeights) -> Vec<PoiRecord> {
        let mut found = nearby_by_category(&self.records, path, &weights.categories());
        rank_by_weight(&mut found, weights);
        found
    }
}

/// POIs in `categories` strictly closer than [`POI_PROXIMITY_METERS`] to at
/// least one vertex of `path`, in catalog order.
pub fn nearby_by_category(
    pois: &[PoiRecord],
    path: &[LatLon],
    categories: &HashSet<String>,
) -> Vec<PoiRecord> {
    if path.is_empty() || categories.is_empty() {
        return Vec::new();
    }

    pois.iter()
        .filter(|poi| categories.contains(&poi.category))
        .filter(|poi| {
            path.iter().any(|point| {
                haversine_meters(point.lat, point.lon, poi.lat, poi.lon) < POI_PROXIMITY_METERS
            })
        })
        .cloned()
        .collect()
}

/// Stable sort by descending category weight.
pub fn rank_by_weight(pois: &mut [PoiRecord], weights: &CategoryWeights) {
    pois.sort_by_key(|poi| std::cmp::Reverse(weights.weight(&poi.category)));
}

/// A route annotated with nearby points of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiRoute {
    #[serde(flatten)]
    pub plan: RoutePlan,
    pub user_interests: CategoryWeights,
    pub pois: Vec<PoiRecord>,
}

/// Attach the POIs of `catalog` that lie along `plan`.
pub fn augment_route(plan: RoutePlan, catalog: &PoiCatalog, weights: &CategoryWeights) -> PoiRoute {
    let pois = catalog.along(&plan.path, weights);
    PoiRoute {
        plan,
        user_interests: weights.clone(),
        pois,
    }
}

fn query_pois(connection: &Connection, categories: Option<&[&str]>) -> Result<Vec<PoiRecord>> {
    if !table_exists(connection, POI_TABLE)?
        || !table_has_columns(connection, POI_TABLE, &POI_COLUMNS)?
    {
        return Err(Error::UnsupportedSchema);
    }

    let mut sql = format!(
        "SELECT {columns} FROM {table}",
        columns = POI_COLUMNS.join(", "),
        table = POI_TABLE
    );
    let params: Vec<Value> = match categories {
        Some(categories) => {
            let placeholders = vec!["?"; categories.len()].join(", ");
            sql.push_str(&format!(" WHERE category IN ({placeholders})"));
            categories
                .iter()
                .map(|c| Value::Text((*c).to_string()))
                .collect()
        }
        None => Vec::new(),
    };

    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
        let id: Option<i64> = row.get(0)?;
        let name: Option<String> = row.get(1)?;
        let category: Option<String> = row.get(2)?;
        let lat: Option<f64> = row.get(3)?;
        let lon: Option<f64> = row.get(4)?;
        Ok(match (id, category, lat, lon) {
            (Some(id), Some(category), Some(lat), Some(lon)) if valid_coordinate(lat, lon) => {
                Some(PoiRecord {
                    id,
                    name: name.unwrap_or_default(),
                    category,
                    lat,
                    lon,
                })
            }
            _ => None,
        })
    })?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for entry in rows {
        match entry {
            Ok(Some(poi)) => records.push(poi),
            Ok(None) => skipped += 1,
            Err(err) if is_row_defect(&err) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }
    if skipped > 0 {
        warn!(skipped_rows = skipped, "ignored malformed POI rows");
    }
    Ok(records)
}

/// Group POIs by category, preserving order within each group.
pub fn group_by_category(pois: &[PoiRecord]) -> HashMap<&str, Vec<&PoiRecord>> {
    let mut groups: HashMap<&str, Vec<&PoiRecord>> = HashMap::new();
    for poi in pois {
        groups.entry(poi.category.as_str()).or_default().push(poi);
    }
    groups
}
