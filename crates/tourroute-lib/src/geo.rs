use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters used by every distance calculation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another point in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_meters(self.lat, self.lon, other.lat, other.lon)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

impl FromStr for LatLon {
    type Err = String;

    /// Parse `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON but got '{s}'"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} is out of range"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} is out of range"));
        }
        Ok(Self { lat, lon })
    }
}

/// Haversine great-circle distance between two coordinates, in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Degrees of arc spanned by `meters` along a great circle.
pub fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_METERS).to_degrees()
}
