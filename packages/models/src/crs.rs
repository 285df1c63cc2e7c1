//! Coordinate reference systems recognized by the loader.
//!
//! Every layer is normalized to [`Crs::Wgs84`] before joining. Only Web
//! Mercator is accepted as a projected input since it is the one projected
//! system commonly found in GeoJSON exports.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// WGS84 semi-major axis in meters, as used by spherical Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A supported coordinate reference system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic longitude/latitude degrees (EPSG:4326, OGC CRS84).
    #[default]
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercator,
}

/// Returned when a CRS identifier is not one of the supported systems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported coordinate reference system: '{name}'")]
pub struct UnsupportedCrsError {
    /// The identifier that failed to parse.
    pub name: String,
}

impl Crs {
    /// Returns the canonical EPSG identifier.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wgs84 => "EPSG:4326",
            Self::WebMercator => "EPSG:3857",
        }
    }

    /// Converts a coordinate in this system to WGS84 `(lng, lat)`.
    #[must_use]
    pub fn to_wgs84(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Wgs84 => (x, y),
            Self::WebMercator => {
                let lng = (x / EARTH_RADIUS_M).to_degrees();
                let lat = 2.0f64
                    .mul_add((y / EARTH_RADIUS_M).exp().atan(), -PI / 2.0)
                    .to_degrees();
                (lng, lat)
            }
        }
    }
}

impl FromStr for Crs {
    type Err = UnsupportedCrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "EPSG:4326"
            | "CRS84"
            | "WGS84"
            | "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
            | "URN:OGC:DEF:CRS:EPSG::4326" => Ok(Self::Wgs84),
            "EPSG:3857" | "EPSG:900913" | "URN:OGC:DEF:CRS:EPSG::3857" => Ok(Self::WebMercator),
            _ => Err(UnsupportedCrsError {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
