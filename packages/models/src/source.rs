//! Dataset source definitions, deserialized from the report config TOML.
//!
//! Every field has a default so a config file only needs to name what
//! differs from a standard GBIF occurrence export.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where to read conservation-area polygons and how to name them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AreaSource {
    /// Path to a GeoJSON `FeatureCollection`.
    pub path: PathBuf,
    /// Feature property holding the area name.
    pub name_field: String,
    /// CRS override. When `None`, the file's `crs` member is used, falling
    /// back to WGS84.
    pub crs: Option<String>,
}

impl Default for AreaSource {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/areas.geojson"),
            name_field: "name".to_string(),
            crs: None,
        }
    }
}

/// Where to read occurrence points and how their columns are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OccurrenceSource {
    /// Path to a delimited text file with a header row.
    pub path: PathBuf,
    /// Field delimiter (`','` for CSV, `'\t'` for GBIF TSV downloads).
    pub delimiter: char,
    /// Whether double quotes delimit fields. GBIF TSV downloads are
    /// unquoted and contain stray quotes, so they need `false`.
    pub quoting: bool,
    /// CRS of the coordinate columns.
    pub crs: String,
    /// Column name mapping.
    pub columns: ColumnMapping,
}

impl Default for OccurrenceSource {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/occurrences.csv"),
            delimiter: ',',
            quoting: true,
            crs: "EPSG:4326".to_string(),
            columns: ColumnMapping::default(),
        }
    }
}

/// Header names of the occurrence columns.
///
/// `longitude` and `latitude` are required. The rest are read when the
/// column exists and left null otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    /// Longitude column.
    pub longitude: String,
    /// Latitude column.
    pub latitude: String,
    /// Species name column.
    pub species: String,
    /// Locality column.
    pub locality: String,
    /// Event date column.
    pub event_date: String,
    /// Holding institution column.
    pub institution: String,
    /// External record identifier column.
    pub record_id: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            longitude: "decimalLongitude".to_string(),
            latitude: "decimalLatitude".to_string(),
            species: "species".to_string(),
            locality: "locality".to_string(),
            event_date: "eventDate".to_string(),
            institution: "institutionCode".to_string(),
            record_id: "gbifID".to_string(),
        }
    }
}
