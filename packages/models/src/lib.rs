#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Conservation area, occurrence, and richness types.
//!
//! These types flow through every stage of the report pipeline: the loader
//! produces [`ConservationArea`] and [`Occurrence`] values, the spatial
//! joiner wraps occurrences into [`JoinedOccurrence`], and the aggregator
//! emits one [`RichnessRecord`] per area.

pub mod crs;
pub mod progress;
pub mod source;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use crs::{Crs, UnsupportedCrsError};
pub use source::{AreaSource, ColumnMapping, OccurrenceSource};

/// A protected-area polygon with its name.
///
/// Names are not guaranteed unique, so `index` (the zero-based position of
/// the area in the loaded layer) is the identity used for joins.
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationArea {
    /// Position of the area in the loaded layer.
    pub index: usize,
    /// Human-readable area name.
    pub name: String,
    /// Area boundary in WGS84 longitude/latitude degrees.
    pub geometry: MultiPolygon<f64>,
}

/// A single biodiversity observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Scientific name, if the record was identified.
    pub species: Option<String>,
    /// Free-text locality description.
    pub locality: Option<String>,
    /// Event date as recorded by the source (may be a range).
    pub event_date: Option<String>,
    /// Institution that holds the record.
    pub institution: Option<String>,
    /// External record identifier (e.g. a GBIF ID).
    pub record_id: Option<String>,
    /// Location in WGS84 longitude/latitude degrees.
    pub location: Point<f64>,
}

impl Occurrence {
    /// Creates an occurrence at `(lng, lat)` with only a species set.
    #[must_use]
    pub fn at(lng: f64, lat: f64, species: Option<&str>) -> Self {
        Self {
            species: species.map(ToString::to_string),
            locality: None,
            event_date: None,
            institution: None,
            record_id: None,
            location: Point::new(lng, lat),
        }
    }
}

/// An occurrence with the area (if any) whose interior contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedOccurrence {
    /// The underlying observation.
    pub occurrence: Occurrence,
    /// Index of the enclosing [`ConservationArea`], or `None` when the
    /// point falls outside every area.
    pub area: Option<usize>,
}

/// Species richness for one conservation area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichnessRecord {
    /// Index of the area in the source layer.
    pub area_index: usize,
    /// Area name.
    pub area_name: String,
    /// Number of distinct non-null species recorded inside the area.
    pub richness: u64,
    /// Number of occurrences joined to the area, identified or not.
    pub occurrence_count: u64,
}

/// Output of the richness aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichnessSummary {
    /// One record per area, sorted by richness descending.
    pub records: Vec<RichnessRecord>,
    /// Occurrences that fell outside every area.
    pub unjoined_count: u64,
    /// Total occurrences considered.
    pub total_occurrences: u64,
}

/// Number of occurrences recorded for one species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesCount {
    /// Species name.
    pub species: String,
    /// Number of occurrences.
    pub count: u64,
}

/// Spatial predicate used to attach points to areas.
///
/// Only `within` is supported: a point matches an area when it lies in the
/// area's interior. Points exactly on a boundary edge do not match.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum JoinPredicate {
    /// Point lies in the polygon interior.
    #[default]
    Within,
}

/// Normalizes a raw text field: trims whitespace and maps empty strings and
/// the literal `NA` to `None`.
#[must_use]
pub fn non_null(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NA") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
