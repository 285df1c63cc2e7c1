#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loading for the richness report.
//!
//! Reads conservation-area polygons from GeoJSON and occurrence points from
//! delimited text, normalizing both layers to WGS84 longitude/latitude so
//! the spatial joiner can compare them directly.

pub mod areas;
pub mod occurrences;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use richness_map_models::{Crs, UnsupportedCrsError};
use thiserror::Error;

pub use areas::{load_areas, read_areas};
pub use occurrences::{OccurrenceSet, load_occurrences, read_occurrences};

/// A dataset could not be read or parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Dataset path or label.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Delimited text parsing failed.
    #[error("Invalid delimited text in {path}: {source}")]
    Csv {
        /// Dataset path or label.
        path: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// GeoJSON parsing failed.
    #[error("Invalid GeoJSON in {path}: {source}")]
    GeoJson {
        /// Dataset path or label.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but does not have the expected shape.
    #[error("Malformed dataset {path}: {message}")]
    Malformed {
        /// Dataset path or label.
        path: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// An expected column or property is absent.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column is missing from the header row.
    #[error("Column '{column}' not found in {path} (available: {available})")]
    MissingColumn {
        /// Dataset path or label.
        path: String,
        /// Configured column name.
        column: String,
        /// Comma-separated list of the header names that were found.
        available: String,
    },

    /// A feature lacks the configured name property.
    #[error("Feature {feature} in {path} has no '{property}' property")]
    MissingProperty {
        /// Dataset path or label.
        path: String,
        /// Configured property name.
        property: String,
        /// Zero-based feature position in the file.
        feature: usize,
    },
}

/// A coordinate reference system is unset, unsupported, or inconsistent
/// with the data.
#[derive(Debug, Error)]
pub enum CoordinateSystemError {
    /// A CRS was configured as an empty string.
    #[error("No coordinate reference system set for {path}")]
    Unset {
        /// Dataset path or label.
        path: String,
    },

    /// The CRS identifier is not supported.
    #[error("Unsupported coordinate reference system '{name}' for {path}")]
    Unsupported {
        /// Dataset path or label.
        path: String,
        /// The CRS identifier.
        name: String,
    },

    /// The configured target CRS is not geographic WGS84.
    #[error("Target coordinate reference system must be EPSG:4326, got {target}")]
    UnsupportedTarget {
        /// The configured target.
        target: Crs,
    },

    /// A coordinate is outside the valid longitude/latitude range after
    /// normalization, which usually means the declared CRS is wrong.
    #[error("Coordinate ({lng}, {lat}) in {path} is outside longitude/latitude bounds")]
    OutOfRange {
        /// Dataset path or label.
        path: String,
        /// Longitude after normalization.
        lng: f64,
        /// Latitude after normalization.
        lat: f64,
    },
}

/// Any failure while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// See [`LoadError`].
    #[error(transparent)]
    Load(#[from] LoadError),

    /// See [`SchemaError`].
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// See [`CoordinateSystemError`].
    #[error(transparent)]
    CoordinateSystem(#[from] CoordinateSystemError),
}

/// Ensures the requested target CRS is one the pipeline can produce.
///
/// # Errors
///
/// Returns [`CoordinateSystemError::UnsupportedTarget`] for anything other
/// than WGS84.
pub fn ensure_target(target: Crs) -> Result<(), CoordinateSystemError> {
    if target == Crs::Wgs84 {
        Ok(())
    } else {
        Err(CoordinateSystemError::UnsupportedTarget { target })
    }
}

/// Resolves a CRS identifier, distinguishing "blank" from "unknown".
fn resolve_crs(name: &str, path: &str) -> Result<Crs, CoordinateSystemError> {
    if name.trim().is_empty() {
        return Err(CoordinateSystemError::Unset {
            path: path.to_string(),
        });
    }
    name.parse()
        .map_err(|UnsupportedCrsError { name }| CoordinateSystemError::Unsupported {
            path: path.to_string(),
            name,
        })
}

/// Returns `true` when `(lng, lat)` is a valid geographic coordinate.
fn in_bounds(lng: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat)
}

/// Opens `path` for buffered reading.
fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })
}
