//! Occurrence point loading from delimited text.
//!
//! Parses a header row, resolves the configured column names, and builds
//! one [`Occurrence`] per row with usable coordinates. Rows whose
//! longitude or latitude is blank or non-numeric are skipped and counted.

use std::io::Read;

use geo::Point;
use richness_map_models::{OccurrenceSource, Occurrence, non_null};

use crate::{
    CoordinateSystemError, DatasetError, LoadError, SchemaError, in_bounds, open, resolve_crs,
};

/// Occurrences read from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceSet {
    /// Rows with usable coordinates, in file order.
    pub occurrences: Vec<Occurrence>,
    /// Rows skipped for blank or unparseable coordinates.
    pub skipped_rows: u64,
}

/// Resolved column positions for one file.
struct ColumnIndexes {
    longitude: usize,
    latitude: usize,
    species: Option<usize>,
    locality: Option<usize>,
    event_date: Option<usize>,
    institution: Option<usize>,
    record_id: Option<usize>,
}

/// Loads occurrences from the file named by `source`.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read, a coordinate
/// column is missing, or a coordinate falls outside geographic bounds after
/// CRS normalization.
pub fn load_occurrences(source: &OccurrenceSource) -> Result<OccurrenceSet, DatasetError> {
    let reader = open(&source.path)?;
    read_occurrences(reader, &source.path.display().to_string(), source)
}

/// Loads occurrences from any reader. `label` names the dataset in errors
/// and log lines.
///
/// # Errors
///
/// See [`load_occurrences`].
pub fn read_occurrences<R: Read>(
    reader: R,
    label: &str,
    source: &OccurrenceSource,
) -> Result<OccurrenceSet, DatasetError> {
    let crs = resolve_crs(&source.crs, label)?;

    let delimiter = u8::try_from(source.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| LoadError::Malformed {
            path: label.to_string(),
            message: format!("delimiter {:?} is not a single ASCII byte", source.delimiter),
        })?;

    let csv_error = |e: csv::Error| LoadError::Csv {
        path: label.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quoting(source.quoting)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect();

    let columns = resolve_columns(&headers, source, label)?;

    let mut occurrences = Vec::new();
    let mut skipped_rows = 0u64;

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let field = |idx: Option<usize>| idx.and_then(|pos| record.get(pos)).and_then(non_null);

        let (Some(x), Some(y)) = (
            parse_coordinate(record.get(columns.longitude)),
            parse_coordinate(record.get(columns.latitude)),
        ) else {
            // Header is line 1.
            log::debug!("Skipping row {} of {label}: no usable coordinates", i + 2);
            skipped_rows += 1;
            continue;
        };

        let (lng, lat) = crs.to_wgs84(x, y);
        if !in_bounds(lng, lat) {
            return Err(CoordinateSystemError::OutOfRange {
                path: label.to_string(),
                lng,
                lat,
            }
            .into());
        }

        occurrences.push(Occurrence {
            species: field(columns.species),
            locality: field(columns.locality),
            event_date: field(columns.event_date),
            institution: field(columns.institution),
            record_id: field(columns.record_id),
            location: Point::new(lng, lat),
        });
    }

    if skipped_rows > 0 {
        log::warn!("Skipped {skipped_rows} rows without usable coordinates in {label}");
    }
    log::info!("Loaded {} occurrences from {label}", occurrences.len());

    Ok(OccurrenceSet {
        occurrences,
        skipped_rows,
    })
}

/// Maps configured column names to header positions.
fn resolve_columns(
    headers: &[String],
    source: &OccurrenceSource,
    label: &str,
) -> Result<ColumnIndexes, SchemaError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| SchemaError::MissingColumn {
            path: label.to_string(),
            column: name.to_string(),
            available: headers.join(", "),
        })
    };

    let columns = &source.columns;
    let indexes = ColumnIndexes {
        longitude: require(&columns.longitude)?,
        latitude: require(&columns.latitude)?,
        species: find(&columns.species),
        locality: find(&columns.locality),
        event_date: find(&columns.event_date),
        institution: find(&columns.institution),
        record_id: find(&columns.record_id),
    };

    if indexes.species.is_none() {
        log::warn!(
            "Column '{}' not found in {label}; every occurrence will be unidentified",
            columns.species
        );
    }

    Ok(indexes)
}

/// Parses a finite coordinate value.
fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
