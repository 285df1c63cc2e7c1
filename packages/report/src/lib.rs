#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report rendering for species richness results.
//!
//! Produces a single self-contained HTML page with three independent
//! views: a sortable richness table, a Leaflet choropleth map with
//! occurrence markers, and two SVG bar charts. [`write_outputs`] also
//! exports the richness table as CSV and JSON and the joined occurrences
//! as GeoJSON.

pub mod chart;
pub mod color;
pub mod html;
pub mod map;
pub mod table;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use richness_map_models::{
    ConservationArea, JoinedOccurrence, RichnessSummary, SpeciesCount,
};
use thiserror::Error;

use crate::chart::{Bar, bar_chart};
use crate::html::{escape, fill_template, script_json};

/// Page template. Placeholders are `{{name}}`.
const TEMPLATE: &str = include_str!("../templates/report.html");

/// Bar color for the richness chart.
const RICHNESS_BAR: &str = "#21918c";

/// Bar color for the species chart.
const SPECIES_BAR: &str = "#b07aa1";

/// Errors that can occur while rendering or writing the report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing an output file failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Everything the report views read. All stages upstream produce these as
/// plain values, so the renderer holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Conservation areas, in load order.
    pub areas: &'a [ConservationArea],
    /// Every loaded occurrence with its join result.
    pub joined: &'a [JoinedOccurrence],
    /// Richness per area, sorted for display.
    pub summary: &'a RichnessSummary,
    /// Most recorded species, already ranked and truncated.
    pub top_species: &'a [SpeciesCount],
    /// Distinct non-null species across all occurrences.
    pub distinct_species: usize,
    /// Input rows dropped for missing coordinates.
    pub skipped_rows: u64,
}

/// Presentation settings.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Page heading and `<title>`.
    pub title: String,
    /// Timestamp shown in the page header.
    pub generated_at: DateTime<Utc>,
}

/// Files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// The HTML report.
    pub html: PathBuf,
    /// Richness table as CSV.
    pub csv: PathBuf,
    /// Richness summary as JSON.
    pub json: PathBuf,
    /// Joined occurrences as GeoJSON.
    pub geojson: PathBuf,
}

/// Renders the HTML report.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if a map layer fails to serialize.
pub fn render_report(input: &ReportInput<'_>, options: &ReportOptions) -> Result<String, ReportError> {
    let summary = input.summary;
    let joined_count: u64 = summary.records.iter().map(|r| r.occurrence_count).sum();
    let richness_max = summary.records.iter().map(|r| r.richness).max().unwrap_or(0);

    let richness_bars: Vec<Bar> = summary
        .records
        .iter()
        .map(|r| Bar {
            label: r.area_name.clone(),
            value: r.richness,
        })
        .collect();
    let species_bars: Vec<Bar> = input
        .top_species
        .iter()
        .map(|s| Bar {
            label: s.species.clone(),
            value: s.count,
        })
        .collect();

    let colors = map::species_colors(input.joined);
    let species_legend: Vec<serde_json::Value> = input
        .top_species
        .iter()
        .map(|s| {
            serde_json::json!({
                "species": s.species,
                "color": colors.get(s.species.as_str()).copied().unwrap_or(color::UNIDENTIFIED),
            })
        })
        .collect();

    let mut values: BTreeMap<&str, String> = BTreeMap::new();
    values.insert("title", escape(&options.title));
    values.insert(
        "generated_at",
        options.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    values.insert("area_count", input.areas.len().to_string());
    values.insert("total_occurrences", summary.total_occurrences.to_string());
    values.insert("joined_occurrences", joined_count.to_string());
    values.insert("unjoined_occurrences", summary.unjoined_count.to_string());
    values.insert("distinct_species", input.distinct_species.to_string());
    values.insert("skipped_rows", input.skipped_rows.to_string());
    values.insert("table", table::richness_table(&summary.records));
    values.insert(
        "richness_chart",
        bar_chart("Species richness per conservation area", &richness_bars, RICHNESS_BAR),
    );
    values.insert(
        "species_chart",
        bar_chart("Occurrences of the most recorded species", &species_bars, SPECIES_BAR),
    );
    values.insert(
        "areas_geojson",
        script_json(&map::area_layer(input.areas, summary))?,
    );
    values.insert(
        "occurrences_geojson",
        script_json(&map::occurrence_layer(input.areas, input.joined))?,
    );
    values.insert("species_legend", script_json(&species_legend)?);
    values.insert("richness_max", richness_max.to_string());
    values.insert("ramp_css", color::ramp_css());

    Ok(fill_template(TEMPLATE, &values))
}

/// Writes `report.html`, `richness.csv`, `richness.json`, and
/// `occurrences.geojson` into `dir`, creating it if needed.
///
/// Each file is written to a `.tmp` sibling first and then renamed so an
/// interrupted run never leaves a truncated output behind.
///
/// # Errors
///
/// Returns [`ReportError`] if rendering, serialization, or any file write
/// fails.
pub fn write_outputs(
    dir: &Path,
    input: &ReportInput<'_>,
    options: &ReportOptions,
) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let paths = ReportPaths {
        html: dir.join("report.html"),
        csv: dir.join("richness.csv"),
        json: dir.join("richness.json"),
        geojson: dir.join("occurrences.geojson"),
    };

    write_atomic(&paths.csv, &richness_csv(input.summary)?)?;
    write_atomic(
        &paths.json,
        serde_json::to_string_pretty(input.summary)?.as_bytes(),
    )?;
    write_atomic(
        &paths.geojson,
        serde_json::to_string(&map::occurrence_layer(input.areas, input.joined))?.as_bytes(),
    )?;
    write_atomic(&paths.html, render_report(input, options)?.as_bytes())?;

    log::info!("Report written to {}", paths.html.display());
    Ok(paths)
}

/// Serializes the richness records as CSV in display order.
///
/// # Errors
///
/// Returns [`ReportError`] if a row cannot be written.
pub fn richness_csv(summary: &RichnessSummary) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["area_index", "area", "richness", "occurrences"])?;
    for r in &summary.records {
        writer.write_record([
            r.area_index.to_string(),
            r.area_name.clone(),
            r.richness.to_string(),
            r.occurrence_count.to_string(),
        ])?;
    }
    writer.into_inner().map_err(|e| ReportError::Io {
        path: "richness.csv".to_string(),
        source: e.into_error(),
    })
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let io_error = |source| ReportError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(io_error)?;
    std::fs::rename(&tmp, path).map_err(io_error)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}
