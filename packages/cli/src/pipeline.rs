//! The report pipeline as four explicit stages: load, join, aggregate,
//! render. Each stage takes the previous stage's output by value or
//! reference, so any of them can be driven on its own.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use richness_map_analytics as analytics;
use richness_map_cli_utils::{MultiProgress, TerminalProgress};
use richness_map_loader::{DatasetError, OccurrenceSet};
use richness_map_models::progress::{ProgressCallback, null_progress};
use richness_map_models::{
    ConservationArea, JoinPredicate, JoinedOccurrence, RichnessSummary, SpeciesCount,
};
use richness_map_report::{ReportError, ReportInput, ReportOptions, ReportPaths};
use thiserror::Error;

use crate::config::ReportConfig;

/// Number of stages reported on the steps bar.
const STAGES: u64 = 4;

/// Any failure in a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading or normalizing an input dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Rendering or writing the report failed.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Output of the load stage.
#[derive(Debug, Clone)]
pub struct Datasets {
    /// Conservation areas, indexed by position.
    pub areas: Vec<ConservationArea>,
    /// Occurrence points and the count of rows dropped while reading.
    pub occurrences: OccurrenceSet,
}

/// Output of the aggregate stage.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Richness per area, sorted for display.
    pub summary: RichnessSummary,
    /// Most recorded species.
    pub top_species: Vec<SpeciesCount>,
    /// Distinct non-null species across every occurrence.
    pub distinct_species: usize,
}

/// Progress sinks for a run.
pub struct Progress {
    /// Advances once per stage.
    pub steps: Arc<dyn ProgressCallback>,
    /// Tracks the per-occurrence join.
    pub join: Arc<dyn ProgressCallback>,
}

impl Progress {
    /// Terminal progress bars attached to `multi`.
    #[must_use]
    pub fn terminal(multi: &MultiProgress) -> Self {
        Self {
            steps: TerminalProgress::stage_bar(multi, STAGES),
            join: TerminalProgress::occurrence_bar(multi),
        }
    }

    /// Discards all progress.
    #[cfg(test)]
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            steps: null_progress(),
            join: null_progress(),
        }
    }
}

/// Load stage: validates the target CRS, then reads both datasets.
///
/// # Errors
///
/// Returns [`DatasetError`] if the target CRS is unsupported or either
/// dataset fails to load.
pub fn load(config: &ReportConfig) -> Result<Datasets, DatasetError> {
    richness_map_loader::ensure_target(config.target_crs)?;

    let areas = richness_map_loader::load_areas(&config.areas)?;
    let occurrences = richness_map_loader::load_occurrences(&config.occurrences)?;

    Ok(Datasets { areas, occurrences })
}

/// Join stage: assigns each occurrence to the area containing it.
#[must_use]
pub fn join(
    predicate: JoinPredicate,
    datasets: &Datasets,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<JoinedOccurrence> {
    match predicate {
        JoinPredicate::Within => richness_map_spatial::join(
            &datasets.areas,
            &datasets.occurrences.occurrences,
            progress,
        ),
    }
}

/// Aggregate stage: richness per area plus the species ranking.
#[must_use]
pub fn aggregate(
    areas: &[ConservationArea],
    joined: &[JoinedOccurrence],
    top_species: usize,
) -> Analysis {
    Analysis {
        summary: analytics::richness(areas, joined),
        top_species: analytics::top_species(joined, top_species),
        distinct_species: analytics::distinct_species(joined),
    }
}

/// Assembles the renderer's input from the earlier stages.
#[must_use]
pub fn report_input<'a>(
    datasets: &'a Datasets,
    joined: &'a [JoinedOccurrence],
    analysis: &'a Analysis,
) -> ReportInput<'a> {
    ReportInput {
        areas: &datasets.areas,
        joined,
        summary: &analysis.summary,
        top_species: &analysis.top_species,
        distinct_species: analysis.distinct_species,
        skipped_rows: datasets.occurrences.skipped_rows,
    }
}

/// Runs every stage and writes the report into `report.output_dir`.
///
/// # Errors
///
/// Returns [`PipelineError`] if any stage fails.
pub fn run(
    config: &ReportConfig,
    progress: &Progress,
    generated_at: DateTime<Utc>,
) -> Result<ReportPaths, PipelineError> {
    progress.steps.set_message("Loading datasets".to_string());
    let datasets = load(config)?;
    progress.steps.inc(1);

    progress.steps.set_message("Joining".to_string());
    let joined = join(config.predicate, &datasets, &progress.join);
    progress.steps.inc(1);

    progress.steps.set_message("Aggregating".to_string());
    let analysis = aggregate(&datasets.areas, &joined, config.report.top_species);
    progress.steps.inc(1);

    progress.steps.set_message("Rendering report".to_string());
    let options = ReportOptions {
        title: config.report.title.clone(),
        generated_at,
    };
    let paths = richness_map_report::write_outputs(
        &config.report.output_dir,
        &report_input(&datasets, &joined, &analysis),
        &options,
    )?;
    progress.steps.inc(1);
    progress.steps.finish("Report complete".to_string());

    log_summary(&datasets, &analysis, &paths.html);
    Ok(paths)
}

/// Loads, joins, and aggregates without writing anything.
///
/// # Errors
///
/// Returns [`DatasetError`] if loading fails.
pub fn check(config: &ReportConfig) -> Result<(Datasets, Analysis), DatasetError> {
    let datasets = load(config)?;
    let joined = join(config.predicate, &datasets, &null_progress());
    let analysis = aggregate(&datasets.areas, &joined, config.report.top_species);
    Ok((datasets, analysis))
}

fn log_summary(datasets: &Datasets, analysis: &Analysis, html: &Path) {
    let summary = &analysis.summary;
    let occupied = summary.records.iter().filter(|r| r.richness > 0).count();
    log::info!(
        "{} areas ({occupied} with occurrences), {} occurrences ({} outside all areas, {} rows skipped), {} species",
        datasets.areas.len(),
        summary.total_occurrences,
        summary.unjoined_count,
        datasets.occurrences.skipped_rows,
        analysis.distinct_species,
    );
    log::info!("Open {} in a browser to view the report", html.display());
}
