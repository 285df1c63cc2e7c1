#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Species richness report for conservation areas.
//!
//! Joins species occurrence points to conservation-area polygons, counts
//! distinct species per area, and writes an HTML report with a sortable
//! table, an interactive map, and bar charts.
//!
//! Uses `indicatif-log-bridge` (via [`richness_map_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal cleanly.

mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Overrides, ReportConfig};
use crate::pipeline::Progress;

#[derive(Parser)]
#[command(
    name = "richness_map",
    about = "Species richness per conservation area"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load both datasets, join, aggregate, and write the report
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Load and join both datasets and print a summary without writing files
    Check {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Write a config file with every default spelled out
    InitConfig {
        /// Where to write the config
        #[arg(long, default_value = "richness_map.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = richness_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { overrides } => {
            let config = ReportConfig::resolve(&overrides)?;
            let paths = pipeline::run(&config, &Progress::terminal(&multi), chrono::Utc::now())?;
            println!("Report: {}", paths.html.display());
            println!("Richness table: {}", paths.csv.display());
            println!("Richness JSON: {}", paths.json.display());
            println!("Occurrences: {}", paths.geojson.display());
        }
        Commands::Check { overrides } => {
            let config = ReportConfig::resolve(&overrides)?;
            let (datasets, analysis) = pipeline::check(&config)?;
            let summary = &analysis.summary;
            println!("Areas: {}", datasets.areas.len());
            println!(
                "Occurrences: {} ({} outside all areas, {} rows skipped)",
                summary.total_occurrences,
                summary.unjoined_count,
                datasets.occurrences.skipped_rows
            );
            println!("Species: {}", analysis.distinct_species);
            if let Some(top) = summary.records.first() {
                println!("Richest area: {} ({} species)", top.area_name, top.richness);
            }
        }
        Commands::InitConfig { path, force } => {
            config::write_default(&path, force)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
