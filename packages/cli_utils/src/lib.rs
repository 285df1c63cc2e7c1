#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the `richness_map` binary: a stage counter for the
//! load/join/aggregate/render pipeline, a throughput bar for the spatial
//! join, and a logger that shares the terminal with both.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use richness_map_models::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Level used when `RUST_LOG` is unset.
const DEFAULT_LEVEL: log::LevelFilter = log::LevelFilter::Info;

/// [`ProgressCallback`] backed by an `indicatif` bar.
///
/// Bars whose length is unknown at construction render as a spinner and
/// switch to `counted` once [`ProgressCallback::set_total`] arrives.
pub struct TerminalProgress {
    bar: ProgressBar,
    counted: ProgressStyle,
}

impl TerminalProgress {
    /// Pipeline stage counter, e.g. `richness [2/4] Joining (3s)`.
    #[must_use]
    pub fn stage_bar(multi: &MultiProgress, stages: u64) -> Arc<dyn ProgressCallback> {
        let counted = style("{prefix:.bold.green} [{pos}/{len}] {msg} ({elapsed})");
        let bar = multi.add(ProgressBar::new(stages).with_style(counted.clone()));
        bar.set_prefix("richness");

        Arc::new(Self { bar, counted })
    }

    /// Per-occurrence bar for the spatial join. Shows throughput because
    /// the join dominates run time on large GBIF exports.
    #[must_use]
    pub fn occurrence_bar(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner().with_style(style("{spinner:.green} {msg}")));
        bar.enable_steady_tick(Duration::from_millis(120));

        let counted = style(
            "  {msg} [{bar:40.green/dim}] {human_pos}/{human_len} occurrences, {per_sec}, {eta} left",
        )
        .progress_chars("=> ");

        Arc::new(Self { bar, counted })
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ProgressCallback for TerminalProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.counted.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge` and returns
/// the [`MultiProgress`] every bar must be added to.
///
/// The filter is `info` unless `RUST_LOG` says otherwise. Calling this
/// more than once keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(DEFAULT_LEVEL)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
