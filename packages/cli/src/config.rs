//! Report configuration, read from TOML and overridable from the command
//! line.
//!
//! Relative paths are resolved against the working directory.

use std::path::{Path, PathBuf};

use clap::Args;
use richness_map_analytics::DEFAULT_TOP_SPECIES;
use richness_map_models::{AreaSource, Crs, JoinPredicate, OccurrenceSource};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading, validating, or writing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Config path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// Config path.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is not usable.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// `init-config` refused to overwrite an existing file.
    #[error("{path} already exists (use --force to overwrite)")]
    Exists {
        /// Target path.
        path: String,
    },

    /// Writing the config file failed.
    #[error("Failed to write config {path}: {source}")]
    Write {
        /// Target path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The default config could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// CRS every layer is normalized to. Only WGS84 is supported.
    pub target_crs: Crs,
    /// Spatial predicate used by the join.
    pub predicate: JoinPredicate,
    /// Conservation-area polygons.
    pub areas: AreaSource,
    /// Occurrence points.
    pub occurrences: OccurrenceSource,
    /// Output settings.
    pub report: ReportSettings,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            target_crs: Crs::Wgs84,
            predicate: JoinPredicate::Within,
            areas: AreaSource::default(),
            occurrences: OccurrenceSource::default(),
            report: ReportSettings::default(),
        }
    }
}

/// The `[report]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Directory the report files are written to.
    pub output_dir: PathBuf,
    /// Page title.
    pub title: String,
    /// How many species the ranking chart shows.
    pub top_species: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            title: "Species richness by conservation area".to_string(),
            top_species: DEFAULT_TOP_SPECIES,
        }
    }
}

/// Command-line flags that take precedence over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(long, env = "RICHNESS_MAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Conservation-area GeoJSON, overriding `areas.path`.
    #[arg(long)]
    pub areas: Option<PathBuf>,

    /// Occurrence file, overriding `occurrences.path`.
    #[arg(long)]
    pub occurrences: Option<PathBuf>,

    /// Output directory, overriding `report.output_dir`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Species shown in the ranking chart, overriding `report.top_species`.
    #[arg(long)]
    pub top_species: Option<usize>,
}

impl ReportConfig {
    /// Parses a config from TOML text. `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml(text: &str, label: &str) -> Result<Self, ConfigError> {
        toml::de::from_str(text).map_err(|source| ConfigError::Parse {
            path: label.to_string(),
            source,
        })
    }

    /// Reads the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: label.clone(),
            source,
        })?;
        let config = Self::from_toml(&text, &label)?;
        log::debug!("Loaded config from {label}");
        Ok(config)
    }

    /// Builds the effective config: the file named by `overrides.config`
    /// (or the defaults), then each flag that was given, then validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be loaded or the result
    /// fails [`Self::validate`].
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match &overrides.config {
            Some(path) => Self::load(path)?,
            None => {
                log::debug!("No config file given, using defaults");
                Self::default()
            }
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides in place.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(path) = &overrides.areas {
            self.areas.path.clone_from(path);
        }
        if let Some(path) = &overrides.occurrences {
            self.occurrences.path.clone_from(path);
        }
        if let Some(dir) = &overrides.output_dir {
            self.report.output_dir.clone_from(dir);
        }
        if let Some(n) = overrides.top_species {
            self.report.top_species = n;
        }
    }

    /// Rejects values that parse but cannot drive a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report.top_species == 0 {
            return Err(ConfigError::Invalid(
                "report.top_species must be at least 1".to_string(),
            ));
        }
        if self.areas.name_field.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "areas.name_field must not be empty".to_string(),
            ));
        }
        let columns = &self.occurrences.columns;
        if columns.longitude.trim().is_empty() || columns.latitude.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "occurrences.columns.longitude and latitude must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders this config as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Writes the default config to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Exists`] if `path` exists and `force` is false,
/// or [`ConfigError::Write`] if the write fails.
pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
    let label = path.display().to_string();
    if path.exists() && !force {
        return Err(ConfigError::Exists { path: label });
    }

    let text = ReportConfig::default().to_toml()?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: label.clone(),
        source,
    })?;
    log::info!("Wrote default config to {label}");
    Ok(())
}
