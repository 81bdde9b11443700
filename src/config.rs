//! TOML configuration for the `authbench` binary.
//!
//! Every field has a default, so an absent or partial file is fine. Command
//! line flags are applied on top of whatever the file provides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bench::RunnerOptions;
use crate::error::Result;
use crate::export::DataFormat;
use crate::generator::GenerationConfig;

/// Where datasets, stores and results live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of exported datasets; one subdirectory per format.
    pub data_dir: PathBuf,
    /// Root of benchmark stores; one subdirectory per format.
    pub db_dir: PathBuf,
    /// Directory receiving result JSON files.
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            db_dir: PathBuf::from("db"),
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Graph size, seed and time window.
    pub generation: GenerationConfig,
    /// Warmup, seed and sampling of the benchmark runner.
    pub runner: RunnerOptions,
    /// Dataset formats written and loaded.
    pub formats: Vec<DataFormat>,
    /// Filesystem layout.
    pub paths: PathsConfig,
    /// Default log filter, overridden by `--log-level`.
    pub log_level: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            runner: RunnerOptions::default(),
            formats: DataFormat::ALL.to_vec(),
            paths: PathsConfig::default(),
            log_level: None,
        }
    }
}

impl BenchConfig {
    /// Loads `explicit`, or the default path when it exists, or defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(&path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses the TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                crate::error::BenchError::missing_input(path)
            } else {
                err.into()
            }
        })?;
        let config: Self = toml::from_str(&contents)?;
        debug!(path = %path.display(), "config.loaded");
        Ok(config)
    }
}

/// `<config dir>/authbench/config.toml`, where the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("authbench").join("config.toml"))
}
