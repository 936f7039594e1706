use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::model::Segment;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TLAG_DASHBOARD_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "tlag-dashboard.toml";

/// Dashboard settings. Every field has a default, so an empty or partial
/// TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Worksheet that holds the station rows in uploaded workbooks.
    pub sheet_name: String,
    /// Segment counted as "top performers" in the summary.
    pub top_segment: Segment,
    pub histogram_bins: usize,
    /// Stations per synthetic sample period.
    pub sample_stations: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sheet_name: "TLAG DOKUNMA".to_string(),
            top_segment: Segment::MyPrecious,
            histogram_bins: 20,
            sample_stations: 60,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing dashboard config")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the config: `$TLAG_DASHBOARD_CONFIG`, then
    /// `./tlag-dashboard.toml`, then defaults.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = match explicit {
            Some(p) => Some(p),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            }
        };
        match path {
            Some(p) => {
                log::info!("Using config {}", p.display());
                Self::from_path(&p)
            }
            None => Ok(Self::default()),
        }
    }
}
