//! Adapter configuration, keyed by handler name in the service config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unit the store records wind speeds in. Values are converted to m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindSpeedUnit {
    #[default]
    Mps,
    Kmh,
}

impl WindSpeedUnit {
    pub fn to_mps(self, value: f64) -> f64 {
        match self {
            WindSpeedUnit::Mps => value,
            WindSpeedUnit::Kmh => value / 3.6,
        }
    }
}

fn default_poll_rate_secs() -> u32 {
    60
}

fn default_period_count() -> u32 {
    5
}

/// Connection settings for one source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// awsxd table reached through a `mysql://` or `sqlite:` URL
    Awsxd {
        url: String,
        #[serde(default)]
        wind_speed_unit: WindSpeedUnit,
    },

    /// osod SQLite database file
    Osod {
        #[serde(alias = "db")]
        path: PathBuf,
        #[serde(default)]
        wind_speed_unit: WindSpeedUnit,
    },

    /// vivad SQLite database file
    Vivad {
        #[serde(alias = "db")]
        path: PathBuf,
        #[serde(default)]
        wind_speed_unit: WindSpeedUnit,
    },

    /// awsxd raw rows grouped into fixed-length periods
    Periodic {
        url: String,
        /// Seconds between raw samples
        #[serde(default = "default_poll_rate_secs")]
        poll_rate_secs: u32,
        /// Raw samples per period
        #[serde(default = "default_period_count")]
        period_count: u32,
        #[serde(default)]
        wind_speed_unit: WindSpeedUnit,
    },
}

impl SourceConfig {
    /// The adapter type name, as written in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Awsxd { .. } => "awsxd",
            SourceConfig::Osod { .. } => "osod",
            SourceConfig::Vivad { .. } => "vivad",
            SourceConfig::Periodic { .. } => "periodic",
        }
    }
}
