//! Service configuration loaded from YAML.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aggregator::{OutputFormat, PipelineSettings};
use sources::SourceConfig;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindDbConfig {
    pub registry: RegistryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    /// Source adapters keyed by the handler name stations refer to
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// `mysql://` or `sqlite:` URL of the database holding the `winddb_stations` table
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Wrap documents as `callback(...);` and write `.jsonp` files
    #[serde(default)]
    pub jsonp_callback: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            jsonp_callback: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: u64,

    #[serde(default)]
    pub sample_limit: Option<usize>,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_station_timeout_secs")]
    pub station_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: default_max_age_minutes(),
            sample_limit: None,
            concurrency: default_concurrency(),
            station_timeout_secs: default_station_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_max_age_minutes() -> u64 {
    1440
}

fn default_concurrency() -> usize {
    1
}

fn default_station_timeout_secs() -> u64 {
    60
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6543))
}

impl WindDbConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: WindDbConfig =
            serde_yaml::from_str(yaml).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            anyhow::bail!("pipeline.concurrency must be at least 1");
        }
        if self.pipeline.station_timeout_secs == 0 {
            anyhow::bail!("pipeline.station_timeout_secs must be at least 1");
        }
        self.output_format()?;
        Ok(())
    }

    /// Replace the registry URL, e.g. from `WINDDB_REGISTRY_URL`.
    pub fn override_registry_url(&mut self, url: Option<String>) {
        if let Some(url) = url {
            self.registry.url = url;
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_callback(self.output.jsonp_callback.as_deref())
            .context("Invalid output.jsonp_callback")
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_age_minutes: self.pipeline.max_age_minutes,
            sample_limit: self.pipeline.sample_limit,
            concurrency: self.pipeline.concurrency,
            station_timeout: Duration::from_secs(self.pipeline.station_timeout_secs),
        }
    }
}
