//! Handler name to adapter lookup table.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use winddb_common::WindDbResult;

use crate::adapter::SourceAdapter;
use crate::awsxd::AwsxdSource;
use crate::config::SourceConfig;
use crate::osod::OsodSource;
use crate::periodic::PeriodicSource;
use crate::vivad::VivadSource;

/// Construct the adapter described by `config`.
pub async fn connect_source(
    name: &str,
    config: &SourceConfig,
) -> WindDbResult<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match config {
        SourceConfig::Awsxd {
            url,
            wind_speed_unit,
        } => Arc::new(AwsxdSource::connect(name, url, *wind_speed_unit).await?),
        SourceConfig::Osod {
            path,
            wind_speed_unit,
        } => Arc::new(OsodSource::open(name, path, *wind_speed_unit).await?),
        SourceConfig::Vivad {
            path,
            wind_speed_unit,
        } => Arc::new(VivadSource::open(name, path, *wind_speed_unit).await?),
        SourceConfig::Periodic {
            url,
            poll_rate_secs,
            period_count,
            wind_speed_unit,
        } => Arc::new(
            PeriodicSource::connect(name, url, *poll_rate_secs, *period_count, *wind_speed_unit)
                .await?,
        ),
    };

    Ok(adapter)
}

/// The adapters available to the registry, one per configured handler.
#[derive(Clone, Default)]
pub struct SourceSet {
    adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every configured adapter.
    ///
    /// An adapter that fails to connect is logged and left out; stations
    /// naming its handler are then skipped by the registry.
    pub async fn connect(configs: &BTreeMap<String, SourceConfig>) -> Self {
        let results: Vec<_> = stream::iter(configs.iter())
            .then(|(name, config)| async move { (name, config, connect_source(name, config).await) })
            .collect()
            .await;

        let mut set = SourceSet::new();
        for (name, config, result) in results {
            match result {
                Ok(adapter) => set.insert(name.clone(), adapter),
                Err(e) => warn!(
                    handler = %name,
                    kind = config.kind(),
                    error = %e,
                    "Source unavailable, its stations will be skipped"
                ),
            }
        }

        info!(count = set.len(), configured = configs.len(), "Sources connected");
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSet")
            .field("handlers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
