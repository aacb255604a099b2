//! A registry row bound to its source adapter.

use std::fmt;
use std::sync::Arc;

use sources::SourceAdapter;
use winddb_common::{CapabilitySet, SampleSeries, StationId, StationInfo, WindDbResult};

/// Station metadata, its adapter, and the capabilities resolved at load time.
#[derive(Clone)]
pub struct Station {
    info: StationInfo,
    adapter: Arc<dyn SourceAdapter>,
    capabilities: CapabilitySet,
}

impl Station {
    /// Bind `info` to `adapter`, asking the adapter for the capability set.
    pub async fn resolve(info: StationInfo, adapter: Arc<dyn SourceAdapter>) -> WindDbResult<Self> {
        adapter.register_station(&info).await;
        let capabilities = adapter.get_capabilities(&info.id).await?;
        Ok(Self::new(info, adapter, capabilities))
    }

    pub fn new(
        info: StationInfo,
        adapter: Arc<dyn SourceAdapter>,
        capabilities: CapabilitySet,
    ) -> Self {
        Self {
            info,
            adapter,
            capabilities,
        }
    }

    pub fn id(&self) -> &StationId {
        &self.info.id
    }

    pub fn info(&self) -> &StationInfo {
        &self.info
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn handler(&self) -> &str {
        self.adapter.name()
    }

    /// Samples since `since` for this station's capabilities, newest first.
    ///
    /// The adapter's result is filtered and sorted again here, so the series
    /// holds only supported capabilities whatever the adapter returns.
    pub async fn get_samples(&self, since: i64) -> WindDbResult<SampleSeries> {
        let mut series = self
            .adapter
            .get_samples(&self.info.id, since, &self.capabilities)
            .await?;

        series.retain_capabilities(&self.capabilities);
        series.retain_since(since);
        series.sort_descending();

        Ok(series)
    }
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Station")
            .field("id", &self.info.id)
            .field("handler", &self.adapter.name())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}
