//! The contract every sample store implements.

use async_trait::async_trait;

use winddb_common::{CapabilitySet, SampleSeries, StationId, StationInfo, WindDbResult};

/// A backing store that can describe and return station samples.
///
/// Implementations own their connection pool and are shared by every
/// station whose handler names them.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Handler name the adapter was configured under.
    fn name(&self) -> &str;

    /// Called with each registry row bound to this adapter, before its
    /// capabilities are resolved. Adapters that depend on station metadata
    /// such as the poll rate keep what they need here.
    async fn register_station(&self, _info: &StationInfo) {}

    /// Capabilities the store can produce for `station`.
    async fn get_capabilities(&self, station: &StationId) -> WindDbResult<CapabilitySet>;

    /// Samples with `timestamp >= since` for every capability in
    /// `requested` that the station supports, newest first.
    ///
    /// No matching rows yields an empty series, not an error.
    async fn get_samples(
        &self,
        station: &StationId,
        since: i64,
        requested: &CapabilitySet,
    ) -> WindDbResult<SampleSeries>;
}
