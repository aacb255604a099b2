//! Common types and utilities shared across all winddb crates.

pub mod capability;
pub mod error;
pub mod sample;
pub mod station;

pub use capability::{Capability, CapabilityParseError, CapabilitySet, Quantity, Statistic};
pub use error::{WindDbError, WindDbResult};
pub use sample::{Sample, SampleSeries};
pub use station::{StationId, StationInfo};
