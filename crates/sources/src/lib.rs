//! Source adapters for station sample stores.
//!
//! Provides unified interfaces for:
//! - The awsxd relational table (MySQL in production)
//! - The osod and vivad embedded SQLite databases
//! - Period bucketing over raw awsxd rows

pub mod adapter;
pub mod awsxd;
pub mod coerce;
pub mod config;
pub mod db;
pub mod osod;
pub mod periodic;
pub mod set;
pub mod vivad;

pub use adapter::SourceAdapter;
pub use awsxd::AwsxdSource;
pub use config::{SourceConfig, WindSpeedUnit};
pub use db::SqlDialect;
pub use osod::OsodSource;
pub use periodic::{PeriodicSource, SamplePeriod};
pub use set::{connect_source, SourceSet};
pub use vivad::VivadSource;
