//! WindDB service library.
//!
//! Wires configuration, source adapters, the station registry and the
//! aggregation pipeline together for the `winddb` binary.

pub mod app;
pub mod config;

pub use app::{App, BatchOptions};
pub use config::WindDbConfig;
