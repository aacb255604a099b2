//! Station aggregation for winddb.
//!
//! Turns "all samples since T" from the configured sources into static
//! per-station documents and a station index.
//!
//! # Architecture
//!
//! - [`Registry`] reads station definitions and binds each to its source
//! - [`Pipeline`] fetches samples per station and renders documents
//! - [`OutputWriter`] implementations persist the documents
//! - [`Listener`] runs the pipeline for stations named over TCP

pub mod listener;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod station;

// Re-exports
pub use listener::{parse_notification, Listener, ListenerStats};
pub use output::{
    Document, DocumentAddress, DocumentKind, FileWriter, IndexDocument, IndexEntry, InfoDocument,
    LatestDocument, MemoryWriter, OutputFormat, OutputWriter, SamplesDocument,
};
pub use pipeline::{
    build_documents, build_index, unix_now, BatchReport, Pipeline, PipelineSettings,
    StationOutcome,
};
pub use registry::Registry;
pub use station::Station;
