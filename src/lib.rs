//! tunegrab library
//!
//! Batch fetcher that turns a catalog of remote tracks into tagged MP3 files.
//! The binary is a thin wrapper; everything is exposed here for testing.

pub mod catalog;
pub mod cli_style;
pub mod config;
pub mod counters;
pub mod fetcher;
pub mod logging;
pub mod packaging;
pub mod pipeline;
pub mod runner;

pub use catalog::{load_catalog, pick_default_input, CatalogRecord};
pub use config::{AppConfig, CliConfig, FileConfig};
pub use counters::{Counters, CountersSnapshot};
pub use runner::{run_batch, run_catalog, BatchError, RunReport};
