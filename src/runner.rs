//! One batch run: catalog in, tagged files and a summary out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{load_catalog, Catalog};
use crate::config::AppConfig;
use crate::counters::{Counters, CountersSnapshot};
use crate::fetcher::{AssetFetcher, CoverResolver, ProgressBoard};
use crate::packaging::{Id3Packager, TrackPackager};
use crate::pipeline::{FleetScheduler, ItemPipeline, ItemResult, RepairPass, ScratchArea};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No valid records in {0:?}")]
    NoValidRecords(PathBuf),
}

/// Outcome of a whole batch.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub format: &'static str,
    pub records: usize,
    pub skipped: usize,
    pub results: Vec<ItemResult>,
    pub counters: CountersSnapshot,
}

impl RunReport {
    pub fn saved(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.saved()
    }
}

/// Load and validate the input catalog. Fails before any network activity
/// when it holds no usable record.
pub fn load_batch(input: &Path) -> Result<Catalog> {
    let catalog = load_catalog(input)
        .with_context(|| format!("Failed to load input file {:?}", input))?;
    if catalog.is_empty() {
        return Err(BatchError::NoValidRecords(input.to_path_buf()).into());
    }
    info!(
        "Loaded {} records from {:?} as {} ({} skipped)",
        catalog.len(),
        input,
        catalog.format.as_str(),
        catalog.skipped
    );
    Ok(catalog)
}

/// Run the main pass and, when enabled, the repair pass over `input`.
pub async fn run_batch(config: &AppConfig, input: &Path, progress: ProgressBoard) -> Result<RunReport> {
    let catalog = load_batch(input)?;
    let packager: Arc<dyn TrackPackager> = Arc::new(Id3Packager::new(
        &config.output_dir,
        config.packaging.clone(),
    ));
    run_catalog(config, input, catalog, packager, progress).await
}

/// Run an already loaded catalog through a given packager.
pub async fn run_catalog(
    config: &AppConfig,
    input: &Path,
    catalog: Catalog,
    packager: Arc<dyn TrackPackager>,
    progress: ProgressBoard,
) -> Result<RunReport> {
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    let scratch = ScratchArea::new(&config.tmp_dir);
    purge_scratch(&scratch);

    let counters = Arc::new(Counters::new());
    let fetcher = Arc::new(AssetFetcher::new(&config.fetch, progress)?);
    let covers = Arc::new(CoverResolver::new(
        fetcher.clone(),
        counters.clone(),
        config.fetch.cover_url_template.clone(),
    ));
    let pipeline = Arc::new(ItemPipeline::new(
        fetcher,
        covers.clone(),
        packager.clone(),
        counters.clone(),
        scratch.clone(),
        config,
    ));

    let Catalog {
        format,
        records,
        skipped,
    } = catalog;
    let record_count = records.len();

    let mut results = FleetScheduler::new(pipeline).run_all(records).await;

    let snapshot = if config.repair_enabled {
        RepairPass::new(
            covers,
            packager,
            counters.clone(),
            scratch.clone(),
            Duration::from_millis(config.fetch.repair_pause_ms),
        )
        .repair(&mut results)
        .await
    } else {
        counters.snapshot()
    };

    purge_scratch(&scratch);

    Ok(RunReport {
        input: input.to_path_buf(),
        format: format.as_str(),
        records: record_count,
        skipped,
        results,
        counters: snapshot,
    })
}

fn purge_scratch(scratch: &ScratchArea) {
    match scratch.purge() {
        Ok(0) => {}
        Ok(n) => info!("Removed {} stale scratch entries from {:?}", n, scratch.root()),
        Err(e) => warn!("Failed to clean scratch area {:?}: {}", scratch.root(), e),
    }
}
