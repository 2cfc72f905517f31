//! Second chance for covers missing after the main pass.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::item::{ItemResult, SCRATCH_COVER};
use super::scratch::ScratchArea;
use crate::counters::{Counters, CountersSnapshot};
use crate::fetcher::CoverResolver;
use crate::packaging::TrackPackager;

/// Sequentially re-fetches missing covers and patches them into the
/// already published outputs.
pub struct RepairPass {
    covers: Arc<CoverResolver>,
    packager: Arc<dyn TrackPackager>,
    counters: Arc<Counters>,
    scratch: ScratchArea,
    pause: Duration,
}

impl RepairPass {
    pub fn new(
        covers: Arc<CoverResolver>,
        packager: Arc<dyn TrackPackager>,
        counters: Arc<Counters>,
        scratch: ScratchArea,
        pause: Duration,
    ) -> Self {
        Self {
            covers,
            packager,
            counters,
            scratch,
            pause,
        }
    }

    /// Repair every result with an output but no cover.
    ///
    /// Results that already carry a cover, or have no output, are left alone
    /// and cause no network traffic.
    pub async fn repair(&self, results: &mut [ItemResult]) -> CountersSnapshot {
        let candidates: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_cover_repair())
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            info!("No covers to repair");
            return self.counters.snapshot();
        }
        info!("Repairing {} missing covers", candidates.len());

        for (n, &index) in candidates.iter().enumerate() {
            if n > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let item = &mut results[index];
            match self.repair_one(item).await {
                Ok(true) => {
                    item.cover_embedded = true;
                    self.counters.record_cover_repaired();
                    info!("Cover repaired for {} ({})", item.id, item.title);
                }
                Ok(false) => warn!("Cover for {} ({}) still unavailable", item.id, item.title),
                Err(e) => warn!("Cover repair for {} ({}) failed: {:#}", item.id, item.title, e),
            }
        }

        self.counters.snapshot()
    }

    async fn repair_one(&self, item: &ItemResult) -> Result<bool> {
        let Some(output) = item.output_path.clone() else {
            return Ok(false);
        };

        let scratch = self
            .scratch
            .item_dir(&item.id)
            .with_context(|| format!("Failed to create scratch directory for {}", item.id))?;
        let cover = scratch.path().join(SCRATCH_COVER);

        if !self.covers.resolve_cover(&item.id, &item.url, &cover).await {
            return Ok(false);
        }

        let packager = self.packager.clone();
        tokio::task::spawn_blocking(move || packager.patch_cover(&output, &cover))
            .await
            .context("Cover patch task panicked")??;
        Ok(true)
    }
}
