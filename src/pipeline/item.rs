//! Fetch, cover and package one catalog record.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::scratch::ScratchArea;
use crate::catalog::CatalogRecord;
use crate::config::{AppConfig, FetchSettings};
use crate::counters::{Counters, Tally};
use crate::fetcher::{AssetFetcher, CoverResolver};
use crate::packaging::TrackPackager;

const SCRATCH_AUDIO: &str = "audio.mp3";
pub(crate) const SCRATCH_COVER: &str = "cover.img";

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Set only once the output file is complete and tagged.
    pub output_path: Option<PathBuf>,
    pub cover_embedded: bool,
}

impl ItemResult {
    pub fn failed(record: &CatalogRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            url: record.url.clone(),
            output_path: None,
            cover_embedded: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.output_path.is_some()
    }

    /// An output exists but carries no cover yet.
    pub fn needs_cover_repair(&self) -> bool {
        self.output_path.is_some() && !self.cover_embedded
    }
}

/// Per-record pipeline shared by every item task of a batch.
///
/// Holds the two class limiters. An audio slot is released before a cover
/// slot is requested, and packaging runs with no slot held.
pub struct ItemPipeline {
    fetcher: Arc<AssetFetcher>,
    covers: Arc<CoverResolver>,
    packager: Arc<dyn TrackPackager>,
    counters: Arc<Counters>,
    scratch: ScratchArea,
    fetch: FetchSettings,
    audio_slots: Semaphore,
    cover_slots: Semaphore,
}

impl ItemPipeline {
    pub fn new(
        fetcher: Arc<AssetFetcher>,
        covers: Arc<CoverResolver>,
        packager: Arc<dyn TrackPackager>,
        counters: Arc<Counters>,
        scratch: ScratchArea,
        config: &AppConfig,
    ) -> Self {
        Self {
            fetcher,
            covers,
            packager,
            counters,
            scratch,
            fetch: config.fetch.clone(),
            audio_slots: Semaphore::new(config.audio_concurrency),
            cover_slots: Semaphore::new(config.cover_concurrency),
        }
    }

    /// Run the record through audio, cover and packaging.
    ///
    /// Never fails: unexpected errors are logged with the record identity and
    /// turned into a failed result.
    pub async fn process(&self, record: &CatalogRecord) -> ItemResult {
        match self.try_process(record).await {
            Ok(result) => result,
            Err(e) => {
                error!("Item {} ({}) failed: {:#}", record.id, record.title, e);
                ItemResult::failed(record)
            }
        }
    }

    async fn try_process(&self, record: &CatalogRecord) -> Result<ItemResult> {
        let scratch = self
            .scratch
            .item_dir(&record.id)
            .with_context(|| format!("Failed to create scratch directory for {}", record.id))?;
        let audio_path = scratch.path().join(SCRATCH_AUDIO);
        let cover_path = scratch.path().join(SCRATCH_COVER);

        let audio = {
            let _slot = self
                .audio_slots
                .acquire()
                .await
                .context("Audio limiter closed")?;
            self.fetcher
                .fetch_default(&self.fetch.audio_url(&record.id), &audio_path)
                .await
        };
        if !audio.succeeded {
            self.counters.record(Tally::AudioFail);
            warn!(
                "Audio for {} ({}) failed after {} attempts, skipping item",
                record.id, record.title, audio.attempts
            );
            return Ok(ItemResult::failed(record));
        }
        self.counters.record(Tally::AudioOk);

        let cover_fetched = {
            let _slot = self
                .cover_slots
                .acquire()
                .await
                .context("Cover limiter closed")?;
            self.covers
                .resolve_cover(&record.id, &record.url, &cover_path)
                .await
        };
        if !cover_fetched {
            warn!("No cover for {} ({}) on the main pass", record.id, record.title);
        }

        let packager = self.packager.clone();
        let owned = record.clone();
        let cover = cover_fetched.then_some(cover_path);
        let packaged = tokio::task::spawn_blocking(move || {
            packager.package(&audio_path, cover.as_deref(), &owned)
        })
        .await
        .context("Packaging task panicked")?;

        match packaged {
            Ok(track) => {
                self.counters.record(if track.cover_embedded {
                    Tally::CoverOk
                } else {
                    Tally::CoverFail
                });
                info!(
                    "Item {} done: {:?} (cover: {})",
                    record.id, track.path, track.cover_embedded
                );
                Ok(ItemResult {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    url: record.url.clone(),
                    output_path: Some(track.path),
                    cover_embedded: track.cover_embedded,
                })
            }
            Err(e) => {
                self.counters.record(if cover_fetched {
                    Tally::CoverOk
                } else {
                    Tally::CoverFail
                });
                error!(
                    "Packaging {} ({}) failed: {}",
                    record.id, record.title, e
                );
                Ok(ItemResult::failed(record))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, PackagingSettings};
    use crate::fetcher::ProgressBoard;
    use crate::packaging::Id3Packager;
    use tempfile::TempDir;

    fn record() -> CatalogRecord {
        CatalogRecord::from_raw(Some("abc"), None, Some("Song")).unwrap()
    }

    #[test]
    fn test_item_result_states() {
        let mut result = ItemResult::failed(&record());
        assert!(!result.succeeded());
        assert!(!result.needs_cover_repair());

        result.output_path = Some(PathBuf::from("downloads/Song.mp3"));
        assert!(result.succeeded());
        assert!(result.needs_cover_repair());

        result.cover_embedded = true;
        assert!(!result.needs_cover_repair());
    }

    #[tokio::test]
    async fn test_unreachable_audio_fails_item_and_skips_cover() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            output_dir: dir.path().join("out"),
            tmp_dir: dir.path().join("tmp"),
            max_attempts: 1,
            timeout_sec: 1,
            ..Default::default()
        };
        let mut config = AppConfig::resolve(&cli, None).unwrap();
        config.fetch.audio_url_template = "http://127.0.0.1:9/{id}.mp3".to_string();
        config.fetch.cover_url_template = "http://127.0.0.1:9/image_{id}.jpeg".to_string();

        let counters = Arc::new(Counters::new());
        let fetcher = Arc::new(AssetFetcher::new(&config.fetch, ProgressBoard::hidden()).unwrap());
        let covers = Arc::new(CoverResolver::new(
            fetcher.clone(),
            counters.clone(),
            config.fetch.cover_url_template.clone(),
        ));
        let packager = Arc::new(Id3Packager::new(
            &config.output_dir,
            PackagingSettings::default(),
        ));
        let pipeline = ItemPipeline::new(
            fetcher,
            covers,
            packager,
            counters.clone(),
            ScratchArea::new(&config.tmp_dir),
            &config,
        );

        let result = pipeline.process(&record()).await;

        assert!(!result.succeeded());
        let snap = counters.snapshot();
        assert_eq!(snap.audio_fail, 1);
        assert_eq!(snap.audio_ok, 0);
        assert_eq!(snap.cover_retries, 0);
        assert_eq!(snap.cover_fail, 0);
        assert!(!config.output_dir.exists());
        // Scratch directory was removed
        assert_eq!(std::fs::read_dir(&config.tmp_dir).unwrap().count(), 0);
    }
}
