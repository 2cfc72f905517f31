//! Isolated working directory and configuration for one batch run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tunegrab::config::{AppConfig, CliConfig};
use tunegrab::fetcher::ProgressBoard;
use tunegrab::packaging::TrackPackager;
use tunegrab::runner::{load_batch, run_batch, run_catalog, RunReport};

use super::constants::TEST_MAX_ATTEMPTS;
use super::origin::TestOrigin;

pub struct TestEnv {
    pub config: AppConfig,
    dir: TempDir,
}

impl TestEnv {
    /// Config pointing at `origin`, with short backoffs and no repair pause.
    pub fn new(origin: &TestOrigin) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cli = CliConfig {
            output_dir: dir.path().join("downloads"),
            tmp_dir: dir.path().join("tmp"),
            log_file: dir.path().join("errors.log"),
            max_attempts: TEST_MAX_ATTEMPTS,
            timeout_sec: 5,
            no_progress: true,
            ..Default::default()
        };
        let mut config = AppConfig::resolve(&cli, None).expect("Invalid test config");
        config.fetch.audio_url_template = origin.audio_template();
        config.fetch.cover_url_template = origin.cover_template();
        config.fetch.initial_backoff_ms = 1;
        config.fetch.max_backoff_ms = 2;
        config.fetch.backoff_jitter_ms = 0;
        config.fetch.repair_pause_ms = 0;

        Self { config, dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn write_json_catalog(&self, records: &[(&str, &str)]) -> PathBuf {
        let entries: Vec<serde_json::Value> = records
            .iter()
            .map(|(id, title)| {
                serde_json::json!({
                    "id": id,
                    "url": format!("https://suno.com/song/{}", id),
                    "title": title,
                })
            })
            .collect();
        self.write_input(
            "songs.json",
            &serde_json::to_string_pretty(&entries).expect("Failed to encode catalog"),
        )
    }

    pub async fn run(&self, input: &Path) -> anyhow::Result<RunReport> {
        run_batch(&self.config, input, ProgressBoard::hidden()).await
    }

    pub async fn run_with_packager(
        &self,
        input: &Path,
        packager: Arc<dyn TrackPackager>,
    ) -> anyhow::Result<RunReport> {
        let catalog = load_batch(input)?;
        run_catalog(&self.config, input, catalog, packager, ProgressBoard::hidden()).await
    }

    /// Names of the files in the output directory, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.output_dir()) {
            Ok(entries) => entries
                .map(|e| {
                    e.expect("Failed to read output entry")
                        .file_name()
                        .to_string_lossy()
                        .to_string()
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}
