mod file_config;

pub use file_config::{FetchConfig, FileConfig, PackagingConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Placeholder substituted with the record id in asset URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

pub const DEFAULT_AUDIO_URL_TEMPLATE: &str = "https://cdn1.suno.ai/{id}.mp3";
pub const DEFAULT_COVER_URL_TEMPLATE: &str = "https://cdn2.suno.ai/image_{id}.jpeg";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; tunegrab/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub output_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub log_file: PathBuf,
    pub audio_concurrency: usize,
    pub cover_concurrency: usize,
    pub max_attempts: u32,
    pub timeout_sec: u64,
    pub no_repair: bool,
    pub no_progress: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            tmp_dir: PathBuf::from("tmp"),
            log_file: PathBuf::from("errors.log"),
            audio_concurrency: 5,
            cover_concurrency: 2,
            max_attempts: 3,
            timeout_sec: 60,
            no_repair: false,
            no_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub output_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub log_file: PathBuf,
    pub audio_concurrency: usize,
    pub cover_concurrency: usize,
    pub repair_enabled: bool,
    pub progress_enabled: bool,

    // Feature configs (with defaults)
    pub fetch: FetchSettings,
    pub packaging: PackagingSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());
        let tmp_dir = file
            .tmp_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.tmp_dir.clone());
        let log_file = file
            .log_file
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.log_file.clone());

        if output_dir.is_file() {
            bail!("output_dir is not a directory: {:?}", output_dir);
        }
        if tmp_dir.is_file() {
            bail!("tmp_dir is not a directory: {:?}", tmp_dir);
        }

        let audio_concurrency = file.audio_concurrency.unwrap_or(cli.audio_concurrency);
        let cover_concurrency = file.cover_concurrency.unwrap_or(cli.cover_concurrency);
        if audio_concurrency == 0 || cover_concurrency == 0 {
            bail!("Concurrency limits must be at least 1");
        }

        let repair_enabled = file.repair.unwrap_or(!cli.no_repair);
        let progress_enabled = file.progress.unwrap_or(!cli.no_progress);

        // Fetch settings - merge file config with defaults
        let fetch_file = file.fetch.unwrap_or_default();
        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            audio_url_template: fetch_file
                .audio_url_template
                .unwrap_or(defaults.audio_url_template),
            cover_url_template: fetch_file
                .cover_url_template
                .unwrap_or(defaults.cover_url_template),
            user_agent: fetch_file.user_agent.unwrap_or(defaults.user_agent),
            timeout_secs: file.timeout_sec.unwrap_or(cli.timeout_sec),
            max_attempts: file.max_attempts.unwrap_or(cli.max_attempts),
            min_asset_bytes: fetch_file
                .min_asset_bytes
                .unwrap_or(defaults.min_asset_bytes),
            initial_backoff_ms: fetch_file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: fetch_file
                .max_backoff_ms
                .unwrap_or(defaults.max_backoff_ms),
            backoff_jitter_ms: fetch_file
                .backoff_jitter_ms
                .unwrap_or(defaults.backoff_jitter_ms),
            repair_pause_ms: fetch_file
                .repair_pause_ms
                .unwrap_or(defaults.repair_pause_ms),
        };
        fetch.validate()?;

        let pkg_file = file.packaging.unwrap_or_default();
        let defaults = PackagingSettings::default();
        let packaging = PackagingSettings {
            author: pkg_file.author.unwrap_or(defaults.author),
            publisher: pkg_file.publisher.unwrap_or(defaults.publisher),
            copyright: pkg_file.copyright.unwrap_or(defaults.copyright),
            author_url: pkg_file.author_url.unwrap_or(defaults.author_url),
            max_duplicate_names: pkg_file
                .max_duplicate_names
                .unwrap_or(defaults.max_duplicate_names),
            jpeg_quality: pkg_file.jpeg_quality.unwrap_or(defaults.jpeg_quality),
        };
        packaging.validate()?;

        Ok(Self {
            output_dir,
            tmp_dir,
            log_file,
            audio_concurrency,
            cover_concurrency,
            repair_enabled,
            progress_enabled,
            fetch,
            packaging,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub audio_url_template: String,
    pub cover_url_template: String,
    pub user_agent: String,
    /// Applies to connecting and to each read stall, not to a whole download.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Responses smaller than this are treated as placeholders.
    pub min_asset_bytes: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_jitter_ms: u64,
    pub repair_pause_ms: u64,
}

impl FetchSettings {
    pub fn audio_url(&self, id: &str) -> String {
        self.audio_url_template.replace(ID_PLACEHOLDER, id)
    }

    fn validate(&self) -> Result<()> {
        for template in [&self.audio_url_template, &self.cover_url_template] {
            if !template.contains(ID_PLACEHOLDER) {
                bail!("URL template {:?} must contain {}", template, ID_PLACEHOLDER);
            }
        }
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_sec must be at least 1");
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            bail!(
                "max_backoff_ms ({}) must not be lower than initial_backoff_ms ({})",
                self.max_backoff_ms,
                self.initial_backoff_ms
            );
        }
        Ok(())
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            audio_url_template: DEFAULT_AUDIO_URL_TEMPLATE.to_string(),
            cover_url_template: DEFAULT_COVER_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            min_asset_bytes: 1024,
            initial_backoff_ms: 1000,
            max_backoff_ms: 8000,
            backoff_jitter_ms: 250,
            repair_pause_ms: 1500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PackagingSettings {
    pub author: String,
    pub publisher: String,
    pub copyright: String,
    /// Operator homepage, written as the first WXXX frame.
    pub author_url: String,
    /// Upper bound of the `" vN"` suffix search for a free output name.
    pub max_duplicate_names: u32,
    pub jpeg_quality: u8,
}

impl PackagingSettings {
    fn validate(&self) -> Result<()> {
        if self.max_duplicate_names == 0 {
            bail!("max_duplicate_names must be at least 1");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpeg_quality must be between 1 and 100");
        }
        Ok(())
    }
}

impl Default for PackagingSettings {
    fn default() -> Self {
        Self {
            author: "RoganovDA".to_string(),
            publisher: "RoganovDA".to_string(),
            copyright: "Copyright © RoganovDA".to_string(),
            author_url: "https://t.me/slow_rda".to_string(),
            max_duplicate_names: 9999,
            jpeg_quality: 92,
        }
    }
}
