use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub output_dir: Option<String>,
    pub tmp_dir: Option<String>,
    pub log_file: Option<String>,
    pub audio_concurrency: Option<usize>,
    pub cover_concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub timeout_sec: Option<u64>,
    pub repair: Option<bool>,
    pub progress: Option<bool>,

    // Feature configs
    pub fetch: Option<FetchConfig>,
    pub packaging: Option<PackagingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub audio_url_template: Option<String>,
    pub cover_url_template: Option<String>,
    pub user_agent: Option<String>,
    pub min_asset_bytes: Option<u64>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_jitter_ms: Option<u64>,
    pub repair_pause_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PackagingConfig {
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub copyright: Option<String>,
    pub author_url: Option<String>,
    pub max_duplicate_names: Option<u32>,
    pub jpeg_quality: Option<u8>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            output_dir = "out"
            cover_concurrency = 1

            [fetch]
            cover_url_template = "http://localhost/{id}.jpg"
            max_backoff_ms = 500

            [packaging]
            author = "Someone"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir.as_deref(), Some("out"));
        assert_eq!(config.cover_concurrency, Some(1));
        let fetch = config.fetch.unwrap();
        assert_eq!(fetch.max_backoff_ms, Some(500));
        assert!(fetch.audio_url_template.is_none());
        assert_eq!(config.packaging.unwrap().author.as_deref(), Some("Someone"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.output_dir.is_none());
        assert!(config.fetch.is_none());
    }
}
