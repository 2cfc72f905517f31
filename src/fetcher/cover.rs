//! Cover fetching with fallback request header sets.
//!
//! The cover origin rejects some requests depending on their header shape.
//! Header sets are tried from most likely to succeed down to minimal, each
//! with the full retry budget, stopping at the first success.

use std::path::Path;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use tracing::{info, warn};

use super::client::AssetFetcher;
use crate::config::ID_PLACEHOLDER;
use crate::counters::{Counters, Tally};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// One set of request headers for the cover origin.
#[derive(Debug, Clone, Copy)]
pub struct HeaderVariant {
    pub name: &'static str,
    /// Header names must be lowercase.
    pub headers: &'static [(&'static str, &'static str)],
    /// Send the record's source page as `Referer`.
    pub with_referer: bool,
}

impl HeaderVariant {
    pub fn header_map(&self, referer_url: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers {
            map.insert(
                HeaderName::from_static(*name),
                HeaderValue::from_static(*value),
            );
        }
        if self.with_referer {
            match HeaderValue::from_str(referer_url) {
                Ok(value) => {
                    map.insert(REFERER, value);
                }
                Err(_) => warn!("Ignoring invalid referer {:?}", referer_url),
            }
        }
        map
    }
}

/// Default header sets, most likely to succeed first.
pub const COVER_HEADER_VARIANTS: &[HeaderVariant] = &[
    HeaderVariant {
        name: "browser",
        headers: &[
            ("user-agent", BROWSER_USER_AGENT),
            ("accept", "image/avif,image/webp,image/apng,image/*,*/*;q=0.8"),
            ("accept-language", "en-US,en;q=0.9"),
            ("sec-fetch-dest", "image"),
            ("sec-fetch-mode", "no-cors"),
            ("sec-fetch-site", "cross-site"),
        ],
        with_referer: true,
    },
    HeaderVariant {
        name: "referer",
        headers: &[("accept", "image/*,*/*;q=0.8")],
        with_referer: true,
    },
    HeaderVariant {
        name: "minimal",
        headers: &[],
        with_referer: false,
    },
];

/// Resolves cover images for records.
pub struct CoverResolver {
    fetcher: Arc<AssetFetcher>,
    counters: Arc<Counters>,
    cover_url_template: String,
    variants: &'static [HeaderVariant],
}

impl CoverResolver {
    pub fn new(
        fetcher: Arc<AssetFetcher>,
        counters: Arc<Counters>,
        cover_url_template: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            counters,
            cover_url_template: cover_url_template.into(),
            variants: COVER_HEADER_VARIANTS,
        }
    }

    pub fn cover_url(&self, id: &str) -> String {
        self.cover_url_template.replace(ID_PLACEHOLDER, id)
    }

    /// Fetch the cover of `id` into `destination`.
    ///
    /// Every header set that exhausts its retry budget counts as one cover
    /// retry. Returns whether any set succeeded.
    pub async fn resolve_cover(&self, id: &str, referer_url: &str, destination: &Path) -> bool {
        let url = self.cover_url(id);
        let max_attempts = self.fetcher.policy().max_attempts;

        for variant in self.variants {
            let headers = variant.header_map(referer_url);
            let outcome = self
                .fetcher
                .fetch(&url, destination, &headers, max_attempts)
                .await;
            if outcome.succeeded {
                info!(
                    "Cover for {} fetched with '{}' headers ({} bytes)",
                    id, variant.name, outcome.bytes_written
                );
                return true;
            }

            self.counters.record(Tally::CoverRetry);
            warn!(
                "Cover for {} failed with '{}' headers after {} attempts",
                id, variant.name, outcome.attempts
            );
        }

        false
    }
}
