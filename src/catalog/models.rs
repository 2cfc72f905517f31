//! Catalog record types.

use serde::{Deserialize, Serialize};

/// Title used when a record carries none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Base of the canonical source page of a record.
pub const SOURCE_URL_BASE: &str = "https://suno.com/song/";

/// One entry of the input catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Catalog-unique key, also used to derive the asset locations.
    pub id: String,
    /// Canonical source reference.
    pub url: String,
    /// Human label, used for the output file name and the title tag.
    pub title: String,
}

impl CatalogRecord {
    /// Build a record from possibly-blank raw fields.
    ///
    /// The id falls back to the last path segment of `url`. Returns `None`
    /// when no usable id can be derived.
    pub fn from_raw(id: Option<&str>, url: Option<&str>, title: Option<&str>) -> Option<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        let id = id
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .or_else(|| url.and_then(id_from_url))?;

        if !is_valid_id(&id) {
            return None;
        }

        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| source_url_for(&id));
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        Some(Self { id, url, title })
    }
}

/// Canonical source page for an id.
pub fn source_url_for(id: &str) -> String {
    format!("{}{}", SOURCE_URL_BASE, id)
}

/// Extract the trailing path segment of a URL, ignoring query and fragment.
pub fn id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(str::to_string)
}

/// Ids end up inside asset URLs, so only URL-safe characters are accepted.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
