//! Catalog file parsing.
//!
//! Supports a JSON array of `{id, url, title}` objects, comma or tab
//! delimited text with an optional `id,url,title` header, and the legacy
//! `"<source-url>" - "<title>"` line format.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::CatalogRecord;

/// Number of leading bytes inspected when the extension is inconclusive.
const SNIFF_LEN: usize = 2048;

lazy_static! {
    static ref LEGACY_LINE: Regex =
        Regex::new(r#"(?i)^"\s*(https?://[^"\s]+)\s*"\s*-\s*"(.*)"\s*$"#)
            .expect("legacy line pattern is valid");
}

/// Errors that abort loading the whole catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON catalog must be an array of records")]
    NotAnArray,
}

/// Input formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Csv,
    Tsv,
    Legacy,
}

impl CatalogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogFormat::Json => "json",
            CatalogFormat::Csv => "csv",
            CatalogFormat::Tsv => "tsv",
            CatalogFormat::Legacy => "legacy",
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(CatalogFormat::Json),
            "csv" => Some(CatalogFormat::Csv),
            "tsv" => Some(CatalogFormat::Tsv),
            "txt" => Some(CatalogFormat::Legacy),
            _ => None,
        }
    }

    /// Guess the format from the first bytes of the content.
    fn sniff(content: &str) -> Self {
        let head: String = content.chars().take(SNIFF_LEN).collect();
        let trimmed = head.trim_start();
        if trimmed.starts_with('[') {
            CatalogFormat::Json
        } else if trimmed.starts_with('"')
            && trimmed
                .lines()
                .next()
                .is_some_and(|line| LEGACY_LINE.is_match(line))
        {
            CatalogFormat::Legacy
        } else if head.contains('\t') && !head.contains(',') {
            CatalogFormat::Tsv
        } else {
            CatalogFormat::Csv
        }
    }

    fn delimiter(&self) -> Option<char> {
        match self {
            CatalogFormat::Csv => Some(','),
            CatalogFormat::Tsv => Some('\t'),
            _ => None,
        }
    }
}

/// A parsed catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub format: CatalogFormat,
    pub records: Vec<CatalogRecord>,
    /// Entries dropped as malformed or duplicate.
    pub skipped: usize,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Deserialize)]
struct RawJsonRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Load a catalog file, detecting its format by extension and then content.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let format =
        CatalogFormat::from_extension(path).unwrap_or_else(|| CatalogFormat::sniff(content));
    debug!("Parsing {:?} as {}", path, format.as_str());

    parse_catalog(content, format)
}

/// Parse catalog content in a known format.
pub fn parse_catalog(content: &str, format: CatalogFormat) -> Result<Catalog, CatalogError> {
    let mut builder = CatalogBuilder::new(format);

    match format {
        CatalogFormat::Json => parse_json(content, &mut builder)?,
        CatalogFormat::Csv | CatalogFormat::Tsv => {
            let delimiter = format.delimiter().unwrap_or(',');
            parse_delimited(content, delimiter, &mut builder)
        }
        CatalogFormat::Legacy => parse_legacy(content, &mut builder),
    }

    Ok(builder.finish())
}

/// Accumulates records, dropping malformed and duplicate entries.
struct CatalogBuilder {
    format: CatalogFormat,
    records: Vec<CatalogRecord>,
    seen: HashSet<String>,
    skipped: usize,
}

impl CatalogBuilder {
    fn new(format: CatalogFormat) -> Self {
        Self {
            format,
            records: Vec::new(),
            seen: HashSet::new(),
            skipped: 0,
        }
    }

    fn push(&mut self, location: &str, record: Option<CatalogRecord>) {
        match record {
            Some(record) => {
                if self.seen.insert(record.id.clone()) {
                    self.records.push(record);
                } else {
                    warn!("Skipping {}: duplicate id {}", location, record.id);
                    self.skipped += 1;
                }
            }
            None => {
                warn!("Skipping {}: no usable id", location);
                self.skipped += 1;
            }
        }
    }

    fn skip(&mut self, location: &str, reason: &str) {
        warn!("Skipping {}: {}", location, reason);
        self.skipped += 1;
    }

    fn finish(self) -> Catalog {
        Catalog {
            format: self.format,
            records: self.records,
            skipped: self.skipped,
        }
    }
}

fn parse_json(content: &str, builder: &mut CatalogBuilder) -> Result<(), CatalogError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        _ => return Err(CatalogError::NotAnArray),
    };

    for (idx, entry) in entries.into_iter().enumerate() {
        let location = format!("entry #{}", idx + 1);
        match serde_json::from_value::<RawJsonRecord>(entry) {
            Ok(raw) => builder.push(
                &location,
                CatalogRecord::from_raw(
                    raw.id.as_deref(),
                    raw.url.as_deref(),
                    raw.title.as_deref(),
                ),
            ),
            Err(e) => builder.skip(&location, &e.to_string()),
        }
    }
    Ok(())
}

/// Column positions of the three known fields.
struct Columns {
    id: usize,
    url: usize,
    title: usize,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        id: 0,
        url: 1,
        title: 2,
    };

    /// Recognize a header row containing all of `id`, `url` and `title`.
    fn from_header(row: &[String]) -> Option<Self> {
        let find = |name: &str| {
            row.iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
        };
        Some(Columns {
            id: find("id")?,
            url: find("url")?,
            title: find("title")?,
        })
    }
}

fn parse_delimited(content: &str, delimiter: char, builder: &mut CatalogBuilder) {
    let rows = split_rows(content, delimiter);
    let mut rows = rows.into_iter().enumerate().peekable();

    let header = rows
        .peek()
        .and_then(|(_, first)| Columns::from_header(first));
    let columns = match header {
        Some(columns) => {
            rows.next();
            columns
        }
        None => Columns::POSITIONAL,
    };

    for (idx, row) in rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |i: usize| row.get(i).map(String::as_str);
        builder.push(
            &format!("row {}", idx + 1),
            CatalogRecord::from_raw(cell(columns.id), cell(columns.url), cell(columns.title)),
        );
    }
}

/// Split delimited text into rows of cells.
///
/// Fields may be wrapped in double quotes; a quoted field can contain the
/// delimiter, line breaks, and `""` as an escaped quote.
fn split_rows(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

fn parse_legacy(content: &str, builder: &mut CatalogBuilder) {
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let location = format!("line {}", idx + 1);
        match LEGACY_LINE.captures(line.trim()) {
            Some(caps) => {
                let url = caps.get(1).map(|m| m.as_str());
                let title = caps.get(2).map(|m| m.as_str());
                builder.push(&location, CatalogRecord::from_raw(None, url, title));
            }
            None => builder.skip(&location, "not a \"<url>\" - \"<title>\" line"),
        }
    }
}
