//! Automatic input selection when no catalog path is given.

use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;

/// File name of the legacy line-format catalog.
pub const LEGACY_FILENAME: &str = "list.txt";

/// Candidate groups, highest priority first.
const PRIORITY_GROUPS: &[&[&str]] = &[&["json"], &["csv", "tsv"]];

/// Pick a catalog file from `dir`.
///
/// JSON files win over delimited text, which wins over the legacy
/// `list.txt`. Ties within a group are broken uniformly at random.
pub fn pick_default_input(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    for group in PRIORITY_GROUPS {
        let candidates: Vec<&PathBuf> = files
            .iter()
            .filter(|p| has_extension(p, group))
            .collect();
        if let Some(choice) = candidates.choose(&mut rand::rng()) {
            return Ok(Some((*choice).clone()));
        }
    }

    let legacy = dir.join(LEGACY_FILENAME);
    Ok(legacy.is_file().then_some(legacy))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}
