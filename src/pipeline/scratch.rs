use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "tunegrab-";

/// Root for per-item scratch directories.
///
/// Only entries carrying the scratch prefix are ever removed, so pointing the
/// tmp dir at a shared location is safe.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    root: PathBuf,
}

impl ScratchArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a uniquely named directory for one item.
    ///
    /// The directory is deleted when the returned guard drops, including
    /// during unwinding.
    pub fn item_dir(&self, id: &str) -> io::Result<TempDir> {
        std::fs::create_dir_all(&self.root)?;
        tempfile::Builder::new()
            .prefix(&format!("{}{}-", SCRATCH_PREFIX, id))
            .tempdir_in(&self.root)
    }

    /// Remove scratch left behind by earlier runs. Returns the number of
    /// entries removed.
    pub fn purge(&self) -> io::Result<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX) {
                continue;
            }
            let path = entry.path();
            let result = if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {
                    debug!("Removed stale scratch {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove stale scratch {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}
