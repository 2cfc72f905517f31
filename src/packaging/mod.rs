//! Turning a fetched audio file into a tagged, uniquely named output.

mod cover_art;
mod naming;
mod tagger;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use cover_art::{ensure_jpeg, CoverArtError};
pub use naming::{candidate_name, publish_no_clobber, sanitize_title};
pub use tagger::{patch_cover, write_tags, TrackTags};

use crate::catalog::CatalogRecord;
use crate::config::PackagingSettings;

pub const OUTPUT_EXTENSION: &str = ".mp3";

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tag error: {0}")]
    Tag(#[from] id3::Error),
    #[error("Unusable cover: {0}")]
    Cover(#[from] CoverArtError),
    #[error("No free name for {name} after {limit} candidates")]
    TooManyDuplicates { name: String, limit: u32 },
}

/// A published output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedTrack {
    pub path: PathBuf,
    pub cover_embedded: bool,
}

/// Tags and publishes fetched audio. Implementations are blocking.
pub trait TrackPackager: Send + Sync {
    /// Tag the scratch audio with `record`'s metadata and an optional cover,
    /// then publish it to the output directory under a collision-free name.
    fn package(
        &self,
        scratch_audio: &Path,
        cover: Option<&Path>,
        record: &CatalogRecord,
    ) -> Result<PackagedTrack, PackagingError>;

    /// Embed `cover` into an existing output, leaving everything else as is.
    fn patch_cover(&self, output: &Path, cover: &Path) -> Result<(), PackagingError>;
}

/// [`TrackPackager`] writing ID3v2.3 tags.
pub struct Id3Packager {
    output_dir: PathBuf,
    settings: PackagingSettings,
}

impl Id3Packager {
    pub fn new(output_dir: impl Into<PathBuf>, settings: PackagingSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            settings,
        }
    }

    fn load_cover(&self, cover: &Path) -> Result<Vec<u8>, PackagingError> {
        let bytes = std::fs::read(cover)?;
        Ok(ensure_jpeg(&bytes, self.settings.jpeg_quality)?)
    }
}

impl TrackPackager for Id3Packager {
    fn package(
        &self,
        scratch_audio: &Path,
        cover: Option<&Path>,
        record: &CatalogRecord,
    ) -> Result<PackagedTrack, PackagingError> {
        // A bad cover never costs the track; the repair pass gets another go.
        let cover_jpeg = match cover {
            Some(path) => match self.load_cover(path) {
                Ok(jpeg) => Some(jpeg),
                Err(e) => {
                    warn!("Skipping cover for {}: {}", record.id, e);
                    None
                }
            },
            None => None,
        };

        write_tags(
            scratch_audio,
            &TrackTags {
                title: &record.title,
                source_url: &record.url,
                cover_jpeg: cover_jpeg.as_deref(),
                identity: &self.settings,
            },
        )?;

        let path = publish_no_clobber(
            scratch_audio,
            &self.output_dir,
            &sanitize_title(&record.title),
            OUTPUT_EXTENSION,
            self.settings.max_duplicate_names,
        )?;
        info!("Saved {:?}", path);

        Ok(PackagedTrack {
            path,
            cover_embedded: cover_jpeg.is_some(),
        })
    }

    fn patch_cover(&self, output: &Path, cover: &Path) -> Result<(), PackagingError> {
        let jpeg = self.load_cover(cover)?;
        patch_cover(output, &jpeg)
    }
}
