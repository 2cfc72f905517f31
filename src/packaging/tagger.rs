//! ID3v2.3 tag writing.

use std::path::Path;

use id3::frame::{Comment, ExtendedLink, Picture, PictureType};
use id3::{Tag, TagLike, Version};
use tracing::debug;

use super::naming::staging_file;
use super::PackagingError;
use crate::config::PackagingSettings;

pub const COVER_MIME: &str = "image/jpeg";
pub const COVER_DESCRIPTION: &str = "Cover";
pub const COMMENT_LANG: &str = "eng";
pub const COMMENT_DESCRIPTION: &str = "desc";
pub const AUTHOR_URL_DESCRIPTION: &str = "Author URL";
pub const SOURCE_URL_DESCRIPTION: &str = "Source URL";

/// Metadata written into one track.
#[derive(Debug, Clone)]
pub struct TrackTags<'a> {
    pub title: &'a str,
    pub source_url: &'a str,
    pub cover_jpeg: Option<&'a [u8]>,
    pub identity: &'a PackagingSettings,
}

/// Read the existing tag of `path`, or start an empty one.
fn read_or_new(path: &Path) -> Result<Tag, PackagingError> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(tag),
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => Ok(Tag::new()),
        Err(e) => Err(PackagingError::Tag(e)),
    }
}

fn cover_picture(jpeg: &[u8]) -> Picture {
    Picture {
        mime_type: COVER_MIME.to_string(),
        picture_type: PictureType::CoverFront,
        description: COVER_DESCRIPTION.to_string(),
        data: jpeg.to_vec(),
    }
}

/// Write the full tag set to `path`, replacing title, links and pictures.
pub fn write_tags(path: &Path, tags: &TrackTags<'_>) -> Result<(), PackagingError> {
    let mut tag = read_or_new(path)?;
    let identity = tags.identity;

    tag.remove("TIT2");
    tag.remove("WXXX");
    tag.remove_all_pictures();

    tag.set_title(tags.title);
    tag.add_frame(Comment {
        lang: COMMENT_LANG.to_string(),
        description: COMMENT_DESCRIPTION.to_string(),
        text: tags.title.to_string(),
    });
    tag.set_artist(identity.author.as_str());
    tag.set_album_artist(identity.publisher.as_str());
    tag.set_text("TCOP", identity.copyright.as_str());
    tag.add_frame(ExtendedLink {
        description: AUTHOR_URL_DESCRIPTION.to_string(),
        link: identity.author_url.clone(),
    });
    tag.add_frame(ExtendedLink {
        description: SOURCE_URL_DESCRIPTION.to_string(),
        link: tags.source_url.to_string(),
    });

    if let Some(jpeg) = tags.cover_jpeg {
        tag.add_frame(cover_picture(jpeg));
    }

    tag.write_to_path(path, Version::Id3v23)?;
    debug!("Wrote tags to {:?}", path);
    Ok(())
}

/// Replace only the cover picture of an already tagged file.
///
/// The patched file is written next to `path` and renamed over it, so a
/// failed patch leaves the original untouched.
pub fn patch_cover(path: &Path, jpeg: &[u8]) -> Result<(), PackagingError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = staging_file(parent)?;
    {
        let mut original = std::fs::File::open(path)?;
        std::io::copy(&mut original, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
    }

    let mut tag = read_or_new(staged.path())?;
    tag.remove_all_pictures();
    tag.add_frame(cover_picture(jpeg));
    tag.write_to_path(staged.path(), Version::Id3v23)?;

    staged.persist(path).map_err(|e| PackagingError::Io(e.error))?;
    debug!("Patched cover of {:?}", path);
    Ok(())
}
