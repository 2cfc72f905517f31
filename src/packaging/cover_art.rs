//! Cover image normalization to baseline RGB JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverArtError {
    #[error("Cover data is not a recognized image (detected: {0})")]
    NotAnImage(String),
    #[error("Failed to decode cover image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode cover as JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Return `bytes` as JPEG data suitable for an ID3 picture frame.
///
/// Every decodable image, JPEG included, is flattened to RGB and re-encoded
/// at `quality`. Only freshly encoded RGB JPEG data ever reaches the tag.
pub fn ensure_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, CoverArtError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(CoverArtError::NotAnImage(kind.mime_type().to_string()));
        }
    }

    let decoded = image::load_from_memory(bytes).map_err(CoverArtError::Decode)?;
    let rgb = decoded.to_rgb8();

    let mut encoded = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100));
    encoder
        .encode_image(&DynamicImage::ImageRgb8(rgb))
        .map_err(CoverArtError::Encode)?;

    Ok(encoded.into_inner())
}
