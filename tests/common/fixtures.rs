//! Generated payloads and tag inspection helpers

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use super::constants::{AUDIO_PAYLOAD_LEN, COVER_SIDE};

/// Small deterministic generator so payloads differ per seed.
fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

/// Fake MP3 body: starts with a frame sync and never contains ASCII, so it
/// cannot be mistaken for tag data.
pub fn audio_payload(seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut bytes = vec![0xFF, 0xFB, 0x90, 0x64];
    while bytes.len() < AUDIO_PAYLOAD_LEN {
        bytes.push((xorshift(&mut state) as u8) | 0x80);
    }
    bytes
}

/// PNG full of noise, so it stays larger than the minimum asset size.
pub fn noisy_png(seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_add(0xDEAD_BEEF) | 1;
    let img = RgbImage::from_fn(COVER_SIDE, COVER_SIDE, |_, _| {
        let v = xorshift(&mut state);
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    cursor.into_inner()
}

pub fn read_tag(path: &Path) -> id3::Tag {
    id3::Tag::read_from_path(path).expect("Output file has no readable tag")
}
