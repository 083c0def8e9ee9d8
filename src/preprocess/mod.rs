//! Adaptive image preprocessing.
//!
//! Prepares uploaded document images for OCR in three stages:
//! boundary detection (crop away background), characteristic analysis
//! (pick an enhancement profile from brightness statistics), and
//! profile-driven enhancement (contrast, sharpening, grayscale, resize,
//! JPEG encode).
//!
//! The whole chain is fail-open: a missed enhancement is better than a
//! failed extraction, so any internal error degrades to the unmodified
//! input bytes and never propagates to the caller.

mod analyzer;
mod boundary;
mod enhance;

pub use analyzer::{analyze, classify, measure, EnhancementMode, ImageStats, Profile};
pub use boundary::detect_and_crop;
pub use enhance::{enhance, JPEG_QUALITY, MAX_DIMENSION};

use std::io::Cursor;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};

/// Run the full preprocessing chain over raw image bytes.
///
/// Returns an enhanced JPEG buffer, or the input unchanged if any stage
/// fails internally.
pub fn prepare(bytes: &[u8]) -> Vec<u8> {
    match try_prepare(bytes) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            tracing::warn!("image preprocessing failed, using original image: {}", e);
            bytes.to_vec()
        }
    }
}

fn try_prepare(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = decode_oriented(bytes)?;
    let cropped = boundary::detect_and_crop(&img);
    let profile = analyzer::analyze(&cropped);
    enhance::enhance(&cropped, &profile)
}

/// Decode image bytes and apply any embedded orientation metadata.
fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}
