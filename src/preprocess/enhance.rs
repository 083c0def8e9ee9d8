//! Profile-driven image enhancement.
//!
//! Applies an ordered sequence of transforms tuned for OCR legibility:
//! range normalization, brightness, gamma, linear contrast stretch,
//! unsharp masking, median denoising, grayscale conversion, optional
//! binarization, a 2048 px dimension cap, and JPEG encoding. Grayscale
//! plus contrast plus sharpening is the standard text-legibility boost;
//! the dimension cap keeps request payloads bounded for the downstream
//! API. Screenshots skip grayscale so colored UI text keeps its contrast.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, RgbImage};
use imageproc::filter::median_filter;

use super::analyzer::Profile;

/// Longest output side; larger inputs are downscaled proportionally.
pub const MAX_DIMENSION: u32 = 2048;
/// Output JPEG quality.
pub const JPEG_QUALITY: u8 = 95;

/// Enhance `img` per `profile` and encode the result as JPEG.
///
/// Step order matters; each transform operates on the previous step's
/// output. Errors are surfaced to the caller, which degrades to the
/// unmodified input (fail-open).
pub fn enhance(img: &DynamicImage, profile: &Profile) -> Result<Vec<u8>, ImageError> {
    let mut rgb = img.to_rgb8();

    if !profile.preserve_color {
        normalize_range(&mut rgb);
    }
    apply_lut(&mut rgb, &brightness_lut(profile.brightness));
    apply_lut(&mut rgb, &gamma_lut(profile.gamma));
    apply_lut(&mut rgb, &contrast_lut(profile.contrast));

    let mut out = DynamicImage::ImageRgb8(rgb);
    if profile.sharpen_sigma > 0.0 {
        out = out.unsharpen(profile.sharpen_sigma, 1);
    }
    if profile.denoise {
        out = DynamicImage::ImageRgb8(median_filter(&out.to_rgb8(), 1, 1));
    }

    if !profile.preserve_color {
        let mut gray = out.to_luma8();
        if let Some(cutoff) = profile.threshold {
            for pixel in gray.pixels_mut() {
                pixel[0] = if pixel[0] >= cutoff { 255 } else { 0 };
            }
        }
        out = DynamicImage::ImageLuma8(gray);
    }

    if out.width().max(out.height()) > MAX_DIMENSION {
        out = out.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    encode_jpeg(&out)
}

/// Encode as JPEG at the configured quality.
fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    img.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

/// Stretch channel values to the full 0..=255 range.
fn normalize_range(img: &mut RgbImage) {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for value in img.as_raw() {
        min = min.min(*value);
        max = max.max(*value);
    }
    if max <= min {
        return;
    }

    let span = (max - min) as f32;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let v = i as f32;
        *entry = (((v - min as f32) / span) * 255.0).clamp(0.0, 255.0) as u8;
    }
    apply_lut(img, &lut);
}

fn brightness_lut(factor: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = (i as f32 * factor).clamp(0.0, 255.0) as u8;
    }
    lut
}

fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let normalized = i as f32 / 255.0;
        *entry = (normalized.powf(gamma) * 255.0).clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Linear contrast stretch around the midpoint: `out = in * f - 128 * (f - 1)`.
fn contrast_lut(factor: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = (i as f32 * factor - 128.0 * (factor - 1.0)).clamp(0.0, 255.0) as u8;
    }
    lut
}

fn apply_lut(img: &mut RgbImage, lut: &[u8; 256]) {
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = lut[*channel as usize];
        }
    }
}
