//! Document boundary detection.
//!
//! Isolates the document region from surrounding background with a
//! brightness heuristic: dark-dominant images (light page on a dark
//! backdrop) get a 5% crop from each edge, light-dominant images (page
//! shot against a light background, intrusive borders or hands) get 10%.
//!
//! This is a uniform proportional crop, not a detected quadrilateral
//! boundary; a contour-based detector could replace it behind the same
//! fail-open contract.

use image::{DynamicImage, GenericImageView};

use super::analyzer;

/// Mean brightness below this marks an image as dark-dominant.
const DARK_MEAN_CUTOFF: f32 = 128.0;
/// Edge crop fraction for dark-dominant images.
const DARK_CROP: f32 = 0.05;
/// Edge crop fraction for light-dominant images.
const LIGHT_CROP: f32 = 0.10;

/// Crop the likely document region out of `img`.
///
/// Never fails visibly: a degenerate crop region returns the input
/// unchanged. Output dimensions are always >= 1x1 and <= the input's.
pub fn detect_and_crop(img: &DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    let mean = analyzer::measure(img).mean;
    let fraction = if mean < DARK_MEAN_CUTOFF {
        DARK_CROP
    } else {
        LIGHT_CROP
    };

    let crop_x = (width as f32 * fraction) as u32;
    let crop_y = (height as f32 * fraction) as u32;
    let crop_w = ((width as f32 * (1.0 - 2.0 * fraction)) as u32).max(1);
    let crop_h = ((height as f32 * (1.0 - 2.0 * fraction)) as u32).max(1);

    // Degenerate region: input too small for a meaningful crop.
    if crop_x + crop_w > width || crop_y + crop_h > height {
        tracing::debug!(width, height, "skipping degenerate boundary crop");
        return img.clone();
    }

    tracing::debug!(
        percent = fraction * 100.0,
        "boundary detection cropped uniformly from each edge"
    );
    img.crop_imm(crop_x, crop_y, crop_w, crop_h)
}
