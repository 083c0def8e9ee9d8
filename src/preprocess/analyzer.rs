//! Image characteristic analysis and enhancement profile selection.
//!
//! Classifies an input image into one of five preprocessing profiles from
//! its global brightness statistics. Classification is a pure function of
//! (mean, stddev); branch order is significant because the ranges overlap.

use image::DynamicImage;

/// Named enhancement profile families, ordered here from mildest to
/// most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementMode {
    /// Balanced default for ordinary inputs.
    Standard,
    /// Underexposed input; strongest lift and contrast.
    HighContrast,
    /// Bright scanned page.
    Document,
    /// Photographed document, uneven lighting.
    Photo,
    /// Screen capture; colors carry information and are preserved.
    Screenshot,
}

impl std::fmt::Display for EnhancementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnhancementMode::Standard => "standard",
            EnhancementMode::HighContrast => "high_contrast",
            EnhancementMode::Document => "document",
            EnhancementMode::Photo => "photo",
            EnhancementMode::Screenshot => "screenshot",
        };
        write!(f, "{}", name)
    }
}

/// Enhancement parameters selected for a single request.
///
/// Produced fresh per input image and never shared across requests. The
/// numeric values are tunable constants; the branch structure and the
/// relative aggressiveness ordering (high_contrast > document > photo >
/// standard) are contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub mode: EnhancementMode,
    /// Brightness multiplier applied per channel.
    pub brightness: f32,
    /// Linear contrast factor: `out = in * f - 128 * (f - 1)`.
    pub contrast: f32,
    /// Unsharp-mask sigma.
    pub sharpen_sigma: f32,
    /// Apply median denoising.
    pub denoise: bool,
    /// Gamma exponent; < 1 lifts shadows.
    pub gamma: f32,
    /// Skip grayscale conversion and range normalization.
    pub preserve_color: bool,
    /// Binarization cutoff for document-like inputs.
    pub threshold: Option<u8>,
}

impl Profile {
    /// Balanced default, also the fail-open profile when analysis
    /// cannot run.
    pub fn standard() -> Self {
        Self {
            mode: EnhancementMode::Standard,
            brightness: 1.05,
            contrast: 1.3,
            sharpen_sigma: 1.2,
            denoise: true,
            gamma: 1.0,
            preserve_color: false,
            threshold: None,
        }
    }

    fn screenshot() -> Self {
        Self {
            mode: EnhancementMode::Screenshot,
            brightness: 1.0,
            contrast: 1.2,
            sharpen_sigma: 0.8,
            denoise: false,
            gamma: 1.0,
            preserve_color: true,
            threshold: None,
        }
    }

    fn document() -> Self {
        Self {
            mode: EnhancementMode::Document,
            brightness: 0.9,
            contrast: 1.6,
            sharpen_sigma: 1.4,
            denoise: true,
            gamma: 1.1,
            preserve_color: false,
            threshold: Some(150),
        }
    }

    fn photo() -> Self {
        Self {
            mode: EnhancementMode::Photo,
            brightness: 1.1,
            contrast: 1.4,
            sharpen_sigma: 1.6,
            denoise: true,
            gamma: 1.0,
            preserve_color: false,
            threshold: None,
        }
    }

    fn high_contrast() -> Self {
        Self {
            mode: EnhancementMode::HighContrast,
            brightness: 1.4,
            contrast: 1.7,
            sharpen_sigma: 1.8,
            denoise: true,
            gamma: 0.9,
            preserve_color: false,
            threshold: Some(128),
        }
    }
}

/// Global brightness statistics across all color channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub mean: f32,
    pub stddev: f32,
}

/// Measure mean and standard deviation of channel brightness.
pub fn measure(img: &DynamicImage) -> ImageStats {
    let rgb = img.to_rgb8();
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for value in rgb.as_raw() {
        let v = *value as f64;
        sum += v;
        sum_sq += v * v;
        count += 1;
    }

    if count == 0 {
        return ImageStats {
            mean: 0.0,
            stddev: 0.0,
        };
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);

    ImageStats {
        mean: mean as f32,
        stddev: variance.sqrt() as f32,
    }
}

/// Select an enhancement profile from measured statistics.
///
/// First match wins; the ranges overlap, so reordering branches changes
/// behavior.
pub fn classify(stats: ImageStats) -> Profile {
    let ImageStats { mean, stddev } = stats;

    if stddev > 60.0 && mean > 150.0 {
        // High contrast with uniform bright regions: screen capture.
        Profile::screenshot()
    } else if mean > 200.0 && stddev < 50.0 {
        // Bright, flat page: scanner output.
        Profile::document()
    } else if (80.0..=200.0).contains(&mean) && stddev > 40.0 {
        // Mid-brightness with texture: photographed page.
        Profile::photo()
    } else if mean < 80.0 {
        // Underexposed.
        Profile::high_contrast()
    } else {
        Profile::standard()
    }
}

/// Analyze an image and pick its enhancement profile.
pub fn analyze(img: &DynamicImage) -> Profile {
    let stats = measure(img);
    let profile = classify(stats);
    tracing::debug!(
        mean = stats.mean,
        stddev = stats.stddev,
        mode = %profile.mode,
        "selected enhancement profile"
    );
    profile
}
