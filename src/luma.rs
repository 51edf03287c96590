//! Luminance of RGB pixels.

use image::RgbaImage;

/// Broadcast luma weights for R, G and B.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Luminance of one pixel on the 0-255 scale. Alpha is ignored.
#[must_use]
pub fn luminance(pixel: [u8; 4]) -> f64 {
    LUMA_WEIGHTS[0] * f64::from(pixel[0])
        + LUMA_WEIGHTS[1] * f64::from(pixel[1])
        + LUMA_WEIGHTS[2] * f64::from(pixel[2])
}

/// Row-major luminance of every pixel in `image`.
#[must_use]
pub fn luminance_field(image: &RgbaImage) -> Vec<f64> {
    image.pixels().map(|px| luminance(px.0)).collect()
}
