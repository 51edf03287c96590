//! Stroke image rasterization.
//!
//! A stroke image (handwriting, a drawn signature) is resampled to a target
//! size and turned into a soft intensity mask:
//! `mask = alpha * (1 - brightness)`
//!
//! Dark opaque strokes map to values near 1, white or transparent background
//! to values near 0.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{Error, Result};

/// Smallest mask edge the rasterizer accepts.
pub const MIN_MASK_SIZE: u32 = 4;

/// Mask values at or below this are treated as "no contribution".
pub(crate) const CONTRIBUTION_EPSILON: f32 = 1e-6;

/// A row-major intensity mask with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    /// Mask width in cells.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in cells.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All mask values, row by row.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// One row of the mask.
    ///
    /// # Panics
    ///
    /// Panics if `y` is outside the mask.
    #[must_use]
    pub fn row(&self, y: u32) -> &[f32] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Value at cell `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the mask.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        assert!(x < self.width && y < self.height, "mask cell out of bounds");
        self.data[(y * self.width + x) as usize]
    }
}

/// Mask coefficient for one RGBA pixel.
fn stroke_intensity(pixel: [u8; 4]) -> f32 {
    let [r, g, b, a] = pixel.map(f32::from);
    let brightness = (r + g + b) / (3.0 * 255.0);
    let alpha = a / 255.0;
    (alpha * (1.0 - brightness)).max(0.0)
}

/// Rasterize a stroke image into a `width` x `height` mask.
///
/// The stroke is resized with bilinear filtering, so the mask has no
/// nearest-neighbour stair steps. Images without an alpha channel should be
/// converted with `to_rgba8()`, which makes every pixel fully opaque.
///
/// # Errors
///
/// Returns [`Error::MaskTooSmall`] if either target dimension is below
/// [`MIN_MASK_SIZE`], or [`Error::EmptyImage`] if the stroke has no pixels.
pub fn rasterize_mask(stroke: &RgbaImage, width: u32, height: u32) -> Result<Mask> {
    if width < MIN_MASK_SIZE || height < MIN_MASK_SIZE {
        return Err(Error::MaskTooSmall { width, height });
    }
    if stroke.width() == 0 || stroke.height() == 0 {
        return Err(Error::EmptyImage {
            width: stroke.width(),
            height: stroke.height(),
        });
    }

    let resized = imageops::resize(stroke, width, height, FilterType::Triangle);
    let data = resized.pixels().map(|px| stroke_intensity(px.0)).collect();

    Ok(Mask {
        width,
        height,
        data,
    })
}

/// Mask edge length for an image dimension at `scale`, never below
/// [`MIN_MASK_SIZE`].
#[must_use]
pub fn scaled_dimension(dimension: u32, scale: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (f64::from(dimension) * scale).round() as u32;
    scaled.max(MIN_MASK_SIZE)
}
