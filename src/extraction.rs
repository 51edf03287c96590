//! Visual extraction of the embedded pattern.
//!
//! All three tile scales are summed into one reference field. The field and
//! the suspect's luminance are min-max normalized on their own, then
//! multiplied pixel by pixel into an opaque grayscale image.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::Result;
use crate::luma;
use crate::mask;
use crate::tiling::{ReferenceField, TileGrid, TILE_SCALES};

/// Ranges below this leave the array unnormalized.
const MIN_RANGE: f64 = 1e-12;

/// Rescale `values` in place to `[0, 1]` using their own min and max.
///
/// Near-constant arrays are left unchanged.
pub fn normalize_min_max(values: &mut [f64]) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if range < MIN_RANGE {
        return;
    }
    for v in values.iter_mut() {
        *v = (*v - min) / range;
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn gray_level(value: f64) -> u8 {
    (255.0 * value).round().clamp(0.0, 255.0) as u8
}

/// Render where `suspect`'s luminance lines up with the tiled `stroke`.
///
/// The output has the suspect's size and is fully opaque, with equal R, G
/// and B.
///
/// # Errors
///
/// Returns an error if the stroke image cannot be rasterized.
pub fn extract_watermark(suspect: &RgbaImage, stroke: &RgbaImage) -> Result<RgbaImage> {
    let (width, height) = suspect.dimensions();

    let mut field = ReferenceField::new(width, height);
    for &scale in &TILE_SCALES {
        let mask = mask::rasterize_mask(
            stroke,
            mask::scaled_dimension(width, scale),
            mask::scaled_dimension(height, scale),
        )?;
        field.accumulate(&mask, &TileGrid::new(scale, mask.width(), mask.height()));
        debug!(scale, "accumulated scale into extraction field");
    }

    let mut reference = field.into_values();
    let mut lum = luma::luminance_field(suspect);
    normalize_min_max(&mut reference);
    normalize_min_max(&mut lum);

    let mut out = RgbaImage::new(width, height);
    for ((px, r), l) in out.pixels_mut().zip(&reference).zip(&lum) {
        let g = gray_level(r * l);
        *px = Rgba([g, g, g, 255]);
    }
    Ok(out)
}
