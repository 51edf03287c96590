//! Additive luminance embedding.
//!
//! Each scale's reference field raises pixel luminance by
//! `base_delta * field`, split over R, G and B with the luma weights.
//! Scales run in order on one working buffer, so later scales build on the
//! pixels earlier scales already changed.

use std::ops::RangeInclusive;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::Result;
use crate::luma::LUMA_WEIGHTS;
use crate::tiling::{self, ReferenceField, TILE_SCALES};

/// Strengths that give a faint but detectable pattern.
pub const RECOMMENDED_STRENGTH: RangeInclusive<f32> = 0.04..=0.12;

/// Strength to luminance delta conversion factor.
const STRENGTH_TO_DELTA: f32 = 80.0;

/// Smallest per-unit luminance delta, so weak strengths still survive rounding.
const MIN_BASE_DELTA: f32 = 1.5;

/// Field values at or below this leave the pixel untouched.
const FIELD_EPSILON: f64 = 1e-6;

/// Luminance delta for a mask value of 1 at the given strength.
#[must_use]
pub fn base_delta(strength: f32) -> f32 {
    (strength * STRENGTH_TO_DELTA).max(MIN_BASE_DELTA)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn shift_channel(value: u8, delta: f64) -> u8 {
    (f64::from(value) + delta).round().clamp(0.0, 255.0) as u8
}

/// Brighten `image` in place along `field`.
///
/// Alpha is never touched. Channels saturate at 255.
///
/// # Panics
///
/// Panics if the field and the image differ in size.
pub fn apply_reference_field(image: &mut RgbaImage, field: &ReferenceField, base_delta: f32) {
    assert_eq!(
        (image.width(), image.height()),
        (field.width(), field.height()),
        "reference field must match the image size"
    );

    let base_delta = f64::from(base_delta);
    for (px, &m) in image.pixels_mut().zip(field.values()) {
        if m <= FIELD_EPSILON {
            continue;
        }
        let delta = base_delta * m;
        for (ch, weight) in LUMA_WEIGHTS.iter().enumerate() {
            px[ch] = shift_channel(px[ch], delta * weight);
        }
    }
}

/// Embed the tiled stroke pattern into a copy of `carrier`.
///
/// `strength` is not clamped; values outside [`RECOMMENDED_STRENGTH`] give a
/// weaker or a more visible pattern.
///
/// # Errors
///
/// Returns an error if the stroke image cannot be rasterized.
pub fn embed_watermark(
    carrier: &RgbaImage,
    stroke: &RgbaImage,
    strength: f32,
) -> Result<RgbaImage> {
    if !RECOMMENDED_STRENGTH.contains(&strength) {
        warn!(strength, "strength outside the recommended 0.04-0.12 range");
    }

    let (width, height) = carrier.dimensions();
    let delta = base_delta(strength);
    let mut working = carrier.clone();

    for &scale in &TILE_SCALES {
        let field = tiling::reference_for_scale(stroke, scale, width, height)?;
        apply_reference_field(&mut working, &field, delta);
        debug!(scale, base_delta = delta, "embedded scale");
    }

    Ok(working)
}
