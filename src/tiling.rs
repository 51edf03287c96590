//! Multi-scale overlap tiling of a stroke mask.
//!
//! The mask is laid across the whole image plane with 25% overlap between
//! neighbouring tiles, once per scale in [`TILE_SCALES`]. Each scale has its
//! own phase offset so the three tile grids never line up. Any surviving
//! region of a cropped or resized image still holds a full or partial tile
//! at some scale.

use image::RgbaImage;
use tracing::debug;

use crate::error::Result;
use crate::mask::{self, Mask, CONTRIBUTION_EPSILON};

/// Relative tile sizes, in the order they are applied.
pub const TILE_SCALES: [f64; 3] = [1.0, 0.5, 0.25];

/// Tiles advance by this fraction of their own size (25% overlap).
pub const OVERLAP_RATIO: f64 = 0.75;

/// Horizontal phase offset multiplier, truncated to an integer before use.
pub const PHASE_MULTIPLIER_X: f64 = 7.0;

/// Vertical phase offset multiplier, truncated to an integer before use.
pub const PHASE_MULTIPLIER_Y: f64 = 11.0;

/// Placement geometry for one scale's tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Tile width (the mask width).
    pub tile_width: u32,
    /// Tile height (the mask height).
    pub tile_height: u32,
    /// Horizontal distance between tile origins.
    pub step_x: u32,
    /// Vertical distance between tile origins.
    pub step_y: u32,
    /// Horizontal phase shift applied to every origin.
    pub offset_x: u32,
    /// Vertical phase shift applied to every origin.
    pub offset_y: u32,
}

impl TileGrid {
    /// Geometry for a `tile_width` x `tile_height` mask tiled at `scale`.
    #[must_use]
    pub fn new(scale: f64, tile_width: u32, tile_height: u32) -> Self {
        let step_x = tile_step(tile_width);
        let step_y = tile_step(tile_height);
        Self {
            tile_width,
            tile_height,
            step_x,
            step_y,
            offset_x: phase_offset(scale, PHASE_MULTIPLIER_X, step_x),
            offset_y: phase_offset(scale, PHASE_MULTIPLIER_Y, step_y),
        }
    }

    /// Top-left corners of every tile touching a `width` x `height` image,
    /// row by row.
    ///
    /// Origins start one tile before the image and stop one tile past it, so
    /// partial tiles cover the borders.
    pub fn origins(&self, width: u32, height: u32) -> impl Iterator<Item = (i64, i64)> {
        let tw = i64::from(self.tile_width);
        let th = i64::from(self.tile_height);
        let (w, h) = (i64::from(width), i64::from(height));
        let (ox, oy) = (i64::from(self.offset_x), i64::from(self.offset_y));
        let step_x = self.step_x as usize;
        let step_y = self.step_y as usize;

        (-th..h + th).step_by(step_y).flat_map(move |ty| {
            (-tw..w + tw)
                .step_by(step_x)
                .map(move |tx| (tx + ox, ty + oy))
        })
    }
}

fn tile_step(size: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let step = (f64::from(size) * OVERLAP_RATIO).round() as u32;
    step.max(1)
}

// `scale * multiplier` is truncated before the modulo: 0.25 * 7 gives 1, not 1.75.
fn phase_offset(scale: f64, multiplier: f64, step: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let phase = (scale * multiplier) as u32;
    phase % step.max(1)
}

/// A full-image accumulation of tiled mask contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceField {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl ReferenceField {
    /// An all-zero field of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Field width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All field values, row by row.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Consume the field, keeping its row-major values.
    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    /// Value at pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the pixel is outside the field.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        assert!(x < self.width && y < self.height, "field pixel out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Add one copy of `mask` at every origin of `grid`.
    ///
    /// Overlapping tiles sum. Cells at or below the contribution epsilon are
    /// skipped.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn accumulate(&mut self, mask: &Mask, grid: &TileGrid) {
        debug_assert_eq!(mask.width(), grid.tile_width);
        debug_assert_eq!(mask.height(), grid.tile_height);

        let width = self.width as usize;
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        let (mw, mh) = (i64::from(mask.width()), i64::from(mask.height()));

        for (base_x, base_y) in grid.origins(self.width, self.height) {
            // Clip the tile to the image.
            let x0 = (-base_x).max(0);
            let x1 = (w - base_x).min(mw);
            let y0 = (-base_y).max(0);
            let y1 = (h - base_y).min(mh);
            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            for my in y0..y1 {
                let py = (base_y + my) as usize;
                let mask_row = mask.row(my as u32);
                let field_row = &mut self.data[py * width..(py + 1) * width];
                for mx in x0..x1 {
                    let m = mask_row[mx as usize];
                    if m <= CONTRIBUTION_EPSILON {
                        continue;
                    }
                    field_row[(base_x + mx) as usize] += f64::from(m);
                }
            }
        }
    }
}

/// Tile `mask` across a `width` x `height` plane at `scale`.
#[must_use]
pub fn compose_reference(mask: &Mask, scale: f64, width: u32, height: u32) -> ReferenceField {
    let grid = TileGrid::new(scale, mask.width(), mask.height());
    let mut field = ReferenceField::new(width, height);
    field.accumulate(mask, &grid);
    debug!(
        scale,
        tile_width = grid.tile_width,
        tile_height = grid.tile_height,
        step_x = grid.step_x,
        step_y = grid.step_y,
        offset_x = grid.offset_x,
        offset_y = grid.offset_y,
        "composed reference field"
    );
    field
}

/// Rasterize `stroke` for `scale` and tile it over a `width` x `height` image.
///
/// # Errors
///
/// Returns an error if the stroke image cannot be rasterized.
pub fn reference_for_scale(
    stroke: &RgbaImage,
    scale: f64,
    width: u32,
    height: u32,
) -> Result<ReferenceField> {
    let mask = mask::rasterize_mask(
        stroke,
        mask::scaled_dimension(width, scale),
        mask::scaled_dimension(height, scale),
    )?;
    Ok(compose_reference(&mask, scale, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_mask(width: u32, height: u32) -> Mask {
        let stroke = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        mask::rasterize_mask(&stroke, width, height).unwrap()
    }

    #[test]
    fn grid_steps_by_three_quarters_of_tile() {
        let grid = TileGrid::new(1.0, 128, 96);
        assert_eq!((grid.step_x, grid.step_y), (96, 72));
        assert_eq!((grid.offset_x, grid.offset_y), (7, 11));
    }

    #[test]
    fn grid_step_rounds_to_nearest() {
        // 10 * 0.75 = 7.5 rounds up.
        let grid = TileGrid::new(1.0, 10, 6);
        assert_eq!(grid.step_x, 8);
        assert_eq!(grid.step_y, 5);
    }

    #[test]
    fn phase_offset_truncates_before_modulo() {
        let quarter = TileGrid::new(0.25, 32, 24);
        // (int)(1.75) = 1, (int)(2.75) = 2
        assert_eq!((quarter.offset_x, quarter.offset_y), (1, 2));

        let half = TileGrid::new(0.5, 64, 48);
        assert_eq!((half.offset_x, half.offset_y), (3, 5));
    }

    #[test]
    fn phase_offset_wraps_on_small_steps() {
        let grid = TileGrid::new(1.0, 4, 4);
        assert_eq!(grid.step_x, 3);
        assert_eq!((grid.offset_x, grid.offset_y), (1, 2));
    }

    #[test]
    fn origins_cover_a_tile_past_each_border() {
        let grid = TileGrid::new(1.0, 8, 8);
        let origins: Vec<_> = grid.origins(16, 8).collect();
        // x: -8, -2, 4, 10, 16, 22 (+1); y: -8, -2, 4, 10 (+5)
        assert_eq!(origins.len(), 6 * 4);
        assert_eq!(origins[0], (-7, -3));
        assert_eq!(origins[5], (23, -3));
        assert_eq!(origins[23], (23, 15));
    }

    #[test]
    fn solid_tiles_cover_every_pixel_and_reinforce_in_overlaps() {
        let mask = solid_mask(8, 8);
        let field = compose_reference(&mask, 1.0, 20, 20);
        assert_eq!(field.values().len(), 400);
        for &v in field.values() {
            assert!(v >= 1.0 - 1e-6, "pixel left uncovered: {v}");
        }
        assert!(field.values().iter().any(|&v| v > 1.5));
        assert!(field.values().iter().all(|&v| v < 4.0 + 1e-6));
    }

    #[test]
    fn blank_mask_contributes_nothing() {
        let stroke = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let field = reference_for_scale(&stroke, 0.5, 30, 20).unwrap();
        assert!(field.values().iter().all(|&v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn single_cell_lands_at_each_tile_origin() {
        // Only the top-left mask cell is dark.
        let stroke = RgbaImage::from_fn(4, 4, |x, y| {
            if x == 0 && y == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let mask = mask::rasterize_mask(&stroke, 4, 4).unwrap();
        let grid = TileGrid::new(1.0, 4, 4);
        let mut field = ReferenceField::new(12, 12);
        field.accumulate(&mask, &grid);

        let corner = mask.get(0, 0);
        for (x, y) in grid.origins(12, 12) {
            if (0..12).contains(&x) && (0..12).contains(&y) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let v = field.get(x as u32, y as u32);
                assert!(v >= f64::from(corner) - 1e-6);
            }
        }
    }

    #[test]
    fn field_size_matches_image_not_mask() {
        let mask = solid_mask(4, 4);
        let field = compose_reference(&mask, 0.25, 33, 17);
        assert_eq!(field.width(), 33);
        assert_eq!(field.height(), 17);
        assert_eq!(field.into_values().len(), 33 * 17);
    }
}
