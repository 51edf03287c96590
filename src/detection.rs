//! Correlation-based signature detection.
//!
//! The suspect's luminance is correlated against the reference field of each
//! tile scale separately. The best of the three Pearson coefficients is the
//! detection score. Scales are never summed here, unlike extraction.

use image::RgbaImage;
use tracing::debug;

use crate::error::Result;
use crate::luma;
use crate::tiling::{self, TILE_SCALES};

/// Variances at or below this make a sequence degenerate (correlation 0).
const MIN_VARIANCE: f64 = 1e-12;

/// Result of signature detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Highest correlation over all tile scales.
    pub score: f64,
    /// Tile scale that produced [`score`](Self::score).
    pub best_scale: f64,
    /// Correlation per scale, in [`TILE_SCALES`] order.
    pub scale_scores: [f64; TILE_SCALES.len()],
}

impl DetectionResult {
    /// Pick the best of the per-scale scores.
    #[must_use]
    pub fn from_scale_scores(scale_scores: [f64; TILE_SCALES.len()]) -> Self {
        let (best_scale, score) = TILE_SCALES
            .iter()
            .zip(scale_scores)
            .fold((TILE_SCALES[0], f64::NEG_INFINITY), |best, (&scale, s)| {
                if s > best.1 {
                    (scale, s)
                } else {
                    best
                }
            });
        Self {
            score,
            best_scale,
            scale_scores,
        }
    }

    /// Whether the score is strictly above `threshold`.
    #[must_use]
    pub fn is_detected(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// Pearson correlation between two equal-length sequences.
///
/// Uses population mean and variance. Returns exactly 0 when either sequence
/// is empty or near-constant.
///
/// # Panics
///
/// Panics if `a` and `b` differ in length.
#[must_use]
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "correlated sequences must have equal length");
    if a.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = a.len() as f64;

    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0_f64;
    let mut sum_sq_a = 0.0_f64;
    let mut sum_sq_b = 0.0_f64;

    for (va, vb) in a.iter().zip(b) {
        let da = va - mean_a;
        let db = vb - mean_b;
        cov += da * db;
        sum_sq_a += da * da;
        sum_sq_b += db * db;
    }

    if sum_sq_a / n <= MIN_VARIANCE || sum_sq_b / n <= MIN_VARIANCE {
        return 0.0;
    }
    cov / (sum_sq_a * sum_sq_b).sqrt()
}

/// Score how strongly `suspect` carries the tiled `stroke` pattern.
///
/// Read-only and deterministic. A score near 0 means no alignment at any
/// scale; the original carrier of an embedded image scores lower than the
/// embedded copy.
///
/// # Errors
///
/// Returns an error if the stroke image cannot be rasterized.
pub fn detect_watermark(suspect: &RgbaImage, stroke: &RgbaImage) -> Result<DetectionResult> {
    let (width, height) = suspect.dimensions();
    let lum = luma::luminance_field(suspect);

    let mut scale_scores = [0.0; TILE_SCALES.len()];
    for (slot, &scale) in scale_scores.iter_mut().zip(&TILE_SCALES) {
        let field = tiling::reference_for_scale(stroke, scale, width, height)?;
        *slot = pearson_correlation(&lum, field.values());
        debug!(scale, score = *slot, "scored scale");
    }

    Ok(DetectionResult::from_scale_scores(scale_scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn correlation_is_one_for_perfect_match() {
        let a = vec![0.1, 0.5, 0.9, 0.3, 0.7];
        let score = pearson_correlation(&a, &a);
        assert!(
            (score - 1.0).abs() < 1e-12,
            "Perfect match should give 1.0, got {score}"
        );
    }

    #[test]
    fn correlation_is_negative_one_for_inverse() {
        let a = vec![0.1, 0.5, 0.9, 0.3, 0.7];
        let b: Vec<f64> = a.iter().map(|v| 1.0 - v).collect();
        let score = pearson_correlation(&a, &b);
        assert!(
            (score + 1.0).abs() < 1e-12,
            "Inverse should give -1.0, got {score}"
        );
    }

    #[test]
    fn correlation_ignores_offset_and_scale() {
        let a = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let b: Vec<f64> = a.iter().map(|v| v * 0.85 + 40.0).collect();
        assert!((pearson_correlation(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_is_symmetric_and_bounded() {
        let a = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let b = vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.5];
        let ab = pearson_correlation(&a, &b);
        let ba = pearson_correlation(&b, &a);
        assert!((ab - ba).abs() < 1e-15);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn constant_sequence_correlates_to_zero() {
        let a = vec![0.42; 100];
        let b: Vec<f64> = (0..100).map(f64::from).collect();
        assert!(pearson_correlation(&a, &b).abs() < f64::EPSILON);
        assert!(pearson_correlation(&b, &a).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sequences_correlate_to_zero() {
        assert!(pearson_correlation(&[], &[]).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn mismatched_lengths_fail_fast() {
        let _ = pearson_correlation(&[1.0, 2.0], &[1.0]);
    }

    #[test]
    fn best_scale_is_the_maximum() {
        let result = DetectionResult::from_scale_scores([0.01, 0.2, -0.3]);
        assert!((result.score - 0.2).abs() < f64::EPSILON);
        assert!((result.best_scale - 0.5).abs() < f64::EPSILON);
        assert!(result.is_detected(0.02));
        assert!(!result.is_detected(0.2));
    }

    #[test]
    fn negative_scores_are_kept() {
        let result = DetectionResult::from_scale_scores([-0.4, -0.1, -0.2]);
        assert!((result.score + 0.1).abs() < f64::EPSILON);
        assert!(!result.is_detected(0.0));
    }

    #[test]
    fn blank_image_scores_zero() {
        let suspect = RgbaImage::from_pixel(50, 40, Rgba([90, 90, 90, 255]));
        let stroke = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 3 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let result = detect_watermark(&suspect, &stroke).unwrap();
        assert!(result.score.abs() < f64::EPSILON);
        assert!(!result.is_detected(0.02));
    }

    #[test]
    fn pattern_painted_into_luminance_is_found() {
        let stroke = RgbaImage::from_fn(8, 8, |x, y| {
            if x.abs_diff(y) < 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let field = tiling::reference_for_scale(&stroke, 1.0, 60, 45).unwrap();
        let suspect = RgbaImage::from_fn(60, 45, |x, y| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let v = (60.0 + 20.0 * field.get(x, y)).min(255.0) as u8;
            Rgba([v, v, v, 255])
        });
        let result = detect_watermark(&suspect, &stroke).unwrap();
        assert!(result.score > 0.9, "score {}", result.score);
        assert!((result.best_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scale_scores_follow_tile_scale_order() {
        let stroke = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 3 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let suspect = RgbaImage::from_fn(48, 36, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 7 + y * 13) % 200) as u8;
            Rgba([v, v, v, 255])
        });
        let result = detect_watermark(&suspect, &stroke).unwrap();
        let lum = luma::luminance_field(&suspect);

        assert_eq!(result.scale_scores.len(), TILE_SCALES.len());
        for (&scale, &score) in TILE_SCALES.iter().zip(&result.scale_scores) {
            let field = tiling::reference_for_scale(&stroke, scale, 48, 36).unwrap();
            assert!((score - pearson_correlation(&lum, field.values())).abs() < 1e-12);
        }
        assert!(TILE_SCALES.contains(&result.best_scale));
    }
}
