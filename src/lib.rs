//! Hide a handwritten signature in the luminance of a photo, then find it again.
//!
//! A stroke image (dark ink on white or transparent) becomes a soft mask that
//! is tiled over the whole photo at three scales with 25% overlap. Embedding
//! adds a faint luminance lift along that pattern. Detection correlates a
//! suspect's luminance with the pattern, and extraction renders where the two
//! line up. The redundant tiling keeps the mark detectable after resizing,
//! cropping and mild color changes.
//!
//! This is a robustness scheme, not a cryptographic watermark.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use stegosign::{ProcessOptions, SignatureEngine};
//!
//! let engine = SignatureEngine::open(Path::new("signature.png")).expect("bad stroke image");
//! let opts = ProcessOptions::default();
//! engine
//!     .embed_file(Path::new("photo.jpg"), Path::new("photo_signed.jpg"), &opts)
//!     .unwrap();
//!
//! let result = engine.detect_file(Path::new("photo_signed.jpg")).unwrap();
//! println!("Detection score: {:.5}", result.score);
//! ```
//!
//! # In-memory use
//!
//! ```
//! use image::{Rgba, RgbaImage};
//!
//! let stroke = RgbaImage::from_fn(16, 16, |x, y| {
//!     if x.abs_diff(y) < 3 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
//! });
//! let carrier = RgbaImage::from_pixel(64, 48, Rgba([120, 120, 120, 255]));
//!
//! let signed = stegosign::embed_watermark(&carrier, &stroke, 0.08).unwrap();
//! let before = stegosign::detect_watermark(&carrier, &stroke).unwrap();
//! let after = stegosign::detect_watermark(&signed, &stroke).unwrap();
//! assert!(after.score > before.score);
//! ```

#![deny(missing_docs)]

pub mod detection;
pub mod embedding;
mod engine;
pub mod error;
pub mod extraction;
pub mod luma;
pub mod mask;
pub mod tiling;

pub use detection::{detect_watermark, pearson_correlation, DetectionResult};
pub use embedding::{embed_watermark, RECOMMENDED_STRENGTH};
pub use engine::{
    is_supported_image, load_image, save_image, save_png, ProcessOptions, ProcessResult,
    SignatureEngine,
};
pub use error::{Error, Result};
pub use extraction::extract_watermark;
pub use tiling::TILE_SCALES;
