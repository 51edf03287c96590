//! Error types for the stegosign crate.

use std::path::PathBuf;

/// Errors that can occur while embedding, detecting or extracting a signature.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input image could not be opened or decoded.
    #[error("failed to read image {}: {source}", path.display())]
    Read {
        /// Path of the image that failed to load.
        path: PathBuf,
        /// Underlying codec error.
        source: image::ImageError,
    },

    /// An output image could not be created or encoded.
    #[error("failed to write image {}: {source}", path.display())]
    Write {
        /// Path of the image that failed to save.
        path: PathBuf,
        /// Underlying codec error.
        source: image::ImageError,
    },

    /// A mask was requested below the minimum rasterization size.
    #[error("mask size {width}x{height} is below the 4x4 minimum")]
    MaskTooSmall {
        /// Requested mask width.
        width: u32,
        /// Requested mask height.
        height: u32,
    },

    /// The stroke image has no pixels to rasterize.
    #[error("stroke image is empty ({width}x{height})")]
    EmptyImage {
        /// Stroke image width in pixels.
        width: u32,
        /// Stroke image height in pixels.
        height: u32,
    },
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
