//! File-level signature engine and codec boundary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::info;

use crate::detection::{self, DetectionResult};
use crate::embedding;
use crate::error::{Error, Result};
use crate::extraction;

/// Options controlling file processing.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Embedding strength (recommended 0.04-0.12).
    pub strength: f32,
    /// Detection score above which a signature counts as present.
    pub threshold: f64,
    /// JPEG quality (1-100) for lossy outputs.
    pub jpeg_quality: u8,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            strength: 0.08,
            threshold: 0.02,
            jpeg_quality: 95,
        }
    }
}

/// Result of processing a single image file in a batch.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the score exceeded the threshold.
    pub detected: bool,
    /// Detection score (0 when processing failed).
    pub score: f64,
    /// Human-readable status message.
    pub message: String,
}

/// The signature engine holding a decoded stroke image.
///
/// Create once per signature and reuse it for many carriers or suspects.
/// Masks are rasterized per call because their size follows each image.
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    stroke: RgbaImage,
}

impl SignatureEngine {
    /// Create an engine from an in-memory stroke image.
    #[must_use]
    pub fn new(stroke: RgbaImage) -> Self {
        Self { stroke }
    }

    /// Create an engine from a stroke image on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the image cannot be opened or decoded.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(load_image(path)?))
    }

    /// The stroke image this engine embeds and looks for.
    #[must_use]
    pub fn stroke(&self) -> &RgbaImage {
        &self.stroke
    }

    /// Embed the signature into a copy of `carrier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stroke cannot be rasterized.
    pub fn embed(&self, carrier: &RgbaImage, strength: f32) -> Result<RgbaImage> {
        embedding::embed_watermark(carrier, &self.stroke, strength)
    }

    /// Score how strongly `suspect` carries the signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the stroke cannot be rasterized.
    pub fn detect(&self, suspect: &RgbaImage) -> Result<DetectionResult> {
        detection::detect_watermark(suspect, &self.stroke)
    }

    /// Render the signature pattern found in `suspect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stroke cannot be rasterized.
    pub fn extract(&self, suspect: &RgbaImage) -> Result<RgbaImage> {
        extraction::extract_watermark(suspect, &self.stroke)
    }

    /// Load `input`, embed the signature, and save to `output`.
    ///
    /// The output format follows the extension of `output`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] or [`Error::Write`] on codec failures.
    pub fn embed_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> Result<()> {
        let carrier = load_image(input)?;
        let signed = self.embed(&carrier, opts.strength)?;
        save_image(&signed, output, opts.jpeg_quality)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            strength = opts.strength,
            "embedded signature"
        );
        Ok(())
    }

    /// Load `input` and score it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the image cannot be decoded.
    pub fn detect_file(&self, input: &Path) -> Result<DetectionResult> {
        let suspect = load_image(input)?;
        let result = self.detect(&suspect)?;
        info!(
            input = %input.display(),
            score = result.score,
            best_scale = result.best_scale,
            "detected signature"
        );
        Ok(result)
    }

    /// Load `input`, extract the pattern, and save it as PNG to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] or [`Error::Write`] on codec failures.
    pub fn extract_file(&self, input: &Path, output: &Path) -> Result<()> {
        let suspect = load_image(input)?;
        let visual = self.extract(&suspect)?;
        save_png(&visual, output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            "extracted signature"
        );
        Ok(())
    }

    /// Score one file for a batch report. Never fails; errors become messages.
    #[must_use]
    pub fn process_file(&self, input: &Path, opts: &ProcessOptions) -> ProcessResult {
        match self.detect_file(input) {
            Ok(result) => {
                let detected = result.is_detected(opts.threshold);
                ProcessResult {
                    path: input.to_path_buf(),
                    success: true,
                    detected,
                    score: result.score,
                    message: format!(
                        "score={:.5} (scale {}: {:.5} / {:.5} / {:.5})",
                        result.score,
                        result.best_scale,
                        result.scale_scores[0],
                        result.scale_scores[1],
                        result.scale_scores[2],
                    ),
                }
            }
            Err(e) => ProcessResult {
                path: input.to_path_buf(),
                success: false,
                detected: false,
                score: 0.0,
                message: e.to_string(),
            },
        }
    }

    /// Score all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Results are sorted by path.
    #[must_use]
    pub fn detect_directory(&self, input_dir: &Path, opts: &ProcessOptions) -> Vec<ProcessResult> {
        let mut paths: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    detected: false,
                    score: 0.0,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };
        paths.sort();

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            paths
                .par_iter()
                .map(|path| self.process_file(path, opts))
                .collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            paths
                .iter()
                .map(|path| self.process_file(path, opts))
                .collect()
        }
    }
}

/// Decode an image file into an RGBA buffer.
///
/// Images without alpha come back fully opaque.
///
/// # Errors
///
/// Returns [`Error::Read`] if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let write_err = |e: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(e),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    File::create(path).map(BufWriter::new).map_err(write_err)
}

/// Save an RGBA image, choosing the encoder from the extension.
///
/// JPEG is written at `jpeg_quality` with alpha dropped. PNG, BMP and WebP
/// are written losslessly. Unknown extensions fall back to PNG.
///
/// # Errors
///
/// Returns [`Error::Write`] if the file cannot be created or encoded.
pub fn save_image(img: &RgbaImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let format = match ImageFormat::from_path(path) {
        Ok(f @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp | ImageFormat::WebP)) => f,
        _ => ImageFormat::Png,
    };

    let mut writer = create_output(path)?;
    let encoded = if format == ImageFormat::Jpeg {
        let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
        JpegEncoder::new_with_quality(&mut writer, jpeg_quality.clamp(1, 100)).encode_image(&rgb)
    } else {
        img.write_to(&mut writer, format)
    };

    encoded
        .and_then(|()| writer.flush().map_err(image::ImageError::IoError))
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Save an RGBA image as PNG regardless of the extension.
///
/// # Errors
///
/// Returns [`Error::Write`] if the file cannot be created or encoded.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    let mut writer = create_output(path)?;
    img.write_to(&mut writer, ImageFormat::Png)
        .and_then(|()| writer.flush().map_err(image::ImageError::IoError))
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}
