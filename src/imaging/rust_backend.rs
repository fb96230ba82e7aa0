//! Pure Rust image processing backend with no external tools.
//!
//! Used whenever ImageMagick is not installed. Everything is statically
//! linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Sharpening | `DynamicImage::unsharpen` |
//! | Canvas | transparent `RgbaImage` + `imageops::overlay` |
//! | Encode | JPEG with quality, others via `DynamicImage::write_to` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{Quality, RenderParams, Step};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::load(path, e))
}

fn apply_step(img: DynamicImage, step: &Step) -> DynamicImage {
    match *step {
        Step::Crop {
            x,
            y,
            width,
            height,
        } => img.crop_imm(x, y, width, height),
        Step::Resize { width, height } => img.resize_exact(width, height, FilterType::Lanczos3),
        Step::Sharpen(s) => img.unsharpen(s.sigma, s.threshold),
        Step::Canvas {
            width,
            height,
            left,
            top,
        } => {
            let mut canvas = RgbaImage::new(width, height);
            image::imageops::overlay(&mut canvas, &img.to_rgba8(), left, top);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

/// Save a DynamicImage to the given path, inferring format from extension.
///
/// JPEG has no alpha channel, so it is flattened to RGB. Other formats keep
/// alpha when the image has it.
fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path).map_err(|e| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", e))
    })?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.value() as u8);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        other => {
            let normalized = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            normalized.write_to(&mut writer, other)
        }
    };

    result.map_err(|e| match e {
        ImageError::IoError(io) => BackendError::Io(io),
        other => BackendError::ProcessingFailed(format!(
            "Failed to encode {}: {}",
            path.display(),
            other
        )),
    })
}

impl ImageBackend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| match e {
                ImageError::IoError(io) => BackendError::Io(io),
                other => BackendError::load(path, other),
            })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let processed = params.steps.iter().fold(img, apply_step);
        save_image(&processed, &params.output, params.quality)
    }
}
