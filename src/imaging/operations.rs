//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Planning is
//! split from rendering: `plan_*` functions turn source dimensions and a
//! request into a list of [`Step`]s, and [`create_derivative`] identifies the
//! source, plans, and hands the result to the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{
    calculate_fill_dimensions, calculate_size, canvas_offset, clamp_cutout, resolve_crop_anchor,
};
use super::params::{CropAnchor, CropBounds, CropSpec, Quality, RenderParams, Sharpening, Step};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Which derivative to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Shrink-only resize, optional explicit pre-crop.
    Thumb,
    /// Fill the box, then crop at the anchor to the exact size.
    Fit,
    /// Shrink and crop only when too large, then center on a transparent canvas.
    FitThumb,
}

impl Strategy {
    /// Directory (next to the source) that holds this kind of derivative.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Thumb => "thumbs",
            Self::Fit => "fits",
            Self::FitThumb => "fitThumbs",
        }
    }
}

/// A derivative request: strategy, box, and crop.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeSpec {
    pub strategy: Strategy,
    pub width: u32,
    pub height: Option<u32>,
    pub crop: Option<CropSpec>,
}

/// Encoding settings shared by all derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingOptions {
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            sharpening: Some(Sharpening::light()),
        }
    }
}

impl ProcessingOptions {
    /// Sharpening for a given output file. PNG output is never sharpened.
    pub fn sharpening_for(&self, output: &Path) -> Option<Sharpening> {
        if is_png(output) {
            None
        } else {
            self.sharpening
        }
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn invalid(message: impl Into<String>) -> BackendError {
    BackendError::ProcessingFailed(message.into())
}

fn cutout(dims: (u32, u32), bounds: CropBounds) -> Result<CropBounds> {
    clamp_cutout(dims, bounds).ok_or_else(|| {
        invalid(format!(
            "crop {}x{}+{}+{} lies outside {}x{} image",
            bounds.width, bounds.height, bounds.x, bounds.y, dims.0, dims.1
        ))
    })
}

fn crop_step(b: CropBounds) -> Step {
    Step::Crop {
        x: b.x,
        y: b.y,
        width: b.width,
        height: b.height,
    }
}

/// Push a resize (and the sharpening that follows it) when dimensions change.
fn push_resize(
    steps: &mut Vec<Step>,
    from: (u32, u32),
    to: (u32, u32),
    sharpen: Option<Sharpening>,
) {
    if from != to {
        steps.push(Step::Resize {
            width: to.0,
            height: to.1,
        });
        if let Some(s) = sharpen {
            steps.push(Step::Sharpen(s));
        }
    }
}

/// Plan a shrink-only thumbnail.
///
/// Explicit bounds are cut first; the result is then shrunk to fit inside
/// `width` x `height`. Images already inside the box are not resized.
pub fn plan_thumb(
    source: (u32, u32),
    width: u32,
    height: Option<u32>,
    crop: Option<&CropSpec>,
    sharpen: Option<Sharpening>,
) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut dims = source;

    if let Some(bounds) = crop.and_then(CropSpec::bounds) {
        let cut = cutout(dims, bounds)?;
        steps.push(crop_step(cut));
        dims = (cut.width, cut.height);
    }

    let target = calculate_size(dims, Some(width), height, true);
    push_resize(&mut steps, dims, target, sharpen);
    Ok(steps)
}

/// Plan an aspect-fit crop to exactly `width` x `height`.
///
/// - Explicit bounds: cut, then resize to fit the box (may upscale).
/// - No height: resize to `width`, keeping the aspect ratio.
/// - Otherwise: fill the box, then crop at the anchor.
pub fn plan_fit(
    source: (u32, u32),
    width: u32,
    height: Option<u32>,
    crop: Option<&CropSpec>,
    sharpen: Option<Sharpening>,
) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    if let Some(bounds) = crop.and_then(CropSpec::bounds) {
        let cut = cutout(source, bounds)?;
        steps.push(crop_step(cut));
        let dims = (cut.width, cut.height);
        let target = calculate_size(dims, Some(width), height, false);
        push_resize(&mut steps, dims, target, sharpen);
        return Ok(steps);
    }

    let Some(height) = height else {
        let target = calculate_size(source, Some(width), None, false);
        push_resize(&mut steps, source, target, sharpen);
        return Ok(steps);
    };

    let target = (width, height);
    if source == target {
        return Ok(steps);
    }

    let filled = calculate_fill_dimensions(source, target);
    push_resize(&mut steps, source, filled, sharpen);

    if filled != target {
        let (x, y) = resolve_crop_anchor(filled, target, CropSpec::anchor(crop));
        steps.push(Step::Crop {
            x,
            y,
            width,
            height,
        });
    }
    Ok(steps)
}

/// Plan a fit-on-canvas thumbnail of exactly `width` x `height`.
///
/// Sources larger than the box on either axis are resized (by height when
/// too tall, else by width) and cropped at the anchor, clamped to the resized
/// image. Smaller sources are only centered on the transparent canvas.
pub fn plan_fit_thumb(
    source: (u32, u32),
    width: u32,
    height: u32,
    anchor: CropAnchor,
    sharpen: Option<Sharpening>,
) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut dims = source;

    if source.0 > width || source.1 > height {
        let resized = if source.1 > height {
            calculate_size(source, None, Some(height), false)
        } else {
            calculate_size(source, Some(width), None, false)
        };
        push_resize(&mut steps, source, resized, sharpen);

        let (x, y) = resolve_crop_anchor(resized, (width, height), anchor);
        let cut = CropBounds {
            x,
            y,
            width: width.min(resized.0 - x),
            height: height.min(resized.1 - y),
        };
        if (cut.width, cut.height) != resized {
            steps.push(crop_step(cut));
        }
        dims = (cut.width, cut.height);
    }

    let (left, top) = canvas_offset((width, height), dims);
    steps.push(Step::Canvas {
        width,
        height,
        left,
        top,
    });
    Ok(steps)
}

/// Plan a derivative for the given request and source dimensions.
pub fn plan_derivative(
    spec: &DerivativeSpec,
    source: (u32, u32),
    sharpen: Option<Sharpening>,
) -> Result<Vec<Step>> {
    if spec.width == 0 || spec.height == Some(0) {
        return Err(invalid(format!(
            "target box {}x{} must be non-zero",
            spec.width,
            spec.height.map(|h| h.to_string()).unwrap_or_default()
        )));
    }
    if source.0 == 0 || source.1 == 0 {
        return Err(invalid("source image has no pixels"));
    }

    match spec.strategy {
        Strategy::Thumb => plan_thumb(source, spec.width, spec.height, spec.crop.as_ref(), sharpen),
        Strategy::Fit => plan_fit(source, spec.width, spec.height, spec.crop.as_ref(), sharpen),
        Strategy::FitThumb => {
            let height = spec
                .height
                .ok_or_else(|| invalid("fit-on-canvas thumbnails need a height"))?;
            let anchor = CropSpec::anchor(spec.crop.as_ref());
            plan_fit_thumb(source, spec.width, height, anchor, sharpen)
        }
    }
}

/// Identify the source, plan the derivative, and render it to `output`.
///
/// Returns the executed steps.
pub fn create_derivative(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    spec: &DerivativeSpec,
    options: &ProcessingOptions,
) -> Result<Vec<Step>> {
    let dims = get_dimensions(backend, source)?;
    let steps = plan_derivative(spec, dims, options.sharpening_for(output))?;
    tracing::debug!(
        source = %source.display(),
        strategy = ?spec.strategy,
        steps = steps.len(),
        "Rendering derivative"
    );
    backend.render(&RenderParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        steps: steps.clone(),
        quality: options.quality,
    })?;
    Ok(steps)
}

/// Crop `from` to explicit bounds, fit into `width` x `height`, and save to `to`.
///
/// Returns `Ok(false)` without touching the backend when `from` is missing.
pub fn crop_image(
    backend: &impl ImageBackend,
    from: &Path,
    to: &Path,
    width: u32,
    height: Option<u32>,
    bounds: Option<CropBounds>,
    options: &ProcessingOptions,
) -> Result<bool> {
    if !from.is_file() {
        return Ok(false);
    }
    let sharpen = options.sharpening_for(to);
    let mut steps = Vec::new();

    if let Some(bounds) = bounds {
        let dims = get_dimensions(backend, from)?;
        let cut = cutout(dims, bounds)?;
        steps.push(crop_step(cut));
        let cut_dims = (cut.width, cut.height);
        let target = calculate_size(cut_dims, Some(width), height, false);
        push_resize(&mut steps, cut_dims, target, sharpen);
    }

    backend.render(&RenderParams {
        source: from.to_path_buf(),
        output: to.to_path_buf(),
        steps,
        quality: options.quality,
    })?;
    Ok(true)
}
