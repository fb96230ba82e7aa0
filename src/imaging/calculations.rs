//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! The planners in [`operations`](super::operations) call them with the
//! dimensions reported by the backend, so a plan is reproducible bit-for-bit
//! from the same inputs.

use super::params::{CropAnchor, CropBounds};

/// Scale `source` to fit inside a box, preserving aspect ratio.
///
/// Missing box edges are unconstrained. With `shrink_only` the scale never
/// exceeds 1, so small images keep their size. Results are rounded and never
/// smaller than 1px. With no box edge at all the source is returned as-is.
///
/// # Examples
/// ```
/// # use thumbsmith::imaging::calculate_size;
/// // 800x600 into 400x400 → width-limited
/// assert_eq!(calculate_size((800, 600), Some(400), Some(400), false), (400, 300));
///
/// // width-only request
/// assert_eq!(calculate_size((800, 600), Some(200), None, false), (200, 150));
///
/// // shrink-only never upscales
/// assert_eq!(calculate_size((100, 50), Some(400), Some(400), true), (100, 50));
/// ```
pub fn calculate_size(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    shrink_only: bool,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let mut scales = Vec::with_capacity(3);
    if let Some(w) = width.filter(|w| *w > 0) {
        scales.push(w as f64 / src_w as f64);
    }
    if let Some(h) = height.filter(|h| *h > 0) {
        scales.push(h as f64 / src_h as f64);
    }
    if scales.is_empty() {
        return source;
    }
    if shrink_only {
        scales.push(1.0);
    }

    let scale = scales.into_iter().fold(f64::INFINITY, f64::min);
    let w = (src_w as f64 * scale).round() as u32;
    let h = (src_h as f64 * scale).round() as u32;
    (w.max(1), h.max(1))
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left offset of a `target`-sized crop inside `current`, for an anchor.
///
/// `current` is the image as it is at crop time (usually already resized).
/// Offsets use integer halving and saturate at zero when the target is larger
/// than the image on an axis.
///
/// ```
/// # use thumbsmith::imaging::{CropAnchor, resolve_crop_anchor};
/// assert_eq!(resolve_crop_anchor((200, 100), (100, 100), CropAnchor::Top), (50, 0));
/// assert_eq!(resolve_crop_anchor((100, 200), (100, 100), CropAnchor::Left), (0, 50));
/// ```
pub fn resolve_crop_anchor(
    current: (u32, u32),
    target: (u32, u32),
    anchor: CropAnchor,
) -> (u32, u32) {
    let spare_w = current.0.saturating_sub(target.0);
    let spare_h = current.1.saturating_sub(target.1);

    match anchor {
        CropAnchor::Top => (spare_w / 2, 0),
        CropAnchor::Bottom => (spare_w / 2, spare_h),
        CropAnchor::Left => (0, spare_h / 2),
        CropAnchor::Right => (spare_w, spare_h / 2),
        CropAnchor::Center => (spare_w / 2, spare_h / 2),
    }
}

/// Clip a crop rectangle to the image. `None` when nothing would remain.
pub fn clamp_cutout(source: (u32, u32), bounds: CropBounds) -> Option<CropBounds> {
    let (src_w, src_h) = source;
    if bounds.x >= src_w || bounds.y >= src_h {
        return None;
    }
    let width = bounds.width.min(src_w - bounds.x);
    let height = bounds.height.min(src_h - bounds.y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(CropBounds {
        x: bounds.x,
        y: bounds.y,
        width,
        height,
    })
}

/// Offset that centers `image` on `canvas` (truncated toward zero).
pub fn canvas_offset(canvas: (u32, u32), image: (u32, u32)) -> (i64, i64) {
    (
        (canvas.0 as i64 - image.0 as i64) / 2,
        (canvas.1 as i64 - image.1 as i64) / 2,
    )
}

/// CSS padding `(vertical, horizontal)` that centers an image fitted into a
/// `width` x `height` box. Halves are floored. Without a box height the
/// vertical padding is zero.
pub fn calculate_padding(image: (u32, u32), width: u32, height: Option<u32>) -> (i64, i64) {
    let (fit_w, fit_h) = calculate_size(image, Some(width), height, false);
    let horizontal = (width as i64 - fit_w as i64).div_euclid(2);
    let vertical = height
        .map(|h| (h as i64 - fit_h as i64).div_euclid(2))
        .unwrap_or(0);
    (vertical, horizontal)
}
