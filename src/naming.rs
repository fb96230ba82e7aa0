//! Deterministic derivative names.
//!
//! A derivative name encodes everything that can change its pixels: the
//! source file name, the requested box, the crop, and the source mtime. Two
//! requests with the same inputs always produce the same name, and touching
//! the source produces a new one.
//!
//! ```text
//! photo.jpg, 100x80, no crop, mtime 1700000000   → photo_100x80-1700000000.jpg
//! photo.jpg, 100x?,  no crop                      → photo_100x-1700000000.jpg
//! photo.jpg, 100x80, bounds 10,20,300,200         → photo_100x80-10-20-300-200-1700000000.jpg
//! photo.jpg, 100x80, anchor top                   → photo_100x80-top-1700000000.jpg
//! ```

use crate::imaging::CropSpec;

/// Split a path's basename into `(stem, extension)` at the last dot.
pub fn split_name(rel_path: &str) -> (&str, Option<&str>) {
    let base = rel_path.rsplit('/').next().unwrap_or(rel_path);
    match base.rfind('.') {
        Some(pos) => (&base[..pos], Some(&base[pos + 1..])),
        None => (base, None),
    }
}

/// Encode the crop part of a derivative name, including its trailing dash.
fn crop_token(crop: Option<&CropSpec>) -> String {
    match crop {
        Some(CropSpec::Bounds(b)) => format!("{}-{}-{}-{}-", b.x, b.y, b.width, b.height),
        Some(CropSpec::Anchor(a)) => format!("{}-", a.as_str()),
        None => String::new(),
    }
}

/// Build the derivative name for a source file.
///
/// Only the basename of `rel_path` is used. A missing height leaves an empty
/// slot after the `x`; a missing extension drops the `.ext` suffix.
pub fn thumb_name(
    rel_path: &str,
    width: u32,
    height: Option<u32>,
    mtime: u64,
    crop: Option<&CropSpec>,
) -> String {
    let (stem, ext) = split_name(rel_path);
    let height = height.map(|h| h.to_string()).unwrap_or_default();
    let name = format!("{stem}_{width}x{height}-{}{mtime}", crop_token(crop));
    match ext {
        Some(ext) => format!("{name}.{ext}"),
        None => name,
    }
}
