//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which plans the pixel work from known dimensions) and the
//! [`backend`](super::backend) (which executes it). A plan is a flat list of
//! [`Step`]s with every coordinate already resolved, so both backends produce
//! the same geometry.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters applied after resizing non-PNG output.
//! - [`CropAnchor`] / [`CropBounds`] / [`CropSpec`]: How a derivative is cropped.
//! - [`Step`]: One resolved pixel operation.
//! - [`RenderParams`]: Source, output, steps and quality for one derivative.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening that offsets resize softening.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Named position that survives a crop-to-fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CropAnchor {
    Top,
    Bottom,
    Left,
    Right,
    #[default]
    Center,
}

impl CropAnchor {
    /// Parse an anchor token. Unrecognized tokens resolve to [`CropAnchor::Center`].
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for CropAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crop part of a derivative request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropSpec {
    /// Crop to these bounds before resizing.
    Bounds(CropBounds),
    /// Keep this part of the image when cropping to the target aspect.
    Anchor(CropAnchor),
}

impl CropSpec {
    /// Parse `"x,y,w,h"` as bounds; anything else is an anchor token.
    ///
    /// ```
    /// # use thumbsmith::imaging::{CropAnchor, CropBounds, CropSpec};
    /// assert_eq!(
    ///     CropSpec::parse("10,20,300,200"),
    ///     CropSpec::Bounds(CropBounds { x: 10, y: 20, width: 300, height: 200 })
    /// );
    /// assert_eq!(CropSpec::parse("top"), CropSpec::Anchor(CropAnchor::Top));
    /// assert_eq!(CropSpec::parse("diagonal"), CropSpec::Anchor(CropAnchor::Center));
    /// ```
    pub fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        if parts.len() == 4
            && let (Ok(x), Ok(y), Ok(width), Ok(height)) = (
                parts[0].parse(),
                parts[1].parse(),
                parts[2].parse(),
                parts[3].parse(),
            )
        {
            return Self::Bounds(CropBounds {
                x,
                y,
                width,
                height,
            });
        }
        Self::Anchor(CropAnchor::parse(input))
    }

    pub fn bounds(&self) -> Option<CropBounds> {
        match self {
            Self::Bounds(b) => Some(*b),
            Self::Anchor(_) => None,
        }
    }

    /// Anchor for crop-to-fit; explicit bounds and absent specs use center.
    pub fn anchor(spec: Option<&Self>) -> CropAnchor {
        match spec {
            Some(Self::Anchor(a)) => *a,
            _ => CropAnchor::Center,
        }
    }
}

/// A single pixel operation with every coordinate resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Cut out a rectangle of the current image.
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Resample to exactly these dimensions.
    Resize { width: u32, height: u32 },
    /// Unsharp mask.
    Sharpen(Sharpening),
    /// Place the current image on a transparent canvas at (left, top).
    Canvas {
        width: u32,
        height: u32,
        left: i64,
        top: i64,
    },
}

/// Everything a backend needs to produce one derivative file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub steps: Vec<Step>,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn anchor_tokens_are_case_insensitive() {
        assert_eq!(CropAnchor::parse("TOP"), CropAnchor::Top);
        assert_eq!(CropAnchor::parse(" right "), CropAnchor::Right);
        assert_eq!(CropAnchor::parse(""), CropAnchor::Center);
    }

    #[test]
    fn crop_spec_with_bad_numbers_is_an_anchor() {
        assert_eq!(
            CropSpec::parse("1,2,x,4"),
            CropSpec::Anchor(CropAnchor::Center)
        );
        assert_eq!(CropSpec::parse("1,2,3"), CropSpec::Anchor(CropAnchor::Center));
    }

    #[test]
    fn anchor_of_bounds_is_center() {
        let spec = CropSpec::parse("0,0,10,10");
        assert_eq!(CropSpec::anchor(Some(&spec)), CropAnchor::Center);
        assert_eq!(CropSpec::anchor(None), CropAnchor::Center);
        assert_eq!(
            CropSpec::anchor(Some(&CropSpec::Anchor(CropAnchor::Left))),
            CropAnchor::Left
        );
    }
}
