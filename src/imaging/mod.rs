//! Image processing for derivatives.
//!
//! | Operation | ImageMagick | Pure Rust |
//! |---|---|---|
//! | **Identify** | `magick file[0] -format "%w %h" info:` | `image::image_dimensions` |
//! | **Crop** | `-crop WxH+X+Y +repage` | `crop_imm` |
//! | **Resize** | `-resize WxH!` | `resize_exact` (Lanczos3) |
//! | **Sharpen** | `-unsharp` | `unsharpen` |
//! | **Canvas** | `xc:none` + `-composite` | `imageops::overlay` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`MagickBackend`] / [`RustBackend`]
//! - **Operations**: Planners turning a request into [`Step`]s, plus execution

pub mod backend;
mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{AnyBackend, BackendError, Dimensions, ImageBackend, detect_backend};
pub use calculations::{
    calculate_fill_dimensions, calculate_padding, calculate_size, canvas_offset, clamp_cutout,
    resolve_crop_anchor,
};
pub use magick_backend::MagickBackend;
pub use operations::{
    DerivativeSpec, ProcessingOptions, Strategy, crop_image, create_derivative, get_dimensions,
    plan_derivative,
};
pub use params::{
    CropAnchor, CropBounds, CropSpec, Quality, RenderParams, Sharpening, Step,
};
pub use rust_backend::RustBackend;
