//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and render. Rendering executes a pre-planned list of
//! [`Step`](super::params::Step)s, so backends hold no layout logic.
//!
//! Two implementations exist:
//!
//! | Backend | Toolkit | When |
//! |---|---|---|
//! | [`MagickBackend`] | ImageMagick CLI (`magick` or `convert`) | found on `PATH` |
//! | [`RustBackend`] | `image` crate, statically linked | always available |
//!
//! [`detect_backend`] checks PATH once at startup and returns an [`AnyBackend`]
//! that callers inject into [`Derivatives`](crate::derive::Derivatives).

use super::magick_backend::MagickBackend;
use super::params::RenderParams;
use super::rust_backend::RustBackend;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl BackendError {
    pub(crate) fn load(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Load {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement both operations so the orchestrators are
/// backend-agnostic. See the [module docs](self) for the available backends.
pub trait ImageBackend: Sync {
    /// Short name used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Load the source, apply the steps in order, and write the output.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;
}

/// The backend selected at startup.
pub enum AnyBackend {
    Magick(MagickBackend),
    Rust(RustBackend),
}

impl ImageBackend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Magick(b) => b.name(),
            Self::Rust(b) => b.name(),
        }
    }

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        match self {
            Self::Magick(b) => b.identify(path),
            Self::Rust(b) => b.identify(path),
        }
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        match self {
            Self::Magick(b) => b.render(params),
            Self::Rust(b) => b.render(params),
        }
    }
}

/// Pick the ImageMagick backend when its CLI is installed, else pure Rust.
pub fn detect_backend() -> AnyBackend {
    match MagickBackend::detect() {
        Some(magick) => {
            tracing::debug!(program = %magick.program().display(), "Using ImageMagick backend");
            AnyBackend::Magick(magick)
        }
        None => {
            tracing::debug!("ImageMagick not found, using pure Rust backend");
            AnyBackend::Rust(RustBackend::new())
        }
    }
}
