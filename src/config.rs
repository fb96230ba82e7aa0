//! Helper configuration module.
//!
//! Handles loading, validating, and merging `thumbsmith.toml`. Stock defaults
//! are overridden by the user file in the project root.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [public]
//! dir = "www"               # Document root; sources and derivatives live here
//! url = ""                  # Base URL prefixed to derivative URLs
//!
//! [mirror]
//! dir = "www/cache/images"  # Where cached_image stores mirrored files
//! url = "/cache/images"     # URL of that directory
//!
//! [storage]
//! dir = "storage"           # Root for stored (uploaded) files
//!
//! [processing]
//! backend = "auto"          # "auto", "imagemagick" or "rust"
//! quality = 90              # JPEG/WebP quality (1-100)
//! sharpen = true            # Unsharp mask after resize (never on PNG)
//! sharpen_sigma = 0.5
//! sharpen_threshold = 0
//!
//! [translations]
//! lang = "en"
//!
//! [translations.messages]
//! "Yes" = "Ano"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [public]
//! url = "https://cdn.example.com"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::derive::Roots;
use crate::imaging::{
    AnyBackend, MagickBackend, ProcessingOptions, Quality, RustBackend, Sharpening,
    detect_backend,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in the project root.
pub const CONFIG_FILENAME: &str = "thumbsmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `thumbsmith.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    /// Document root holding source images and derivatives.
    pub public: PublicConfig,
    /// Local mirror of remote images.
    pub mirror: MirrorConfig,
    /// Stored file root.
    pub storage: StorageConfig,
    /// Backend and encoding settings.
    pub processing: ProcessingConfig,
    /// Language and message catalog.
    pub translations: TranslationsConfig,
}

impl HelperConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "public.dir must not be empty".into(),
            ));
        }
        if self.processing.quality == 0 || self.processing.quality > 100 {
            return Err(ConfigError::Validation(
                "processing.quality must be 1-100".into(),
            ));
        }
        if self.processing.sharpen_sigma <= 0.0 {
            return Err(ConfigError::Validation(
                "processing.sharpen_sigma must be positive".into(),
            ));
        }
        if self.translations.lang.trim().is_empty() {
            return Err(ConfigError::Validation(
                "translations.lang must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve configured directories against `base` (the project root).
    pub fn roots(&self, base: &Path) -> Roots {
        Roots {
            public_dir: resolve_dir(base, &self.public.dir),
            public_url: self.public.url.trim_end_matches('/').to_string(),
            mirror_dir: resolve_dir(base, &self.mirror.dir),
            mirror_url: self.mirror.url.trim_end_matches('/').to_string(),
            storage_dir: resolve_dir(base, &self.storage.dir),
        }
    }
}

fn resolve_dir(base: &Path, dir: &str) -> PathBuf {
    let path = Path::new(dir);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublicConfig {
    pub dir: String,
    pub url: String,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            dir: "www".to_string(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub dir: String,
    pub url: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            dir: "www/cache/images".to_string(),
            url: "/cache/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "storage".to_string(),
        }
    }
}

/// Which image backend to use.
///
/// Normally left at `auto`, which picks by availability. The explicit values
/// pin one backend: `rust` gives the same pixels on every machine and never
/// spawns a process, `imagemagick` fails loudly instead of silently falling
/// back when the tool is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// ImageMagick when installed, else pure Rust.
    #[default]
    Auto,
    /// Require `magick`/`convert` on PATH.
    Imagemagick,
    /// Always the built-in decoder/encoder.
    Rust,
}

impl BackendChoice {
    /// Instantiate the chosen backend. `None` when ImageMagick was required
    /// but is not installed.
    pub fn create(self) -> Option<AnyBackend> {
        match self {
            Self::Auto => Some(detect_backend()),
            Self::Imagemagick => MagickBackend::detect().map(AnyBackend::Magick),
            Self::Rust => Some(AnyBackend::Rust(RustBackend::new())),
        }
    }
}

/// Backend and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub backend: BackendChoice,
    /// Lossy encoding quality (1-100).
    pub quality: u32,
    /// Apply an unsharp mask after resizing (PNG output is never sharpened).
    pub sharpen: bool,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let light = Sharpening::light();
        Self {
            backend: BackendChoice::Auto,
            quality: 90,
            sharpen: true,
            sharpen_sigma: light.sigma,
            sharpen_threshold: light.threshold,
        }
    }
}

impl ProcessingConfig {
    pub fn options(&self) -> ProcessingOptions {
        ProcessingOptions {
            quality: Quality::new(self.quality),
            sharpening: self.sharpen.then_some(Sharpening {
                sigma: self.sharpen_sigma,
                threshold: self.sharpen_threshold,
            }),
        }
    }
}

/// Language and message catalog for the text filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationsConfig {
    pub lang: String,
    pub messages: BTreeMap<String, String>,
}

impl Default for TranslationsConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            messages: BTreeMap::new(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(HelperConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `thumbsmith.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HelperConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HelperConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `thumbsmith.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<HelperConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(root = %root.display(), "Loaded configuration");
    Ok(config)
}

/// Returns a fully-commented stock `thumbsmith.toml` with all keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbsmith configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Relative directories are resolved
# against the directory holding this file. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Public document root
# ---------------------------------------------------------------------------
[public]
# Source images are looked up here by URL path (/img/photo.jpg).
# Derivatives are written next to them (/img/thumbs/, /img/fits/, ...).
dir = "www"

# Base URL prefixed to every derivative URL, e.g. "https://cdn.example.com".
url = ""

# ---------------------------------------------------------------------------
# Mirror of remote images (cached_image)
# ---------------------------------------------------------------------------
[mirror]
dir = "www/cache/images"
url = "/cache/images"

# ---------------------------------------------------------------------------
# Stored files (file_thumb, image_dimensions)
# ---------------------------------------------------------------------------
[storage]
dir = "storage"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# "auto" uses ImageMagick when installed, else the built-in Rust backend.
backend = "auto"

# Lossy encoding quality (1 = worst, 100 = best).
quality = 90

# Unsharp mask after resizing. PNG output is never sharpened.
sharpen = true
sharpen_sigma = 0.5
sharpen_threshold = 0

# ---------------------------------------------------------------------------
# Translations for text filters
# ---------------------------------------------------------------------------
[translations]
# "cs" enables Czech vocative inflection.
lang = "en"

# Message catalog; "%s" receives the filter argument.
[translations.messages]
# "Yes" = "Ano"
# "%s minutes ago" = "před %s minutami"
"##
}
