//! Cached image derivatives.
//!
//! [`Derivatives`] turns a source image URL and a requested box into the URL of
//! a derivative file, creating the file on first use. Every operation follows
//! the same pipeline:
//!
//! ```text
//! resolve source ─┬─ missing ──────────────→ Original (URL unchanged)
//!                 └─ name + location ─┬─ exists → Cached
//!                                     └─ prepare dir → identify → plan → render
//!                                                        ├─ ok ────→ Generated
//!                                                        └─ error ─→ Original (public.url + URL)
//! ```
//!
//! A missing source is not an error: templates keep rendering with the
//! original reference. Processing failures are logged and degrade the same
//! way. Only failing to create the derivative directory is returned as an
//! error, since every later request would fail the same way.
//!
//! | Operation | Directory | Pixels |
//! |---|---|---|
//! | [`thumb`](Derivatives::thumb) | `thumbs/` | optional pre-crop, shrink-only fit |
//! | [`fit`](Derivatives::fit) | `fits/` | fill the box, crop at the anchor |
//! | [`fit_thumb`](Derivatives::fit_thumb) | `fitThumbs/` | shrink, crop, center on transparent canvas |
//! | [`cached_image`](Derivatives::cached_image) | mirror root | bytes copied unchanged |
//! | [`file_thumb`](Derivatives::file_thumb) | `images/thumbs/` | center-crop fit of a stored file |

use crate::cache::{DerivativeCache, Location, file_name, hash_key};
use crate::imaging::calculate_padding;
use crate::imaging::{
    BackendError, CropBounds, CropSpec, DerivativeSpec, ImageBackend, ProcessingOptions, Strategy,
    create_derivative,
};
use crate::naming::thumb_name;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to mirror {url}: {message}")]
    Mirror { url: String, message: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Directories and base URLs the derivatives are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    /// Document root; source URL paths resolve here.
    pub public_dir: PathBuf,
    /// Prefix for derivative URLs (no trailing slash; may be empty).
    pub public_url: String,
    /// Where mirrored remote images are stored.
    pub mirror_dir: PathBuf,
    pub mirror_url: String,
    /// Root for [`StoredFile`] paths.
    pub storage_dir: PathBuf,
}

/// Why the original reference was returned instead of a derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    MissingSource,
    ProcessingFailed(String),
}

/// Result of a derivative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The derivative already existed.
    Cached { url: String, path: PathBuf },
    /// The derivative was created by this call.
    Generated { url: String, path: PathBuf },
    /// No derivative; serve this URL instead.
    Original { url: String, reason: FallbackReason },
}

impl Outcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Cached { url, .. } | Self::Generated { url, .. } | Self::Original { url, .. } => {
                url
            }
        }
    }

    /// Path of the derivative file, if there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Cached { path, .. } | Self::Generated { path, .. } => Some(path),
            Self::Original { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Original { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// CSS padding that centers an image inside a fixed box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub vertical: i64,
    pub horizontal: i64,
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "padding: {}px {}px;", self.vertical, self.horizontal)
    }
}

/// A file kept in the storage root, referenced by display name and relative path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub path: String,
}

/// A resolved source image.
struct Source {
    path: PathBuf,
    /// URL directory, e.g. `/img` for `/img/photo.jpg`.
    dir: String,
    name: String,
    ext: Option<String>,
    mtime: u64,
}

fn mtime_secs(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extension after the last dot of the last path segment, lowercased.
fn url_extension(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let (_, ext) = segment.rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Join a root-relative URL path onto `root`.
///
/// `None` when a `..` segment (or a drive prefix) would leave the root.
fn confined(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = Path::new(url.trim_start_matches('/'));
    let inside = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        tracing::warn!(url, root = %root.display(), "Path escapes its root, ignored");
        return None;
    }
    Some(root.join(rel))
}

/// Remove a partial or rejected output so the next request retries.
fn discard(path: &Path) {
    if !path.is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Cannot remove broken cache entry");
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Derivative generator over an injected image backend.
pub struct Derivatives<B: ImageBackend> {
    backend: B,
    roots: Roots,
    options: ProcessingOptions,
    public: DerivativeCache,
    mirror: DerivativeCache,
}

impl<B: ImageBackend> Derivatives<B> {
    pub fn new(backend: B, roots: Roots, options: ProcessingOptions) -> Self {
        let public = DerivativeCache::new(&roots.public_dir, &roots.public_url);
        let mirror = DerivativeCache::new(&roots.mirror_dir, &roots.mirror_url);
        Self {
            backend,
            roots,
            options,
            public,
            mirror,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    fn resolve(&self, url: &str) -> Option<Source> {
        let path = confined(&self.roots.public_dir, url)?;
        if !path.is_file() {
            return None;
        }
        let (dir, name) = match url.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (String::new(), url.to_string()),
        };
        Some(Source {
            mtime: mtime_secs(&path),
            ext: url_extension(&name),
            path,
            dir,
            name,
        })
    }

    /// Log a processing failure and fall back to the original under the public URL.
    fn degrade(&self, url: String, location: &Location, err: impl fmt::Display) -> Outcome {
        tracing::warn!(url = %url, error = %err, "Derivative failed, serving original");
        discard(&location.path);
        Outcome::Original {
            url,
            reason: FallbackReason::ProcessingFailed(err.to_string()),
        }
    }

    fn render(
        &self,
        source: &Path,
        location: Location,
        spec: &DerivativeSpec,
        fallback_url: String,
    ) -> Result<Outcome, DeriveError> {
        self.public.prepare(&location)?;
        match create_derivative(&self.backend, source, &location.path, spec, &self.options) {
            Ok(_) => {
                tracing::debug!(url = %location.url, "Derivative generated");
                Ok(Outcome::Generated {
                    url: location.url,
                    path: location.path,
                })
            }
            Err(err) => Ok(self.degrade(fallback_url, &location, err)),
        }
    }

    fn derive(&self, url: &str, spec: DerivativeSpec) -> Result<Outcome, DeriveError> {
        let Some(source) = self.resolve(url) else {
            tracing::debug!(url, "Source image missing");
            return Ok(Outcome::Original {
                url: url.to_string(),
                reason: FallbackReason::MissingSource,
            });
        };

        let name = thumb_name(
            &source.name,
            spec.width,
            spec.height,
            source.mtime,
            spec.crop.as_ref(),
        );
        let location = self.public.locate(
            &source.dir,
            spec.strategy.dir_name(),
            &name,
            source.ext.as_deref(),
        );
        if self.public.lookup(&location) {
            return Ok(Outcome::Cached {
                url: location.url,
                path: location.path,
            });
        }

        let fallback = format!("{}{}", self.roots.public_url, url);
        self.render(&source.path, location, &spec, fallback)
    }

    /// Shrink-only thumbnail into `thumbs/`.
    ///
    /// Explicit crop bounds are cut first. Anchor crops only affect the name.
    pub fn thumb(
        &self,
        url: &str,
        width: u32,
        height: Option<u32>,
        crop: Option<CropSpec>,
    ) -> Result<Outcome, DeriveError> {
        self.derive(
            url,
            DerivativeSpec {
                strategy: Strategy::Thumb,
                width,
                height,
                crop,
            },
        )
    }

    /// Aspect-fit crop into `fits/`: exactly `width` x `height` when a height is given.
    pub fn fit(
        &self,
        url: &str,
        width: u32,
        height: Option<u32>,
        crop: Option<CropSpec>,
    ) -> Result<Outcome, DeriveError> {
        self.derive(
            url,
            DerivativeSpec {
                strategy: Strategy::Fit,
                width,
                height,
                crop,
            },
        )
    }

    /// Fit-on-canvas thumbnail into `fitThumbs/`, always `width` x `height`.
    pub fn fit_thumb(
        &self,
        url: &str,
        width: u32,
        height: u32,
        crop: Option<CropSpec>,
    ) -> Result<Outcome, DeriveError> {
        self.derive(
            url,
            DerivativeSpec {
                strategy: Strategy::FitThumb,
                width,
                height: Some(height),
                crop,
            },
        )
    }

    /// Padding that centers the image in a `width` x `height` box.
    ///
    /// Measures the matching `thumbs/` derivative when it exists, else the
    /// source. `None` when the source is missing or cannot be read.
    pub fn image_offset(
        &self,
        url: &str,
        width: u32,
        height: Option<u32>,
        crop: Option<&CropSpec>,
    ) -> Option<Padding> {
        let source = self.resolve(url)?;
        let name = thumb_name(&source.name, width, height, source.mtime, crop);
        let thumb = self.public.locate(
            &source.dir,
            Strategy::Thumb.dir_name(),
            &name,
            source.ext.as_deref(),
        );
        let measured = if self.public.lookup(&thumb) {
            &thumb.path
        } else {
            &source.path
        };

        match self.backend.identify(measured) {
            Ok(dims) => {
                let (vertical, horizontal) = calculate_padding(dims.as_tuple(), width, height);
                Some(Padding {
                    vertical,
                    horizontal,
                })
            }
            Err(err) => {
                tracing::warn!(path = %measured.display(), error = %err, "Cannot measure image");
                None
            }
        }
    }

    /// Mirror a remote (or local) image into the mirror root.
    ///
    /// The file name is the hash of `url`. Bytes are stored unchanged after
    /// the backend confirms they are an image. On failure the original `url`
    /// is returned when `allow_failure` is set, else [`DeriveError::Mirror`].
    pub fn cached_image(&self, url: &str, allow_failure: bool) -> Result<Outcome, DeriveError> {
        let name = file_name(&hash_key(url), url_extension(url).as_deref());
        let location = self.mirror.locate_file(&name);
        if self.mirror.lookup(&location) {
            return Ok(Outcome::Cached {
                url: location.url,
                path: location.path,
            });
        }
        self.mirror.prepare(&location)?;

        match self.mirror_bytes(url, &location.path) {
            Ok(()) => {
                tracing::debug!(url, path = %location.path.display(), "Mirrored image");
                Ok(Outcome::Generated {
                    url: location.url,
                    path: location.path,
                })
            }
            Err(message) if allow_failure => {
                Ok(self.degrade(url.to_string(), &location, message))
            }
            Err(message) => {
                discard(&location.path);
                Err(DeriveError::Mirror {
                    url: url.to_string(),
                    message,
                })
            }
        }
    }

    fn mirror_bytes(&self, url: &str, target: &Path) -> Result<(), String> {
        let bytes = if is_remote(url) {
            fetch(url)?
        } else {
            let local = url.strip_prefix("file://").unwrap_or(url);
            std::fs::read(local).map_err(|e| e.to_string())?
        };
        std::fs::write(target, &bytes).map_err(|e| e.to_string())?;
        self.backend
            .identify(target)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Center-crop thumbnail of a stored file into `images/thumbs/`.
    ///
    /// `Ok(None)` when the stored file does not exist.
    pub fn file_thumb(
        &self,
        file: &StoredFile,
        width: u32,
        height: Option<u32>,
    ) -> Result<Option<Outcome>, DeriveError> {
        let Some(source) = confined(&self.roots.storage_dir, &file.path) else {
            return Ok(None);
        };
        if !source.is_file() {
            return Ok(None);
        }
        let name = thumb_name(&file.name, width, height, mtime_secs(&source), None);
        let ext = source.extension().map(|e| e.to_string_lossy().into_owned());
        let location = self.public.locate_file(&format!(
            "images/thumbs/{}",
            file_name(&hash_key(&name), ext.as_deref())
        ));
        if self.public.lookup(&location) {
            return Ok(Some(Outcome::Cached {
                url: location.url,
                path: location.path,
            }));
        }

        let spec = DerivativeSpec {
            strategy: Strategy::Fit,
            width,
            height,
            crop: None,
        };
        let fallback = format!(
            "{}/{}",
            self.roots.public_url,
            file.path.trim_start_matches('/')
        );
        self.render(&source, location, &spec, fallback).map(Some)
    }

    /// `"WxH"` of a stored file, `"0x0"` when missing or unreadable.
    pub fn image_dimensions(&self, file: &StoredFile) -> String {
        let Some(path) = confined(&self.roots.storage_dir, &file.path) else {
            return "0x0".to_string();
        };
        if !path.is_file() {
            return "0x0".to_string();
        }
        match self.backend.identify(&path) {
            Ok(dims) => format!("{}x{}", dims.width, dims.height),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Cannot measure stored file");
                "0x0".to_string()
            }
        }
    }

    /// Crop `from` to `bounds`, fit into the box, and write `to`.
    ///
    /// `Ok(false)` when `from` does not exist.
    pub fn crop_image(
        &self,
        from: &Path,
        to: &Path,
        width: u32,
        height: Option<u32>,
        bounds: Option<CropBounds>,
    ) -> Result<bool, DeriveError> {
        Ok(crate::imaging::crop_image(
            &self.backend,
            from,
            to,
            width,
            height,
            bounds,
            &self.options,
        )?)
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| e.to_string())?;
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| e.to_string())?;
    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{CropAnchor, Dimensions, RustBackend, Step};
    use crate::test_helpers::{TestSite, create_test_png, set_mtime};
    use image::GenericImageView;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn rust(site: &TestSite) -> Derivatives<RustBackend> {
        Derivatives::new(RustBackend::new(), site.roots(), ProcessingOptions::default())
    }

    fn mock(site: &TestSite, backend: MockBackend) -> Derivatives<MockBackend> {
        Derivatives::new(backend, site.roots(), ProcessingOptions::default())
    }

    fn generated_path(outcome: &Outcome) -> PathBuf {
        match outcome {
            Outcome::Generated { path, .. } => path.clone(),
            other => panic!("expected Generated, got {other:?}"),
        }
    }

    // =========================================================================
    // Common pipeline
    // =========================================================================

    #[test]
    fn missing_source_returns_url_unchanged_without_files() {
        let site = TestSite::new();
        let d = mock(&site, MockBackend::new());

        let outcome = d.thumb("/img/nope.jpg", 100, Some(100), None).unwrap();
        assert_eq!(
            outcome,
            Outcome::Original {
                url: "/img/nope.jpg".into(),
                reason: FallbackReason::MissingSource,
            }
        );
        assert!(site.public_files().is_empty());
        assert!(!site.public_path("/img").exists());
        assert!(d.backend().get_operations().is_empty());
    }

    #[test]
    fn first_call_generates_then_hits_cache() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 200, 200);
        let d = mock(&site, MockBackend::with_dimensions(vec![dims(200, 200)]));

        let first = d.thumb(&url, 100, Some(100), None).unwrap();
        let path = generated_path(&first);
        assert!(path.starts_with(site.public_path("/img/thumbs")));
        assert!(first.url().starts_with("https://example.com/img/thumbs/"));
        assert!(first.url().ends_with(".jpg"));

        let second = d.thumb(&url, 100, Some(100), None).unwrap();
        assert_eq!(
            second,
            Outcome::Cached {
                url: first.url().to_string(),
                path: path.clone(),
            }
        );

        // identify + render for the first call only
        assert_eq!(d.backend().get_operations().len(), 2);
        assert_eq!(site.public_files().len(), 2);
    }

    #[test]
    fn new_mtime_produces_new_derivative() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 200, 200);
        let d = mock(
            &site,
            MockBackend::with_dimensions(vec![dims(200, 200), dims(200, 200)]),
        );

        let before = d.thumb(&url, 100, None, None).unwrap();
        set_mtime(&site.public_path(&url), 1_800_000_000);
        let after = d.thumb(&url, 100, None, None).unwrap();

        assert!(matches!(after, Outcome::Generated { .. }));
        assert_ne!(before.url(), after.url());
        // stale derivative is left in place
        assert!(before.path().unwrap().exists());
    }

    #[test]
    fn processing_failure_degrades_to_public_url() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 200, 200);
        let d = mock(&site, MockBackend::failing(vec![dims(200, 200)]));

        let outcome = d.fit(&url, 50, Some(50), None).unwrap();
        match outcome {
            Outcome::Original {
                url: fallback,
                reason: FallbackReason::ProcessingFailed(_),
            } => assert_eq!(fallback, "https://example.com/img/photo.jpg"),
            other => panic!("expected ProcessingFailed, got {other:?}"),
        }
        assert!(!site.public_files().iter().any(|f| f.contains("/fits/")));
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 200, 200);
        std::fs::write(site.public_path("/img/thumbs"), b"file in the way").unwrap();
        let d = mock(&site, MockBackend::with_dimensions(vec![dims(200, 200)]));

        let result = d.thumb(&url, 100, None, None);
        assert!(matches!(result, Err(DeriveError::Io(_))));
    }

    #[test]
    fn derivative_kinds_use_separate_directories() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 400, 200);
        let d = mock(
            &site,
            MockBackend::with_dimensions(vec![dims(400, 200), dims(400, 200), dims(400, 200)]),
        );

        let thumb = d.thumb(&url, 100, Some(100), None).unwrap();
        let fit = d.fit(&url, 100, Some(100), None).unwrap();
        let fit_thumb = d.fit_thumb(&url, 100, 100, None).unwrap();

        assert!(thumb.url().contains("/img/thumbs/"));
        assert!(fit.url().contains("/img/fits/"));
        assert!(fit_thumb.url().contains("/img/fitThumbs/"));
    }

    #[test]
    fn anchors_yield_distinct_fits() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 400, 200);
        let d = mock(
            &site,
            MockBackend::with_dimensions(vec![dims(400, 200), dims(400, 200)]),
        );

        let left = d
            .fit(&url, 100, Some(100), Some(CropSpec::Anchor(CropAnchor::Left)))
            .unwrap();
        let right = d
            .fit(&url, 100, Some(100), Some(CropSpec::Anchor(CropAnchor::Right)))
            .unwrap();
        assert_ne!(left.url(), right.url());

        let crops: Vec<Step> = d
            .backend()
            .rendered_steps()
            .into_iter()
            .filter_map(|steps| steps.into_iter().find(|s| matches!(s, Step::Crop { .. })))
            .collect();
        assert_eq!(
            crops,
            vec![
                Step::Crop {
                    x: 0,
                    y: 0,
                    width: 100,
                    height: 100
                },
                Step::Crop {
                    x: 100,
                    y: 0,
                    width: 100,
                    height: 100
                },
            ]
        );
    }

    #[test]
    fn parent_segments_never_leave_public_root() {
        let site = TestSite::new();
        create_test_png(&site.tmp.path().join("secret/leak.png"), 60, 60);
        let d = rust(&site);

        for url in ["/../secret/leak.png", "/img/../../secret/leak.png"] {
            assert_eq!(
                d.thumb(url, 50, Some(50), None).unwrap(),
                Outcome::Original {
                    url: url.into(),
                    reason: FallbackReason::MissingSource,
                }
            );
        }
        assert_eq!(d.image_offset("/../secret/leak.png", 50, Some(50), None), None);
        assert!(!site.tmp.path().join("secret/thumbs").exists());
    }

    // =========================================================================
    // Real pixels
    // =========================================================================

    #[test]
    fn thumb_shrinks_real_image() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.jpg", 400, 300);
        let outcome = rust(&site).thumb(&url, 200, Some(200), None).unwrap();

        let img = image::open(generated_path(&outcome)).unwrap();
        assert_eq!(img.dimensions(), (200, 150));
    }

    #[test]
    fn fit_is_exact_size() {
        let site = TestSite::new();
        let url = site.add_image("/img/photo.png", 300, 100);
        let outcome = rust(&site)
            .fit(&url, 80, Some(80), Some(CropSpec::Anchor(CropAnchor::Top)))
            .unwrap();

        let img = image::open(generated_path(&outcome)).unwrap();
        assert_eq!(img.dimensions(), (80, 80));
    }

    #[test]
    fn fit_thumb_small_source_is_centered_not_cropped() {
        let site = TestSite::new();
        let url = site.add_image("/img/small.png", 50, 20);
        let outcome = rust(&site).fit_thumb(&url, 100, 100, None).unwrap();

        let img = image::open(generated_path(&outcome)).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(25, 40)[3], 255);
        assert_eq!(img.get_pixel(74, 59)[3], 255);
        assert_eq!(img.get_pixel(75, 60)[3], 0);
    }

    #[test]
    fn mislabelled_source_is_decoded_by_content() {
        let site = TestSite::new();
        let path = site.public_path("/img/photo.jpg");
        create_test_png(&path, 200, 100);
        set_mtime(&path, 1_700_000_000);

        let outcome = rust(&site).thumb("/img/photo.jpg", 100, None, None).unwrap();
        let img = image::open(generated_path(&outcome)).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
    }

    // =========================================================================
    // image_offset
    // =========================================================================

    #[test]
    fn offset_measures_source_without_thumb() {
        let site = TestSite::new();
        let url = site.add_image("/img/wide.jpg", 200, 100);
        let padding = rust(&site).image_offset(&url, 100, Some(100), None).unwrap();
        assert_eq!(
            padding,
            Padding {
                vertical: 25,
                horizontal: 0
            }
        );
        assert_eq!(padding.to_string(), "padding: 25px 0px;");
    }

    #[test]
    fn offset_prefers_existing_thumb() {
        let site = TestSite::new();
        let url = site.add_image("/img/wide.jpg", 400, 100);
        let d = rust(&site);
        d.thumb(&url, 100, Some(100), None).unwrap();

        // thumb is 100x25 → fitted 100x25 → (100 - 25) / 2 = 37
        let padding = d.image_offset(&url, 100, Some(100), None).unwrap();
        assert_eq!(padding.vertical, 37);
    }

    #[test]
    fn offset_missing_source_is_none() {
        let site = TestSite::new();
        assert_eq!(rust(&site).image_offset("/img/none.jpg", 10, Some(10), None), None);
    }

    // =========================================================================
    // cached_image
    // =========================================================================

    #[test]
    fn cached_image_copies_local_bytes() {
        let site = TestSite::new();
        let source = site.tmp.path().join("remote/pic.PNG");
        create_test_png(&source, 8, 8);
        let reference = source.to_string_lossy().into_owned();
        let d = rust(&site);

        let first = d.cached_image(&reference, false).unwrap();
        let path = generated_path(&first);
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&source).unwrap());
        assert!(first.url().starts_with("/mirror/"));
        assert!(first.url().ends_with(".png"));

        assert!(matches!(
            d.cached_image(&reference, false).unwrap(),
            Outcome::Cached { .. }
        ));
    }

    #[test]
    fn cached_image_without_extension_is_mirrored() {
        let site = TestSite::new();
        let source = site.tmp.path().join("remote/avatar");
        create_test_png(&source, 8, 8);
        let d = rust(&site);

        let outcome = d.cached_image(&source.to_string_lossy(), false).unwrap();
        let path = generated_path(&outcome);
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&source).unwrap());
        assert!(!outcome.url().trim_start_matches("/mirror/").contains('.'));
    }

    #[test]
    fn cached_image_failure_modes() {
        let site = TestSite::new();
        let d = rust(&site);
        let missing = "/nonexistent/remote.jpg";

        let degraded = d.cached_image(missing, true).unwrap();
        assert!(matches!(degraded, Outcome::Original { ref url, .. } if url == missing));

        let err = d.cached_image(missing, false).unwrap_err();
        assert!(matches!(err, DeriveError::Mirror { .. }));
    }

    #[test]
    fn cached_image_rejects_non_images() {
        let site = TestSite::new();
        let bogus = site.tmp.path().join("notes.jpg");
        std::fs::write(&bogus, b"plain text").unwrap();
        let d = rust(&site);

        let result = d.cached_image(&bogus.to_string_lossy(), false);
        assert!(matches!(result, Err(DeriveError::Mirror { .. })));
        let leftovers = std::fs::read_dir(site.tmp.path().join("mirror")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    // =========================================================================
    // Stored files
    // =========================================================================

    #[test]
    fn file_thumb_writes_to_images_thumbs() {
        let site = TestSite::new();
        site.add_stored("uploads/a1b2.png", 300, 200);
        let file = StoredFile {
            name: "holiday.png".into(),
            path: "uploads/a1b2.png".into(),
        };
        let d = rust(&site);

        let outcome = d.file_thumb(&file, 100, Some(100)).unwrap().unwrap();
        let path = generated_path(&outcome);
        assert!(path.starts_with(site.public_dir().join("images/thumbs")));
        assert_eq!(image::open(&path).unwrap().dimensions(), (100, 100));

        assert!(matches!(
            d.file_thumb(&file, 100, Some(100)).unwrap(),
            Some(Outcome::Cached { .. })
        ));
    }

    #[test]
    fn file_thumb_missing_is_none() {
        let site = TestSite::new();
        let file = StoredFile {
            name: "x.png".into(),
            path: "missing.png".into(),
        };
        assert_eq!(rust(&site).file_thumb(&file, 10, Some(10)).unwrap(), None);
    }

    #[test]
    fn image_dimensions_of_stored_file() {
        let site = TestSite::new();
        site.add_stored("doc/scan.png", 64, 48);
        let d = rust(&site);
        let file = StoredFile {
            name: "scan.png".into(),
            path: "doc/scan.png".into(),
        };
        assert_eq!(d.image_dimensions(&file), "64x48");

        let missing = StoredFile {
            name: "x".into(),
            path: "nope.png".into(),
        };
        assert_eq!(d.image_dimensions(&missing), "0x0");
    }

    #[test]
    fn crop_image_missing_source_is_false() {
        let site = TestSite::new();
        let d = mock(&site, MockBackend::new());
        let done = d
            .crop_image(
                Path::new("/nonexistent.jpg"),
                &site.tmp.path().join("out.jpg"),
                10,
                Some(10),
                None,
            )
            .unwrap();
        assert!(!done);
    }

    #[test]
    fn crop_image_records_quality() {
        let site = TestSite::new();
        let from = site.tmp.path().join("in.jpg");
        std::fs::write(&from, b"x").unwrap();
        let d = mock(&site, MockBackend::with_dimensions(vec![dims(100, 100)]));

        assert!(
            d.crop_image(
                &from,
                &site.tmp.path().join("out.jpg"),
                50,
                Some(50),
                Some(CropBounds {
                    x: 0,
                    y: 0,
                    width: 100,
                    height: 100
                }),
            )
            .unwrap()
        );
        let ops = d.backend().get_operations();
        assert!(matches!(ops.last(), Some(RecordedOp::Render { quality: 90, .. })));
    }

    #[test]
    fn stored_file_outside_storage_is_ignored() {
        let site = TestSite::new();
        create_test_png(&site.tmp.path().join("secret/leak.png"), 40, 40);
        let d = rust(&site);
        let file = StoredFile {
            name: "leak.png".into(),
            path: "../secret/leak.png".into(),
        };

        assert_eq!(d.image_dimensions(&file), "0x0");
        assert_eq!(d.file_thumb(&file, 20, Some(20)).unwrap(), None);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn confined_cases() {
        let root = Path::new("/srv/www");
        assert_eq!(
            confined(root, "/img/a.jpg"),
            Some(PathBuf::from("/srv/www/img/a.jpg"))
        );
        assert_eq!(
            confined(root, "img/./a.jpg"),
            Some(PathBuf::from("/srv/www/img/a.jpg"))
        );
        assert_eq!(confined(root, "/img/../a.jpg"), None);
        assert_eq!(confined(root, "../etc/passwd"), None);
        assert_eq!(confined(root, "//etc/passwd"), Some(PathBuf::from("/srv/www/etc/passwd")));
    }

    #[test]
    fn discard_removes_broken_entry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let broken = tmp.path().join("thumbs/partial.jpg");
        std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
        std::fs::write(&broken, b"half a jpeg").unwrap();

        discard(&broken);
        assert!(!broken.exists());
        discard(&broken);
        discard(tmp.path());
        assert!(tmp.path().is_dir());
    }

    #[test]
    fn url_extension_cases() {
        assert_eq!(url_extension("/img/photo.JPG"), Some("jpg".into()));
        assert_eq!(url_extension("https://a.com/x.png?v=2"), Some("png".into()));
        assert_eq!(url_extension("https://a.com/v1.2/image"), None);
        assert_eq!(url_extension("README"), None);
    }
}
