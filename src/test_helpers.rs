//! Shared test utilities.
//!
//! Synthetic images and a throwaway public/storage/mirror layout, so unit
//! tests can exercise derivative generation without fixtures on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::new();
//! let url = site.add_image("/img/photo.jpg", 400, 300);
//! let derivatives = Derivatives::new(RustBackend::new(), site.roots(), ProcessingOptions::default());
//! let outcome = derivatives.thumb(&url, 100, Some(100), None).unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::derive::Roots;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write an opaque gradient JPEG.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

/// Write an opaque gradient PNG.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Set a file's modification time to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// =========================================================================
// Site layout
// =========================================================================

/// Temporary `public/`, `mirror/` and `storage/` directories.
pub struct TestSite {
    pub tmp: TempDir,
    pub public_url: String,
}

impl TestSite {
    pub fn new() -> Self {
        Self::with_url("https://example.com")
    }

    pub fn with_url(public_url: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        for dir in ["public", "mirror", "storage"] {
            std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        Self {
            tmp,
            public_url: public_url.to_string(),
        }
    }

    pub fn roots(&self) -> Roots {
        Roots {
            public_dir: self.public_dir(),
            public_url: self.public_url.clone(),
            mirror_dir: self.tmp.path().join("mirror"),
            mirror_url: "/mirror".to_string(),
            storage_dir: self.storage_dir(),
        }
    }

    pub fn public_dir(&self) -> PathBuf {
        self.tmp.path().join("public")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.tmp.path().join("storage")
    }

    /// Create a source image at a URL path under the public root.
    ///
    /// The extension picks the format (`png` or JPEG otherwise).
    pub fn add_image(&self, url: &str, width: u32, height: u32) -> String {
        let path = self.public_path(url);
        if url.ends_with(".png") {
            create_test_png(&path, width, height);
        } else {
            create_test_jpeg(&path, width, height);
        }
        set_mtime(&path, 1_700_000_000);
        url.to_string()
    }

    /// Create a stored image under the storage root.
    pub fn add_stored(&self, rel_path: &str, width: u32, height: u32) -> PathBuf {
        let path = self.storage_dir().join(rel_path);
        create_test_png(&path, width, height);
        path
    }

    pub fn public_path(&self, url: &str) -> PathBuf {
        self.public_dir().join(url.trim_start_matches('/'))
    }

    /// Every file below the public root, relative to it, sorted.
    pub fn public_files(&self) -> Vec<String> {
        let root = self.public_dir();
        let mut files: Vec<String> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();
        files
    }
}
