//! Filesystem cache for image derivatives.
//!
//! Derivatives are expensive to produce and never change once written, so the
//! cache is nothing more than the public directory itself: a derivative is
//! "cached" when its file exists.
//!
//! # Design
//!
//! ## Cache keys
//!
//! The derivative file name is the SHA-256 of
//! `"<public.url>/<dir>/<kind>/<thumb name>"`, where the thumb name (see
//! [`naming::thumb_name`](crate::naming::thumb_name)) already encodes the
//! source name, requested box, crop and source mtime. Touching the source
//! changes its mtime and therefore the key; the stale file stays on disk.
//!
//! ## Layout
//!
//! ```text
//! <public.dir>/img/photo.jpg                       source
//! <public.dir>/img/thumbs/<sha256>.jpg             thumb
//! <public.dir>/img/fits/<sha256>.jpg               fit
//! <public.dir>/img/fitThumbs/<sha256>.jpg          fit_thumb
//! <mirror.dir>/<sha256(url)>.jpg                   cached_image
//! <public.dir>/images/thumbs/<sha256>.jpg          file_thumb
//! ```
//!
//! ## Concurrency
//!
//! There is no locking. Two concurrent misses for the same key both render
//! and the second write replaces the first with identical content.

use crate::derive::Outcome;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Where a derivative lives on disk and how it is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub url: String,
}

/// Maps derivative keys to files under a root directory and URLs under a base URL.
#[derive(Debug, Clone)]
pub struct DerivativeCache {
    root_dir: PathBuf,
    root_url: String,
}

impl DerivativeCache {
    pub fn new(root_dir: impl Into<PathBuf>, root_url: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            root_url: root_url.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Locate a derivative of a source in `dir` (URL path, e.g. `/img`).
    ///
    /// `kind` is the derivative directory (`thumbs`, `fits`, `fitThumbs`).
    pub fn locate(&self, dir: &str, kind: &str, thumb_name: &str, ext: Option<&str>) -> Location {
        let key = hash_key(&format!("{}/{}/{}/{}", self.root_url, dir, kind, thumb_name));
        let file = file_name(&key, ext);
        Location {
            path: self
                .root_dir
                .join(dir.trim_start_matches('/'))
                .join(kind)
                .join(&file),
            url: format!("{}{}/{}/{}", self.root_url, dir, kind, file),
        }
    }

    /// Locate a file by its path relative to the root.
    pub fn locate_file(&self, rel_path: &str) -> Location {
        let rel = rel_path.trim_start_matches('/');
        Location {
            path: self.root_dir.join(rel),
            url: format!("{}/{}", self.root_url.trim_end_matches('/'), rel),
        }
    }

    /// Whether the derivative already exists. Content is not checked.
    pub fn lookup(&self, location: &Location) -> bool {
        let hit = location.path.is_file();
        if hit {
            tracing::debug!(path = %location.path.display(), "Cache hit");
        }
        hit
    }

    /// Create the directory that will hold the derivative.
    pub fn prepare(&self, location: &Location) -> io::Result<()> {
        match location.path.parent() {
            Some(parent) => std::fs::create_dir_all(parent),
            None => Ok(()),
        }
    }
}

/// `<key>.<ext>`, or just the key when there is no extension.
pub(crate) fn file_name(key: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{key}.{ext}"),
        None => key.to_string(),
    }
}

/// SHA-256 of a string, returned as a hex string.
pub fn hash_key(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Summary of cache behaviour over a run.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub fallbacks: u32,
}

impl CacheStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Cached { .. } => self.hits += 1,
            Outcome::Generated { .. } => self.generated += 1,
            Outcome::Original { .. } => self.fallbacks += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.fallbacks
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fallbacks > 0 {
            write!(
                f,
                "{} cached, {} generated, {} fell back ({} total)",
                self.hits,
                self.generated,
                self.fallbacks,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
