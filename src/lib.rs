//! # thumbsmith
//!
//! Template helpers for server-rendered web apps: cached image derivatives
//! plus a set of text, date and string filters.
//!
//! # Architecture
//!
//! Image URLs go through [`derive::Derivatives`], which resolves the source
//! under the public root, names the derivative, and renders it on a cache
//! miss:
//!
//! ```text
//! URL ──→ naming::thumb_name ──→ cache::DerivativeCache::locate
//!                                     │
//!                      exists? ───────┼──→ Cached
//!                                     ▼
//!         imaging::create_derivative (identify → plan → render) ──→ Generated
//! ```
//!
//! Planning is pure: [`imaging::plan_derivative`] turns source dimensions and
//! a request into a list of [`imaging::Step`]s, and a backend only executes
//! them. Unit tests assert on planned steps through a recording mock without
//! decoding any pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`derive`] | Orchestrators: `thumb`, `fit`, `fit_thumb`, `image_offset`, `cached_image`, `file_thumb` |
//! | [`imaging`] | Backends (ImageMagick CLI, pure Rust), geometry, step planning |
//! | [`naming`] | Deterministic derivative names from source, box, crop and mtime |
//! | [`cache`] | Hashed derivative locations and cache statistics |
//! | [`filters`] | Name → function registry of template filters over JSON values |
//! | [`text`] | HTML truncation, number and phone formatting, names |
//! | [`time`] | Relative and translated dates |
//! | [`translate`] | `Translator` trait and the config-backed `Catalog` |
//! | [`strings`] | Vocatives, transliteration, link detection, slugs, file names |
//! | [`config`] | `thumbsmith.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is the Cache
//!
//! A derivative is cached when its file exists. Names hash the full request
//! including the source mtime, so editing a source yields a new URL and
//! browsers never see stale pixels. Stale files are left for external cleanup.
//!
//! ## Missing Images Degrade, Never Fail
//!
//! Templates render pages, and a page should not break because one image is
//! missing or corrupt. Missing sources return the URL unchanged, processing
//! failures return the original under the public URL, and both are logged.
//!
//! ## Two Backends, One Plan
//!
//! ImageMagick is used when installed; otherwise the statically linked
//! `image` crate renders the same [`imaging::Step`] list. Both produce
//! identical geometry.

pub mod cache;
pub mod config;
pub mod derive;
pub mod filters;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod strings;
pub mod text;
pub mod time;
pub mod translate;

#[cfg(test)]
pub(crate) mod test_helpers;
