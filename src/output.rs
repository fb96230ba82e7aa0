//! CLI output formatting.
//!
//! Every derivative request prints the URL mapping first and the status and
//! file as indented context lines:
//!
//! ```text
//! /img/photo.jpg → https://example.com/img/thumbs/3f2a….jpg
//!     Status: generated
//!     File: www/img/thumbs/3f2a….jpg
//! /img/missing.jpg → /img/missing.jpg
//!     Status: original (source missing)
//!
//! Cache: 1 cached, 1 generated, 1 fell back (3 total)
//! ```
//!
//! Each `format_*` function returns `Vec<String>` for testability. The
//! `print_*` wrappers write to stdout.

use crate::cache::CacheStats;
use crate::derive::{FallbackReason, Outcome, Padding};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn status(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Cached { .. } => "cached".to_string(),
        Outcome::Generated { .. } => "generated".to_string(),
        Outcome::Original {
            reason: FallbackReason::MissingSource,
            ..
        } => "original (source missing)".to_string(),
        Outcome::Original {
            reason: FallbackReason::ProcessingFailed(message),
            ..
        } => format!("original (processing failed: {message})"),
    }
}

/// Format one derivative request and its outcome.
pub fn format_outcome(request: &str, outcome: &Outcome) -> Vec<String> {
    let mut lines = vec![
        format!("{} → {}", request, outcome.url()),
        format!("{}Status: {}", indent(1), status(outcome)),
    ];
    if let Some(path) = outcome.path() {
        lines.push(format!("{}File: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_outcome(request: &str, outcome: &Outcome) {
    for line in format_outcome(request, outcome) {
        println!("{}", line);
    }
}

/// Format the padding computed for a URL, or a note that none could be computed.
pub fn format_offset(url: &str, padding: Option<&Padding>) -> Vec<String> {
    match padding {
        Some(p) => vec![format!("{} → {}", url, p)],
        None => vec![
            format!("{} → (none)", url),
            format!("{}Source missing or unreadable", indent(1)),
        ],
    }
}

/// Format a summary line for a batch of requests. Empty for fewer than two.
pub fn format_stats(stats: &CacheStats) -> Vec<String> {
    if stats.total() < 2 {
        return Vec::new();
    }
    vec![String::new(), format!("Cache: {}", stats)]
}

pub fn print_stats(stats: &CacheStats) {
    for line in format_stats(stats) {
        println!("{}", line);
    }
}

/// Format a name listing with a heading, one indented name per line.
pub fn format_list<'a>(heading: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut lines = vec![heading.to_string()];
    lines.extend(names.into_iter().map(|n| format!("{}{}", indent(1), n)));
    lines
}
