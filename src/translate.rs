//! Message translation for the text filters.
//!
//! Filters that emit human-readable text go through a [`Translator`]. The
//! bundled [`Catalog`] is a flat message map loaded from the
//! `[translations]` config section; unknown messages pass through unchanged.

use crate::config::TranslationsConfig;
use std::collections::BTreeMap;

/// Source of translated messages.
pub trait Translator {
    /// Two-letter language code, e.g. `"cs"`.
    fn lang(&self) -> &str;

    /// Translate `message`, substituting `arg` for the first `%s`.
    fn translate(&self, message: &str, arg: Option<&str>) -> String;
}

/// Flat message catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    lang: String,
    messages: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            messages: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &TranslationsConfig) -> Self {
        Self {
            lang: config.lang.clone(),
            messages: config.messages.clone(),
        }
    }

    /// Add a translation, builder-style.
    pub fn with(mut self, message: impl Into<String>, translation: impl Into<String>) -> Self {
        self.messages.insert(message.into(), translation.into());
        self
    }
}

impl Translator for Catalog {
    fn lang(&self) -> &str {
        &self.lang
    }

    fn translate(&self, message: &str, arg: Option<&str>) -> String {
        let template = self
            .messages
            .get(message)
            .map(String::as_str)
            .unwrap_or(message);
        match arg {
            Some(arg) => template.replacen("%s", arg, 1),
            None => template.to_string(),
        }
    }
}
