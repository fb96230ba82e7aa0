//! Template filter registry.
//!
//! Filters are plain functions registered by name in [`FilterRegistry::standard`].
//! Templates (or the `apply` CLI subcommand) call them with JSON arguments and
//! get a JSON value back, so the same table serves any template engine that
//! can exchange `serde_json::Value`s.
//!
//! | Filter | Arguments | Result |
//! |---|---|---|
//! | `thumb`, `fit` | url, width, height?, crop? | URL |
//! | `fitThumb` | url, width, height, crop? | URL |
//! | `imgOffset` | url, width, height?, crop? | `padding: …;` or `""` |
//! | `fileThumb` | `{name, path}`, width, height? | URL or `false` |
//! | `imageDimensions` | `{name, path}` | `"WxH"` |
//! | `timeAgoInWords`, `timeAgoShort` | time | phrase or `false` |
//! | `number` | value, decimals?, point?, separator? | string |
//!
//! The remaining filters map one-to-one onto [`text`](crate::text) and
//! [`time`](crate::time) helpers.

use crate::derive::{DeriveError, Derivatives, StoredFile};
use crate::imaging::{CropSpec, ImageBackend};
use crate::text;
use crate::time;
use crate::translate::Translator;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown filter: {0}")]
    Unknown(String),
    #[error("Filter {filter}: {message}")]
    Argument {
        filter: &'static str,
        message: String,
    },
    #[error(transparent)]
    Derive(#[from] DeriveError),
}

/// Everything a filter may need besides its arguments.
pub struct FilterContext<'a, B: ImageBackend> {
    pub derivatives: &'a Derivatives<B>,
    pub translator: &'a dyn Translator,
    /// Reference point for relative times.
    pub now: DateTime<Utc>,
}

/// Positional filter arguments with typed accessors.
pub struct FilterArgs<'a> {
    filter: &'static str,
    values: &'a [Value],
}

impl<'a> FilterArgs<'a> {
    pub fn new(filter: &'static str, values: &'a [Value]) -> Self {
        Self { filter, values }
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Argument {
            filter: self.filter,
            message: message.into(),
        }
    }

    /// Argument `i`, treating `null` as absent.
    fn get(&self, i: usize) -> Option<&'a Value> {
        self.values.get(i).filter(|v| !v.is_null())
    }

    fn required(&self, i: usize) -> Result<&'a Value, FilterError> {
        self.get(i)
            .ok_or_else(|| self.error(format!("missing argument {}", i + 1)))
    }

    /// A string argument. Numbers and booleans are converted to text.
    pub fn text(&self, i: usize) -> Result<String, FilterError> {
        self.required(i).and_then(|v| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(self.error(format!("argument {} must be a string, got {other}", i + 1))),
        })
    }

    pub fn opt_text(&self, i: usize) -> Result<Option<String>, FilterError> {
        self.get(i).map(|_| self.text(i)).transpose()
    }

    /// A number argument. Numeric strings are accepted.
    pub fn number(&self, i: usize) -> Result<f64, FilterError> {
        let value = self.required(i)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            self.error(format!("argument {} must be a number, got {value}", i + 1))
        })
    }

    fn unsigned(&self, i: usize) -> Result<u64, FilterError> {
        let n = self.number(i)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(self.error(format!("argument {} must be a whole number, got {n}", i + 1)));
        }
        Ok(n as u64)
    }

    pub fn dimension(&self, i: usize) -> Result<u32, FilterError> {
        let n = self.unsigned(i)?;
        u32::try_from(n).map_err(|_| self.error(format!("argument {} is too large", i + 1)))
    }

    pub fn opt_dimension(&self, i: usize) -> Result<Option<u32>, FilterError> {
        self.get(i).map(|_| self.dimension(i)).transpose()
    }

    pub fn opt_count(&self, i: usize) -> Result<Option<usize>, FilterError> {
        self.get(i)
            .map(|_| self.unsigned(i).map(|n| n as usize))
            .transpose()
    }

    /// Crop spec: `"x,y,w,h"` or an anchor name.
    pub fn opt_crop(&self, i: usize) -> Result<Option<CropSpec>, FilterError> {
        Ok(self.opt_text(i)?.map(|s| CropSpec::parse(&s)))
    }

    pub fn stored_file(&self, i: usize) -> Result<StoredFile, FilterError> {
        serde_json::from_value(self.required(i)?.clone())
            .map_err(|e| self.error(format!("argument {} must be a stored file: {e}", i + 1)))
    }

    /// Timestamp, ISO 8601 string, or `Y-m-d[ H:M:S]`. `None` when unparsable.
    pub fn time(&self, i: usize) -> Result<Option<DateTime<FixedOffset>>, FilterError> {
        Ok(time::parse_time(&self.text(i)?))
    }

    /// Loose truthiness: `null`, `false`, `0`, `""`, `"0"` and empty containers are false.
    pub fn truthy(&self, i: usize) -> bool {
        match self.values.get(i) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "0",
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }
}

/// Signature shared by all filters.
pub type Filter<B> = fn(&FilterContext<'_, B>, &FilterArgs<'_>) -> Result<Value, FilterError>;

/// Name-to-function table of template filters.
pub struct FilterRegistry<B: ImageBackend> {
    filters: BTreeMap<&'static str, Filter<B>>,
}

impl<B: ImageBackend> FilterRegistry<B> {
    pub fn empty() -> Self {
        Self {
            filters: BTreeMap::new(),
        }
    }

    /// Every built-in filter.
    pub fn standard() -> Self {
        Self::empty()
            .register("thumb", thumb::<B>)
            .register("fit", fit::<B>)
            .register("fitThumb", fit_thumb::<B>)
            .register("imgOffset", img_offset::<B>)
            .register("fileThumb", file_thumb::<B>)
            .register("imageDimensions", image_dimensions::<B>)
            .register("wrapParagraph", |_, a| Ok(text::wrap_paragraph(&a.text(0)?).into()))
            .register("truncate", truncate::<B>)
            .register("dayOfWeek", |_, a| {
                Ok(text::day_of_week(a.number(0)? as i64).into())
            })
            .register("timeAgoInWords", time_ago_in_words::<B>)
            .register("timeAgoShort", time_ago_short::<B>)
            .register("ifTrue", |_, a| {
                Ok(text::if_true(&a.text(0)?, a.truthy(1)).into())
            })
            .register("phone", |ctx, a| {
                let number = a.opt_text(0)?.unwrap_or_default();
                Ok(text::phone(&number, ctx.translator).into())
            })
            .register("zipCode", |_, a| Ok(text::zip_code(&a.text(0)?).into()))
            .register("number", number::<B>)
            .register("isodate", isodate::<B>)
            .register("tdate", tdate::<B>)
            .register("formatAmount", |_, a| {
                let decimals = a.opt_count(1)?.unwrap_or(0);
                Ok(text::format_amount(a.number(0)?, decimals).into())
            })
            .register("vocative", |ctx, a| {
                Ok(text::vocative(&a.text(0)?, ctx.translator).into())
            })
            .register("link", |_, a| Ok(text::link(&a.text(0)?).into()))
            .register("bool", |ctx, a| Ok(text::yes_no(a.truthy(0), ctx.translator).into()))
            .register("shortName", |_, a| Ok(text::short_name(&a.text(0)?).into()))
    }

    /// Add or replace a filter, builder-style.
    pub fn register(mut self, name: &'static str, filter: Filter<B>) -> Self {
        self.filters.insert(name, filter);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Run the filter `name` with positional `args`.
    pub fn apply(
        &self,
        name: &str,
        ctx: &FilterContext<'_, B>,
        args: &[Value],
    ) -> Result<Value, FilterError> {
        let (&name, filter) = self
            .filters
            .get_key_value(name)
            .ok_or_else(|| FilterError::Unknown(name.to_string()))?;
        tracing::debug!(filter = name, args = args.len(), "Applying filter");
        filter(ctx, &FilterArgs::new(name, args))
    }
}

// =========================================================================
// Image filters
// =========================================================================

fn thumb<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let outcome = ctx.derivatives.thumb(
        &a.text(0)?,
        a.dimension(1)?,
        a.opt_dimension(2)?,
        a.opt_crop(3)?,
    )?;
    Ok(outcome.url().into())
}

fn fit<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let outcome = ctx.derivatives.fit(
        &a.text(0)?,
        a.dimension(1)?,
        a.opt_dimension(2)?,
        a.opt_crop(3)?,
    )?;
    Ok(outcome.url().into())
}

fn fit_thumb<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let outcome =
        ctx.derivatives
            .fit_thumb(&a.text(0)?, a.dimension(1)?, a.dimension(2)?, a.opt_crop(3)?)?;
    Ok(outcome.url().into())
}

fn img_offset<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let crop = a.opt_crop(3)?;
    let padding = ctx.derivatives.image_offset(
        &a.text(0)?,
        a.dimension(1)?,
        a.opt_dimension(2)?,
        crop.as_ref(),
    );
    Ok(padding.map(|p| p.to_string()).unwrap_or_default().into())
}

fn file_thumb<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let file = a.stored_file(0)?;
    let outcome = ctx
        .derivatives
        .file_thumb(&file, a.dimension(1)?, a.opt_dimension(2)?)?;
    Ok(outcome.map_or(Value::Bool(false), |o| o.url().into()))
}

fn image_dimensions<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    Ok(ctx.derivatives.image_dimensions(&a.stored_file(0)?).into())
}

// =========================================================================
// Text and time filters
// =========================================================================

fn truncate<B: ImageBackend>(
    _: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let limit = a.opt_count(1)?.ok_or_else(|| a.error("missing limit"))?;
    let suffix = a.opt_text(2)?.unwrap_or_else(|| "…".to_string());
    Ok(text::truncate(&a.text(0)?, limit, &suffix).into())
}

fn number<B: ImageBackend>(
    _: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let decimals = a.opt_count(1)?.unwrap_or(0);
    let point = a.opt_text(2)?.unwrap_or_else(|| ".".to_string());
    let separator = a.opt_text(3)?.unwrap_or_else(|| " ".to_string());
    Ok(text::format_number(a.number(0)?, decimals, &point, &separator).into())
}

fn time_ago_in_words<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    Ok(match a.time(0)? {
        Some(then) => time::time_ago_in_words(then.to_utc(), ctx.now, ctx.translator).into(),
        None => Value::Bool(false),
    })
}

fn time_ago_short<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let phrase = a
        .time(0)?
        .and_then(|then| time::time_ago_short(then.to_utc(), ctx.now, ctx.translator));
    Ok(phrase.map_or(Value::Bool(false), Value::from))
}

fn parsed_time(a: &FilterArgs<'_>) -> Result<DateTime<FixedOffset>, FilterError> {
    a.time(0)?.ok_or_else(|| a.error("argument 1 is not a date"))
}

fn isodate<B: ImageBackend>(
    _: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    Ok(time::isodate(&parsed_time(a)?).into())
}

fn tdate<B: ImageBackend>(
    ctx: &FilterContext<'_, B>,
    a: &FilterArgs<'_>,
) -> Result<Value, FilterError> {
    let format = a.opt_text(1)?;
    time::tdate(&parsed_time(a)?, format.as_deref(), ctx.translator)
        .map(Value::from)
        .ok_or_else(|| a.error("invalid date format"))
}
