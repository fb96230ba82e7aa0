//! Relative and formatted dates.
//!
//! Relative phrases ("5 minutes ago", "in a month") are built from English
//! message keys and passed through the [`Translator`], so a catalog can
//! localize them. Thresholds are in minutes:
//!
//! | Minutes | Phrase |
//! |---|---|
//! | < 45 | minutes |
//! | < 90 | an hour |
//! | < 1440 | hours |
//! | < 40320 | days (`yesterday` / `tomorrow` one calendar day apart) |
//! | < 86400 | a month |
//! | < 525600 | months |
//! | < 787620 | a year |
//! | otherwise | years |

use crate::translate::Translator;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Default `tdate` format: `5.3.2024 14:07`.
pub const DEFAULT_DATE_FORMAT: &str = "%-d.%-m.%Y %H:%M";

/// Parse a timestamp, RFC 3339 / ISO 8601 string, `Y-m-d H:M:S`, or `Y-m-d`.
///
/// Naive values are taken as UTC.
pub fn parse_time(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn say(t: &dyn Translator, message: &str, arg: Option<i64>) -> String {
    t.translate(message, arg.map(|n| n.to_string()).as_deref())
}

fn div_round(value: i64, by: i64) -> i64 {
    (value as f64 / by as f64).round() as i64
}

/// Relative time in words, e.g. `"5 minutes ago"` or `"in 2 days"`.
pub fn time_ago_in_words(then: DateTime<Utc>, now: DateTime<Utc>, t: &dyn Translator) -> String {
    let delta = now.timestamp() - then.timestamp();
    let days = (i64::from(now.ordinal0()) - i64::from(then.ordinal0())).abs();

    if delta < 0 {
        let minutes = div_round(-delta, 60);
        return match minutes {
            1 => say(t, "in a minute", None),
            m if m < 45 => say(t, "in %s minutes", Some(m)),
            m if m < 90 => say(t, "in an hour", None),
            m if m < 1440 => say(t, "in %s hours", Some(div_round(m, 60))),
            m if days == 1 && m < 40320 => say(t, "tomorrow", None),
            m if m < 40320 => say(t, "in %s days", Some(div_round(m, 1440))),
            m if m < 86400 => say(t, "in a month", None),
            m if m < 525600 => say(t, "in %s months", Some(div_round(m, 43200))),
            m if m < 787620 => say(t, "in a year", None),
            m => say(t, "in %s years", Some(div_round(m, 525960))),
        };
    }

    match div_round(delta, 60) {
        0 => say(t, "just now", None),
        1 => say(t, "a minute ago", None),
        m if m < 45 => say(t, "%s minutes ago", Some(m)),
        m if m < 90 => say(t, "an hour ago", None),
        m if m < 1440 => say(t, "%s hours ago", Some(div_round(m, 60))),
        m if days == 1 && m < 40320 => say(t, "yesterday", None),
        m if m < 40320 => say(t, "%s days ago", Some(div_round(m, 1440))),
        m if m < 86400 => say(t, "a month ago", None),
        m if m < 525600 => say(t, "%s months ago", Some(div_round(m, 43200))),
        m if m < 787620 => say(t, "a year ago", None),
        m => say(t, "%s years ago", Some(div_round(m, 525960))),
    }
}

/// Compact relative time for past moments (`now`, `5m`, `3h`, `2d`, `1y`).
///
/// Returns `None` for moments in the future.
pub fn time_ago_short(
    then: DateTime<Utc>,
    now: DateTime<Utc>,
    t: &dyn Translator,
) -> Option<String> {
    let delta = now.timestamp() - then.timestamp();
    if delta < 0 {
        return None;
    }
    let days = delta / 86_400;

    let phrase = match div_round(delta, 60) {
        0 => say(t, "now", None),
        1 => say(t, "1m", None),
        m if m < 45 => say(t, "%sm", Some(m)),
        m if m < 90 => say(t, "1h", None),
        m if m < 1440 => say(t, "%sh", Some(div_round(m, 60))),
        _ if days == 1 => say(t, "1d", None),
        _ if days < 31 => say(t, "%sd", Some(days)),
        _ if days < 62 => say(t, "1m", None),
        _ if days < 365 => say(t, "%sm", Some(div_round(days, 31))),
        m if m < 787620 => say(t, "1y", None),
        m => say(t, "%sy", Some((m as f64 / 525960.0).ceil() as i64)),
    };
    Some(phrase)
}

/// ISO 8601 with a numeric offset, e.g. `2024-03-05T14:07:00+0100`.
pub fn isodate(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

/// Format with a translatable strftime pattern.
///
/// The pattern (default [`DEFAULT_DATE_FORMAT`]) is itself looked up in the
/// catalog, so each language can use its own date layout. Returns `None`
/// when the translated pattern is not valid strftime.
pub fn tdate(
    date: &DateTime<FixedOffset>,
    format: Option<&str>,
    t: &dyn Translator,
) -> Option<String> {
    let pattern = t.translate(format.unwrap_or(DEFAULT_DATE_FORMAT), None);
    if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
        tracing::warn!(pattern = %pattern, "Invalid date format");
        return None;
    }
    Some(date.format(&pattern).to_string())
}
