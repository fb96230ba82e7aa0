//! Text formatting helpers used by the template filters.

use crate::strings::czech_vocative;
use crate::translate::Translator;
use regex::Regex;
use std::sync::LazyLock;

/// Wrap in `<p>…</p>` unless the string already starts or ends with a paragraph tag.
pub fn wrap_paragraph(text: &str) -> String {
    if text.starts_with("<p>") || text.ends_with("</p>") {
        text.to_string()
    } else {
        format!("<p>{text}</p>")
    }
}

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>|&#?[a-zA-Z0-9]+;").expect("Invalid regex")
});

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate an HTML string to `limit` visible characters.
///
/// Tags do not count, entities count as one character, and tags left open
/// at the cut are closed. The suffix counts toward the limit when it fits.
///
/// ```
/// # use thumbsmith::text::truncate;
/// assert_eq!(truncate("<b>Hello world</b>", 6, "…"), "<b>Hello</b>…");
/// assert_eq!(truncate("short", 10, "…"), "short");
/// ```
pub fn truncate(html: &str, limit: usize, suffix: &str) -> String {
    if html.chars().count() <= limit {
        return html.to_string();
    }

    let suffix_len = suffix.chars().count();
    let limit = if limit >= suffix_len {
        limit - suffix_len
    } else {
        limit
    };

    let mut out = String::with_capacity(html.len());
    let mut printed = 0usize;
    let mut position = 0usize;
    let mut open_tags: Vec<String> = Vec::new();

    while printed < limit {
        let Some(caps) = TOKEN_RE.captures_at(html, position) else {
            break;
        };
        let Some(token) = caps.get(0) else {
            break;
        };

        let text = &html[position..token.start()];
        let text_len = text.chars().count();
        if printed + text_len > limit {
            out.push_str(take_chars(text, limit - printed));
            printed = limit;
            break;
        }
        out.push_str(text);
        printed += text_len;
        if printed >= limit {
            break;
        }

        let tag = token.as_str();
        if tag.starts_with('&') {
            out.push_str(tag);
            printed += 1;
        } else if let Some(name) = caps.get(1) {
            let name = name.as_str().to_ascii_lowercase();
            out.push_str(tag);
            if tag.starts_with("</") {
                if open_tags.last() == Some(&name) {
                    open_tags.pop();
                }
            } else if !tag.ends_with("/>") && !VOID_TAGS.contains(&name.as_str()) {
                open_tags.push(name);
            }
        }
        position = token.end();
    }

    if printed < limit && position < html.len() {
        out.push_str(take_chars(&html[position..], limit - printed));
    }

    while let Some(tag) = open_tags.pop() {
        out.push_str(&format!("</{tag}>"));
    }
    out.push_str(suffix);
    out
}

/// English day name; `1` is Monday. Out-of-range numbers give an empty string.
pub fn day_of_week(day: i64) -> &'static str {
    const DAYS: [&str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];
    let index = (day - 1) % 7;
    usize::try_from(index)
        .ok()
        .and_then(|i| DAYS.get(i))
        .copied()
        .unwrap_or("")
}

/// `text` when `condition` holds, else empty.
pub fn if_true(text: &str, condition: bool) -> &str {
    if condition { text } else { "" }
}

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{3})? ?(\d{3}) ?(\d{3}) ?(\d{3})$").expect("Invalid regex")
});

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3})(\d{2})$").expect("Invalid regex"));

/// Group a phone number into blocks of three; a leading `00` becomes `+`.
///
/// Empty input gives the translated placeholder `-`.
///
/// ```
/// # use thumbsmith::text::phone;
/// # use thumbsmith::translate::Catalog;
/// let t = Catalog::new("en");
/// assert_eq!(phone("00420123456789", &t), "+420 123 456 789");
/// assert_eq!(phone("123456789", &t), "123 456 789");
/// ```
pub fn phone(number: &str, translator: &dyn Translator) -> String {
    let number = match number.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => number.to_string(),
    };
    let formatted = PHONE_RE
        .replace(&number, "${1} ${2} ${3} ${4}")
        .trim()
        .to_string();
    if formatted.is_empty() {
        translator.translate("-", None)
    } else {
        formatted
    }
}

/// Czech zip code: `11000` → `110 00`.
pub fn zip_code(number: &str) -> String {
    ZIP_RE.replace(number, "${1} ${2}").trim().to_string()
}

/// Format a number with a decimal point and grouped thousands.
///
/// Rounds half away from zero to `decimals` places.
///
/// ```
/// # use thumbsmith::text::format_number;
/// assert_eq!(format_number(1234567.891, 2, ".", " "), "1 234 567.89");
/// assert_eq!(format_number(-1234.5, 0, ".", ","), "-1,235");
/// ```
pub fn format_number(value: f64, decimals: usize, dec_point: &str, thousands_sep: &str) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    let fixed = format!("{:.*}", decimals, rounded.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3 * thousands_sep.len());
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(thousands_sep);
        }
        grouped.push(*digit);
    }

    let mut out = String::new();
    if rounded < 0.0 {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push_str(dec_point);
        out.push_str(frac);
    }
    out
}

/// Money amount with Czech separators: `1234567` → `1 234 567`.
pub fn format_amount(amount: f64, decimals: usize) -> String {
    format_number(amount, decimals, ",", " ")
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Anchor pointing at `url` with the URL as its text.
pub fn link(url: &str) -> String {
    let escaped = escape_html(url);
    format!("<a href=\"{escaped}\">{escaped}</a>")
}

/// Translated `Yes` / `No`.
pub fn yes_no(value: bool, translator: &dyn Translator) -> String {
    translator.translate(if value { "Yes" } else { "No" }, None)
}

/// Vocative for Czech, the name unchanged for other languages.
pub fn vocative(name: &str, translator: &dyn Translator) -> String {
    if translator.lang() == "cs" {
        czech_vocative(name)
    } else {
        name.to_string()
    }
}

/// `"John Doe"` → `"John D."`.
pub fn short_name(name: &str) -> String {
    match name.split_once(' ') {
        Some((first, rest)) if !rest.is_empty() => {
            let initial: String = rest.chars().take(1).flat_map(char::to_uppercase).collect();
            format!("{first} {initial}.")
        }
        Some((first, _)) => first.to_string(),
        None => name.to_string(),
    }
}
