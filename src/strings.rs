//! String and file-name utilities.
//!
//! - [`czech_vocative`]: Czech first names from nominative to vocative.
//! - [`cyrillic_to_latin`]: GOST 16876-71 transliteration.
//! - [`replace_links`]: wrap bare URLs and e-mail addresses in anchors.
//! - [`action_to_path`] / [`path_to_action`]: `camelCase` ↔ `dashed-path`.
//! - [`webalize`], [`prepare_filename`], [`unique_filename`]: safe file names.
//! - [`directory_size`]: total bytes under a directory.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Characters `rawurlencode` leaves alone.
const RAW_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Convert a Czech first name in nominative to vocative.
///
/// ```
/// # use thumbsmith::strings::czech_vocative;
/// assert_eq!(czech_vocative("Petr"), "Petře");
/// assert_eq!(czech_vocative("Zdeněk"), "Zdeňku");
/// assert_eq!(czech_vocative("Martina"), "Martino");
/// ```
pub fn czech_vocative(name: &str) -> String {
    let Some(last) = name.chars().last() else {
        return String::new();
    };
    let stripped = &name[..name.len() - last.len_utf8()];

    match last {
        'r' => {
            if name.ends_with("or") || name.ends_with("ír") {
                format!("{name}e")
            } else if name.ends_with("ar") {
                name.to_string()
            } else {
                format!("{stripped}ře")
            }
        }
        'd' | 'f' | 'm' | 't' | 'v' | 'p' | 'b' | 'n' => {
            if name.ends_with("en") {
                format!("{name}o")
            } else {
                format!("{name}e")
            }
        }
        'j' => format!("{name}i"),
        'k' => {
            if let Some(base) = name.strip_suffix("něk") {
                format!("{base}ňku")
            } else if let Some(base) = name.strip_suffix("ek") {
                format!("{base}ku")
            } else {
                format!("{name}u")
            }
        }
        'l' => {
            if name.ends_with("iel") || name.ends_with("cel") {
                format!("{stripped}li")
            } else if let Some(base) = name.strip_suffix("el") {
                format!("{base}le")
            } else {
                format!("{name}e")
            }
        }
        'š' => format!("{stripped}ši"),
        'a' => match name.strip_suffix("ia") {
            Some(base) => format!("{base}ie"),
            None => format!("{stripped}o"),
        },
        _ => name.to_string(),
    }
}

fn cyrillic_char(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "jo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "jj",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shh",
        'ъ' | 'ь' | 'Ъ' | 'Ь' => "",
        'ы' => "y",
        'э' => "eh",
        'ю' => "ju",
        'я' => "ja",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ё' => "JO",
        'Ж' => "ZH",
        'З' => "Z",
        'И' => "I",
        'Й' => "JJ",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "KH",
        'Ц' => "C",
        'Ч' => "CH",
        'Ш' => "SH",
        'Щ' => "SHH",
        'Ы' => "Y",
        'Э' => "EH",
        'Ю' => "JU",
        'Я' => "JA",
        _ => return None,
    };
    Some(latin)
}

/// Transliterate Cyrillic to Latin (GOST 16876-71). Other characters pass through.
///
/// A combining acute accent (stress mark) after `е`/`о` is dropped.
pub fn cyrillic_to_latin(text: &str) -> String {
    const STRESS: char = '\u{301}';
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match cyrillic_char(c) {
            Some(latin) => {
                out.push_str(latin);
                if matches!(c, 'е' | 'о' | 'Е' | 'О') && chars.peek() == Some(&STRESS) {
                    chars.next();
                }
            }
            None => out.push(c),
        }
    }
    out
}

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(.{0,6})\b((?:[a-z][\w-]+:(?:/{1,3}|[a-z0-9%])|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’]))"#,
    )
    .expect("Invalid regex")
});

static WWW_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a href="www\."#).expect("Invalid regex"));

static EMAIL_IN_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([^ ]?)([^ <>]{0,7})(\w[-._\w]*\w@\w[-._\w]*\w\.\w{2,4})")
        .expect("Invalid regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w[-._\w]*\w@\w[-._\w]*\w\.\w{2,4})").expect("Invalid regex")
});

/// Shortest text that can hold an anchor: `<a href="mailto:a@b.c">`.
const MIN_ANCHOR_LEN: usize = 22;

/// Wrap bare URLs and e-mail addresses in anchors.
///
/// URLs already inside `href="..."` are left alone. `www.` links get an
/// `http://` scheme. Addresses already in a `mailto:` link or directly after
/// a tag are left alone.
pub fn replace_links(text: &str) -> String {
    let linked = URL_RE.replace_all(text, |caps: &Captures| {
        if &caps[1] == "href=\"" {
            caps[0].to_string()
        } else {
            format!("{}<a href=\"{}\">{}</a>", &caps[1], &caps[2], &caps[2])
        }
    });
    let linked = WWW_HREF_RE.replace_all(&linked, "<a href=\"http://www.");

    if linked.chars().count() > MIN_ANCHOR_LEN {
        EMAIL_IN_TEXT_RE
            .replace_all(&linked, |caps: &Captures| {
                if &caps[2] == "mailto:" || &caps[1] == ">" {
                    caps[0].to_string()
                } else {
                    format!("<a href=\"mailto:{}\">{}</a>", &caps[0], &caps[0])
                }
            })
            .into_owned()
    } else {
        EMAIL_RE
            .replace_all(&linked, "<a href=\"mailto:$1\">$1</a>")
            .into_owned()
    }
}

/// `camelCase` action name to a dashed, URL-encoded path segment.
///
/// ```
/// # use thumbsmith::strings::action_to_path;
/// assert_eq!(action_to_path("showDetail", "-"), "show-detail");
/// assert_eq!(action_to_path("Admin:userList", "-"), "admin.user-list");
/// ```
pub fn action_to_path(action: &str, delimiter: &str) -> String {
    let mut dashed = String::with_capacity(action.len() + 4);
    for (i, c) in action.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            dashed.push_str(delimiter);
        }
        dashed.push(c);
    }
    let dashed = dashed
        .replace(':', ".")
        .replace(&format!(".{delimiter}"), ".")
        .to_lowercase();
    utf8_percent_encode(&dashed, RAW_URL).to_string()
}

/// Dashed path segment back to a `camelCase` action name.
///
/// ```
/// # use thumbsmith::strings::path_to_action;
/// assert_eq!(path_to_action("show-detail"), "showDetail");
/// ```
pub fn path_to_action(path: &str) -> String {
    let lower = path.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut capitalize = false;
    let mut chars = lower.chars().peekable();
    while let Some(c) = chars.next() {
        let dash_before_letter = c == '-' && chars.peek().is_some_and(char::is_ascii_lowercase);
        if dash_before_letter || c == ' ' {
            capitalize = true;
            continue;
        }
        if capitalize {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// ASCII slug: transliterated, lowercased, non-alphanumerics collapsed to `-`.
///
/// ```
/// # use thumbsmith::strings::webalize;
/// assert_eq!(webalize("Žluťoučký kůň!"), "zlutoucky-kun");
/// ```
pub fn webalize(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Sanitize an upload name to `[a-z0-9_]` plus a lowercase extension.
///
/// With a target directory the name is made unique there (see
/// [`unique_filename`]).
pub fn prepare_filename(filename: &str, dir: Option<&Path>, delimiter: &str) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem.replace('.', "_"), ext.to_lowercase()),
        None => (String::new(), filename.to_lowercase()),
    };
    let safe = format!("{}.{}", webalize(&stem).replace('-', "_"), ext);
    match dir {
        Some(dir) => unique_filename(&dir.join(&safe), delimiter),
        None => safe,
    }
}

/// File name for `path` that does not exist yet in its directory.
///
/// Returns the original name when it is free, else appends
/// `{delimiter}{n}` to the stem with the smallest free `n >= 1`.
pub fn unique_filename(path: &Path, delimiter: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !path.exists() {
        return name;
    }
    let dir = path.parent().unwrap_or(Path::new(""));
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (name.clone(), String::new()),
    };
    (1u64..)
        .map(|i| format!("{stem}{delimiter}{i}{ext}"))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or(name)
}

/// Total size in bytes of all files under `path`. Zero when it is not a directory.
pub fn directory_size(path: &Path) -> u64 {
    if !path.is_dir() {
        return 0;
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // czech_vocative
    // =========================================================================

    #[test]
    fn vocative_rules() {
        let cases = [
            ("Igor", "Igore"),
            ("Vladimír", "Vladimíre"),
            ("Dagmar", "Dagmar"),
            ("Petr", "Petře"),
            ("Radim", "Radime"),
            ("Milan", "Milane"),
            ("Josef", "Josefe"),
            ("Ellen", "Elleno"),
            ("Ondřej", "Ondřeji"),
            ("Zdeněk", "Zdeňku"),
            ("Vítek", "Vítku"),
            ("Dominik", "Dominiku"),
            ("Daniel", "Danieli"),
            ("Marcel", "Marceli"),
            ("Karel", "Karle"),
            ("Bill", "Bille"),
            ("Matouš", "Matouši"),
            ("Anastazia", "Anastazie"),
            ("Martina", "Martino"),
            ("Jiří", "Jiří"),
        ];
        for (nominative, vocative) in cases {
            assert_eq!(czech_vocative(nominative), vocative, "{nominative}");
        }
    }

    #[test]
    fn vocative_empty() {
        assert_eq!(czech_vocative(""), "");
    }

    // =========================================================================
    // cyrillic_to_latin
    // =========================================================================

    #[test]
    fn transliterates_gost() {
        assert_eq!(cyrillic_to_latin("Москва"), "Moskva");
        assert_eq!(cyrillic_to_latin("щука и ёж"), "shhuka i jozh");
        assert_eq!(cyrillic_to_latin("объект"), "obekt");
    }

    #[test]
    fn drops_stress_mark() {
        assert_eq!(cyrillic_to_latin("мо\u{301}ре"), "more");
    }

    #[test]
    fn latin_passes_through() {
        assert_eq!(cyrillic_to_latin("abc 123"), "abc 123");
    }

    // =========================================================================
    // replace_links
    // =========================================================================

    #[test]
    fn links_plain_url() {
        assert_eq!(
            replace_links("see http://example.com/page now"),
            "see <a href=\"http://example.com/page\">http://example.com/page</a> now"
        );
    }

    #[test]
    fn links_www_gets_scheme() {
        assert_eq!(
            replace_links("go to www.example.com"),
            "go to <a href=\"http://www.example.com\">www.example.com</a>"
        );
    }

    #[test]
    fn existing_href_untouched() {
        let html = "<a href=\"http://example.com/\">x</a>";
        assert_eq!(replace_links(html), html);
    }

    #[test]
    fn links_email_in_long_text() {
        assert_eq!(
            replace_links("write to me at john@example.com please"),
            "write to me at <a href=\"mailto:john@example.com\">john@example.com</a> please"
        );
    }

    #[test]
    fn links_email_in_short_text() {
        assert_eq!(
            replace_links("jo@example.com"),
            "<a href=\"mailto:jo@example.com\">jo@example.com</a>"
        );
    }

    // =========================================================================
    // action / path
    // =========================================================================

    #[test]
    fn action_path_roundtrip() {
        assert_eq!(action_to_path("userProfileEdit", "-"), "user-profile-edit");
        assert_eq!(path_to_action("user-profile-edit"), "userProfileEdit");
    }

    #[test]
    fn action_to_path_encodes() {
        assert_eq!(action_to_path("a b", "-"), "a%20b");
    }

    #[test]
    fn path_to_action_keeps_dash_before_digit() {
        assert_eq!(path_to_action("page-2"), "page-2");
    }

    // =========================================================================
    // File names
    // =========================================================================

    #[test]
    fn webalize_collapses_separators() {
        assert_eq!(webalize("  Hello,   World  "), "hello-world");
        assert_eq!(webalize("Příliš žluťoučký"), "prilis-zlutoucky");
    }

    #[test]
    fn prepare_filename_sanitizes() {
        assert_eq!(
            prepare_filename("Moje Fotka.final.JPG", None, ""),
            "moje_fotka_final.jpg"
        );
    }

    #[test]
    fn prepare_filename_in_dir_is_unique() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"").unwrap();
        assert_eq!(
            prepare_filename("Photo.jpg", Some(tmp.path()), "-"),
            "photo-1.jpg"
        );
    }

    #[test]
    fn unique_filename_counts_up() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        assert_eq!(unique_filename(&path, ""), "a.txt");

        fs::write(&path, b"").unwrap();
        fs::write(tmp.path().join("a1.txt"), b"").unwrap();
        assert_eq!(unique_filename(&path, ""), "a2.txt");
    }

    #[test]
    fn directory_size_sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
        fs::write(tmp.path().join("a.bin"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("sub/b.bin"), [0u8; 20]).unwrap();
        fs::write(tmp.path().join("sub/deeper/c.bin"), [0u8; 5]).unwrap();
        assert_eq!(directory_size(tmp.path()), 35);
    }

    #[test]
    fn directory_size_of_missing_dir_is_zero() {
        assert_eq!(directory_size(Path::new("/nonexistent/dir")), 0);
    }
}
