//! Text normalization helpers shared by the parsers and the clean stage

use regex::Regex;
use std::sync::LazyLock;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s.,!?;:()'"-]"#).unwrap());

/// Dedup form of a title: trimmed, with internal whitespace runs collapsed
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the first 19xx/20xx year in free text
///
/// # Examples
///
/// ```
/// use biblio_harvest::record::extract_year;
///
/// assert_eq!(extract_year("Aug 1, 1994 [EBook #158]"), Some(1994));
/// assert_eq!(extract_year("unknown"), None);
/// ```
pub fn extract_year(text: &str) -> Option<i64> {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Collapses whitespace, drops unusual symbols and trims
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    DISALLOWED_RE
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Removes HTML tags, leaving their text content
pub fn strip_markup(text: &str) -> String {
    MARKUP_RE.replace_all(text, "").into_owned()
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
