//! Helpers for reading typed data out of infobox field text.
//!
//! Infobox fields are wiki markup written by humans: references, templates,
//! links and thousands separators all show up in numeric fields.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn markup_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?s)<!--.*?-->", ""),
            (r"(?s)<ref[^>]*/>", ""),
            (r"(?s)<ref[^>]*>.*?</ref>", ""),
            (r"<br\s*/?>", " "),
            (r"<[^>]+>", ""),
            (r"\{\{\s*(?:nowrap|small|nobold)\s*\|([^{}]*)\}\}", "$1"),
            (r"\{\{[^{}]*\}\}", ""),
            (r"\[\[[^\]|]*\|([^\]]*)\]\]", "$1"),
            (r"\[\[([^\]]*)\]\]", "$1"),
            (r"&nbsp;", " "),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

const NUMBER: &str = r"([+\-−])?\s*((?:[A-Z]{1,3})?\$)?\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?(?:\s*((?i:thousand|million|billion|trillion))\b)?";

fn number_pattern() -> Option<&'static Regex> {
    static NUMBER_ANYWHERE: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER_ANYWHERE.get_or_init(|| Regex::new(NUMBER).ok()).as_ref()
}

fn leading_pattern() -> Option<&'static Regex> {
    static NUMBER_LEADING: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER_LEADING
        .get_or_init(|| Regex::new(&format!(r"^\s*{NUMBER}")).ok())
        .as_ref()
}

/// Strips references, comments, templates and links from a field value.
#[must_use]
pub fn strip_markup(raw: &str) -> String {
    let mut text = raw.to_string();
    for (re, replacement) in markup_patterns() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the cleaned text of a field, or `None` if nothing readable is left.
#[must_use]
pub fn text(raw: &str) -> Option<String> {
    let cleaned = strip_markup(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Reads the first number in `raw`, applying a trailing scale word.
///
/// `"$964.279 billion"` reads as `964_279_000_000`. When the scale covers the
/// fractional digits the result is computed in integers, so it is exact.
///
/// ```
/// use reality::parse::scaled_number;
///
/// assert_eq!(scaled_number("43,417,000<ref>INDEC</ref>"), Some(43_417_000.0));
/// assert_eq!(scaled_number("$964.279 billion"), Some(964_279_000_000.0));
/// assert_eq!(scaled_number("unknown"), None);
/// ```
#[must_use]
pub fn scaled_number(raw: &str) -> Option<f64> {
    let cleaned = strip_markup(raw);
    let caps = number_pattern()?.captures(&cleaned)?;
    magnitude(&caps)
}

/// A number read from the start of a text, with what surrounds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<'a> {
    /// The number, scale word applied.
    pub value: f64,
    /// Currency prefix such as `$` or `US$`, if any.
    pub currency: Option<&'a str>,
    /// Text after the number and its scale word, trimmed.
    pub rest: &'a str,
}

/// Reads a number that starts `text` (after an optional sign and currency
/// prefix). Markup is not stripped.
///
/// ```
/// use reality::parse::leading_number;
///
/// let reading = leading_number("US$1 million").unwrap();
/// assert_eq!(reading.value, 1_000_000.0);
/// assert_eq!(reading.currency, Some("US$"));
/// assert_eq!(reading.rest, "");
///
/// assert_eq!(leading_number("2,780,400 km²").unwrap().rest, "km²");
/// assert!(leading_number("about 5").is_none());
/// ```
#[must_use]
pub fn leading_number(text: &str) -> Option<Reading<'_>> {
    let caps = leading_pattern()?.captures(text)?;
    let end = caps.get(0)?.end();
    Some(Reading {
        value: magnitude(&caps)?,
        currency: caps.get(2).map(|m| m.as_str()),
        rest: text[end..].trim(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn magnitude(caps: &Captures<'_>) -> Option<f64> {
    let negative = caps.get(1).is_some_and(|m| m.as_str() != "+");
    let integer = caps.get(3)?.as_str().replace(',', "");
    let fraction = caps.get(4).map_or("", |m| m.as_str());
    let exponent: u32 = match caps.get(5).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("thousand") => 3,
        Some("million") => 6,
        Some("billion") => 9,
        Some("trillion") => 12,
        _ => 0,
    };

    let exact = u32::try_from(fraction.len())
        .ok()
        .filter(|&digits| digits <= exponent)
        .and_then(|digits| {
            let mantissa: u128 = format!("{integer}{fraction}").parse().ok()?;
            mantissa.checked_mul(10u128.checked_pow(exponent - digits)?)
        });

    let magnitude = match exact {
        Some(value) => value as f64,
        None => {
            let base: f64 = format!("{integer}.{}", if fraction.is_empty() { "0" } else { fraction })
                .parse()
                .ok()?;
            base * 10f64.powi(i32::try_from(exponent).ok()?)
        }
    };

    Some(if negative { -magnitude } else { magnitude })
}
