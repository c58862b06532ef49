//! Text normalisation shared by every extractor.
//!
//! Output of [`clean`] is plain printable ASCII with single spaces. This drops
//! accented and non-Latin characters; sources in other languages would need a
//! wider character filter.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Node};

/// Elements whose text never reaches the output.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Naive date-time layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Strip markup, scripts and styles from `raw` and normalise the remaining text.
///
/// `raw` is read as HTML, so entities are decoded. Text that was already
/// extracted must go through [`normalize_text`] instead.
pub fn clean(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(raw);
    normalize_text(&visible_text(fragment.root_element()))
}

/// Text of `element` and its descendants, skipping script-like elements.
/// Runs of whitespace are collapsed; other characters are kept as-is.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        if let Node::Text(chunk) = node.value() {
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if !hidden {
                text.push_str(chunk);
                text.push(' ');
            }
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace everything outside printable ASCII with spaces, collapse runs of
/// whitespace and trim.
pub fn normalize_text(text: &str) -> String {
    let printable: String = text
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { ' ' })
        .collect();
    printable.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the date formats news sites commonly publish.
///
/// Returns `None` when nothing matches; the caller picks the fallback.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
