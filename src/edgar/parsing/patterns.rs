//! Item and part header shapes shared by discovery, classification and
//! cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

/// An item header at the start of a text run: after a tag close or a newline,
/// optionally qualified by its part, possibly split by tags between the
/// keyword and the designator.
///
/// Groups: 1 part hint, 2 designator, 3 sub-letter.
pub static ITEM_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)[>\n][ \t\r]*",
        r"(?:part[ \t\r\n]+(iv|iii|ii|i|[1-4])\b[ \t\r\n]*[,.:\-]?[ \t\r\n]*(?:<[^>]*>[ \t\r\n]*)*)?",
        r"items?(?:[ \t\r\n]|<[^>]*>)*",
        r"(\d{1,2}|[ivx]{1,5})(?:[ \t]*([ab]))?",
        r"(?:[.:<\-\s]|$)",
    ))
    .unwrap()
});

/// A part header at the start of a text run. Group 1 is the part number.
pub static PART_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[>\n][ \t\r]*part[ \t\r\n]*(?:<[^>]*>[ \t\r\n]*)*(iv|iii|ii|i|[1-4])\b").unwrap()
});

/// Any item phrase in visible text.
pub static ITEM_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bitems?\s+(?:\d{1,2}|[ivx]{1,5})\s*[ab]?\b").unwrap());

/// Part label inside a table-of-contents row.
pub static PART_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpart\s+(iv|iii|ii|i|[1-4])\b").unwrap());

/// Item label inside a table-of-contents row. Groups: 1 designator, 2 letter.
pub static ITEM_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bitems?\s*(\d{1,2}|[ivx]{1,5})(?:[ \t]*([ab]))?(?:[\s.:\-]|$)").unwrap()
});

/// The label opening a section's visible text, with an optional part prefix.
pub static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:part\s+(?:iv|iii|ii|i|[1-4])\b[\s,.:\-]*",
        r"(?:(?:financial|other)\s+information\b[\s,.:\-]*)?)?",
        r"items?\s*(\d{1,2}|[ivx]{1,5})(?:[ \t]*([ab]))?(?:[\s.:\-]+|$)",
    ))
    .unwrap()
});

pub fn part_number(raw: &str) -> Option<u8> {
    match raw.to_ascii_lowercase().as_str() {
        "i" | "1" => Some(1),
        "ii" | "2" => Some(2),
        "iii" | "3" => Some(3),
        "iv" | "4" => Some(4),
        _ => None,
    }
}

pub fn trim_separators(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ':' | '-' | ','))
}
