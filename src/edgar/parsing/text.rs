use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

use super::patterns::{self, LEADING_LABEL};
use crate::edgar::items::parse_designator;

static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<br\b[^>]*>|</?(?:p|div|tr|li|ul|ol|h[1-6]|table|tbody|thead|tfoot|caption|blockquote|pre|center|title|body|html|dl|dt|dd)\b[^>]*>",
    )
    .unwrap()
});
static CELL_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static TRAILING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*$").unwrap());
static LEADING_PARTIAL_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^<>]*>").unwrap());

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:-\s*)?(?:page\s+)?\d{1,3}(?:\s*-)?$").unwrap());
static TOC_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\d{1,3}\s+)?(?:(?:back|return)\s+to\s+)?(?:table of contents|index)$")
        .unwrap()
});
static PART_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^part\s+(?:iv|iii|ii|i|[1-4])\b[\s.:\-]*(?:(?:financial|other)\s+information)?[\s.]*$",
    )
    .unwrap()
});

/// Removes markup, keeping block structure as line breaks and cell
/// boundaries as spaces. Entities left in the text are decoded last.
pub fn strip_tags(html: &str) -> String {
    let text = BLOCK_BREAK.replace_all(html, "\n");
    let text = CELL_CLOSE.replace_all(&text, " ");
    let text = TAG.replace_all(&text, "");
    // Spans end on the `>` of the next marker, which can leave its tag open.
    let text = TRAILING_TAG.replace(&text, "");
    decode_html_entities(&text).into_owned()
}

/// Tag-free text with all whitespace runs collapsed to one space.
pub fn visible_text(html: &str) -> String {
    strip_tags(html).split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn stripped_len(html: &str) -> usize {
    visible_text(html).chars().count()
}

/// Visible text within `radius` bytes of `offset`, for failure records.
pub fn excerpt(text: &str, offset: usize, radius: usize) -> String {
    let mut start = offset.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = offset.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    let window = LEADING_PARTIAL_TAG.replace(&text[start..end], "");
    visible_text(&window)
}

/// Produces the final section text for the span of `code`.
pub fn clean_section_text(html: &str, code: &str) -> String {
    let stripped = strip_tags(html);
    let lines = stripped
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .filter(|line| !PAGE_NUMBER.is_match(line))
        .filter(|line| !TOC_BANNER.is_match(line))
        .filter(|line| !PART_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n");

    remove_leading_label(&lines, code)
}

fn remove_leading_label(text: &str, code: &str) -> String {
    let Some(caps) = LEADING_LABEL.captures(text) else {
        return text.to_string();
    };
    let Some(number) = caps.get(1).and_then(|m| parse_designator(m.as_str())) else {
        return text.to_string();
    };
    let letter = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();

    let label = format!("item{}{}", number, letter);
    let renumbered = format!("item2{}{}", number, letter);
    if code != label && code != renumbered {
        return text.to_string();
    }

    let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
    patterns::trim_separators(rest).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_keeps_block_structure() {
        let html = "<p>Risk <b>one</b></p><div>Risk two</div><table><tr><td>a</td><td>b</td></tr></table>";
        let text = strip_tags(html);
        assert!(text.contains("Risk one\n"));
        assert!(text.contains("Risk two"));
        assert!(text.contains("a b"));
    }

    #[test]
    fn test_strip_tags_drops_unterminated_tail() {
        assert_eq!(strip_tags("Legal proceedings.<a name=\"i2\"></a"), "Legal proceedings.");
    }

    #[test]
    fn test_entities_decoded_after_stripping() {
        assert_eq!(visible_text("<p>AT&amp;T &lt;b&gt;</p>"), "AT&T <b>");
    }

    #[test]
    fn test_excerpt_is_char_boundary_safe() {
        let text = "<p>caf\u{e9} caf\u{e9} caf\u{e9}</p>";
        for offset in 0..text.len() {
            let _ = excerpt(text, offset, 3);
        }
        assert_eq!(excerpt("<p class=\"x\">Item 1</p>", 12, 100), "Item 1");
        assert_eq!(excerpt("s=\"x\">Item 1</p>", 0, 100), "Item 1");
    }

    #[test]
    fn test_clean_section_text() {
        let html = "<p>Item 1A. Risk Factors</p>\
            <p>Our business is risky.</p>\
            <p>12</p>\
            <p>Table of Contents</p>\
            <p>PART II</p>\
            <p>Competition is intense.</p>";
        assert_eq!(
            clean_section_text(html, "item1a"),
            "Risk Factors\nOur business is risky.\nCompetition is intense."
        );
    }

    #[test]
    fn test_label_removed_only_for_own_code() {
        let html = "<p>Item 2. Properties</p><p>We lease offices.</p>";
        assert_eq!(clean_section_text(html, "item2"), "Properties\nWe lease offices.");
        assert_eq!(clean_section_text(html, "item22"), "Properties\nWe lease offices.");
        assert_eq!(
            clean_section_text(html, "item1a"),
            "Item 2. Properties\nWe lease offices."
        );
    }

    #[test]
    fn test_label_with_part_prefix() {
        let html = "<p>PART II - OTHER INFORMATION Item 1. Legal Proceedings</p><p>None.</p>";
        assert_eq!(clean_section_text(html, "item21"), "Legal Proceedings\nNone.");
    }
}
