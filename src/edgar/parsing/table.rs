use once_cell::sync::Lazy;
use regex::Regex;

use super::patterns::ITEM_PHRASE;
use super::text::visible_text;

static TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<table\b.*?</table\s*>").unwrap());

/// Decides, per `<table>` block, whether it reads like prose or like numbers.
#[derive(Debug, Clone, Copy)]
pub struct TableClassifier {
    numeric_ratio_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredTables {
    pub text: String,
    pub kept: usize,
    pub dropped: usize,
}

impl TableClassifier {
    pub fn new(numeric_ratio_threshold: f64) -> Self {
        Self {
            numeric_ratio_threshold,
        }
    }

    /// `digits / (digits + letters)` over the visible text, `None` when the
    /// table has neither.
    pub fn numeric_ratio(visible: &str) -> Option<f64> {
        let digits = visible.chars().filter(|c| c.is_ascii_digit()).count();
        let letters = visible.chars().filter(|c| c.is_alphabetic()).count();
        if digits + letters == 0 {
            return None;
        }
        Some(digits as f64 / (digits + letters) as f64)
    }

    pub fn keep(&self, table_html: &str) -> bool {
        let visible = visible_text(table_html);
        if ITEM_PHRASE.is_match(&visible) {
            return true;
        }
        match Self::numeric_ratio(&visible) {
            Some(ratio) => ratio < self.numeric_ratio_threshold,
            None => false,
        }
    }

    /// Replaces every numeric-heavy table with empty text.
    pub fn filter_tables(&self, html: &str) -> FilteredTables {
        let mut kept = 0;
        let mut dropped = 0;
        let text = TABLE
            .replace_all(html, |caps: &regex::Captures| {
                let table = &caps[0];
                if self.keep(table) {
                    kept += 1;
                    table.to_string()
                } else {
                    dropped += 1;
                    String::new()
                }
            })
            .into_owned();

        log::debug!("Tables kept: {}, dropped: {}", kept, dropped);
        FilteredTables {
            text,
            kept,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cells: &[&str]) -> String {
        let cells: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<table><tr>{}</tr></table>", cells)
    }

    #[test]
    fn test_ratio_at_threshold_is_dropped() {
        let classifier = TableClassifier::new(0.10);
        assert_eq!(TableClassifier::numeric_ratio("abcdefghi1"), Some(0.1));
        assert!(!classifier.keep(&table(&["abcdefghi1"])));
        assert!(classifier.keep(&table(&["abcdefghij1"])));
    }

    #[test]
    fn test_empty_table_is_dropped() {
        let classifier = TableClassifier::new(0.10);
        assert!(!classifier.keep(&table(&["&nbsp;", "$", "%"])));
    }

    #[test]
    fn test_item_phrase_keeps_numeric_table() {
        let classifier = TableClassifier::new(0.10);
        let toc = table(&["Item 1.", "3", "Item 2.", "14", "Item 3.", "15"]);
        assert!(classifier.keep(&toc));
    }

    #[test]
    fn test_filter_tables() {
        let classifier = TableClassifier::new(0.10);
        let html = format!(
            "<p>Revenue grew.</p>{}<p>Outlook</p>{}",
            table(&["2023", "1,204", "2022", "1,113"]),
            table(&["The Company leases its headquarters."])
        );
        let filtered = classifier.filter_tables(&html);
        assert_eq!(filtered.kept, 1);
        assert_eq!(filtered.dropped, 1);
        assert!(!filtered.text.contains("1,204"));
        assert!(filtered.text.contains("headquarters"));
    }
}
