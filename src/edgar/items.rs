//! Canonical item orderings per form family.
//!
//! Quarterly reports restart item numbering in Part II, so their Part II items
//! are renumbered onto a disjoint range (`Item 1A` of Part II becomes
//! `item21a`, `Item 6` becomes `item26`). That keeps one flat total order per
//! form and lets the resolver compare any two codes by index.

use serde::Serialize;

use super::report::ReportType;

const ANNUAL_ITEMS: &[&str] = &[
    "item1", "item1a", "item1b", "item1c", "item2", "item3", "item4", "item5", "item6", "item7",
    "item7a", "item8", "item9", "item9a", "item9b", "item9c", "item10", "item11", "item12",
    "item13", "item14", "item15", "item16",
];

const QUARTERLY_ITEMS: &[&str] = &[
    "item1", "item2", "item3", "item4", "item21", "item21a", "item22", "item23", "item24",
    "item25", "item26",
];

static ANNUAL: CanonicalItemSequence = CanonicalItemSequence {
    family: FormFamily::Annual,
    codes: ANNUAL_ITEMS,
    required: &["item1"],
};

static QUARTERLY: CanonicalItemSequence = CanonicalItemSequence {
    family: FormFamily::Quarterly,
    codes: QUARTERLY_ITEMS,
    required: &["item1", "item21"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFamily {
    Annual,
    Quarterly,
}

#[derive(Debug)]
pub struct CanonicalItemSequence {
    family: FormFamily,
    codes: &'static [&'static str],
    required: &'static [&'static str],
}

impl CanonicalItemSequence {
    pub fn for_report(report_type: &ReportType) -> Option<&'static CanonicalItemSequence> {
        if report_type.is_annual() {
            Some(&ANNUAL)
        } else if report_type.is_quarterly() {
            Some(&QUARTERLY)
        } else {
            None
        }
    }

    pub fn family(&self) -> FormFamily {
        self.family
    }

    pub fn is_two_part(&self) -> bool {
        self.family == FormFamily::Quarterly
    }

    pub fn first(&self) -> &'static str {
        self.codes[0]
    }

    /// Codes that must survive resolution for the document to count as parsed.
    pub fn required(&self) -> &'static [&'static str] {
        self.required
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|c| *c == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index_of(code).is_some()
    }

    /// Builds the flat item code for a designator found in `part`.
    ///
    /// `number` is the arabic item number and `letter` the optional sub-letter.
    /// Only two-part forms renumber; annual items are unique across parts.
    pub fn code_for(&self, part: u8, number: u32, letter: Option<char>) -> String {
        let letter = letter
            .map(|c| c.to_ascii_lowercase().to_string())
            .unwrap_or_default();
        if self.is_two_part() && part >= 2 {
            format!("item2{}{}", number, letter)
        } else {
            format!("item{}{}", number, letter)
        }
    }
}

/// Parses an item designator: arabic digits or a small roman numeral.
pub fn parse_designator(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse().ok().filter(|n| *n > 0);
    }
    parse_roman(raw)
}

fn parse_roman(raw: &str) -> Option<u32> {
    const ROMANS: &[&str] = &[
        "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv",
        "xv", "xvi",
    ];
    let lower = raw.to_ascii_lowercase();
    ROMANS
        .iter()
        .position(|r| *r == lower)
        .map(|i| i as u32 + 1)
}
