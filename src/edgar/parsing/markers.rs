use super::error::SegmentError;
use super::normalize::NormalizedDocument;
use super::patterns::{part_number, ITEM_HEADER, PART_HEADER};
use super::text::excerpt;
use super::types::{CandidateMarker, Diagnostic, DiscoveryStrategy};
use crate::edgar::items::{parse_designator, CanonicalItemSequence};

/// Raw discovery output, before any sequence validation.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub candidates: Vec<CandidateMarker>,
    pub diagnostics: Vec<Diagnostic>,
    /// Table-of-contents fragments with no matching anchor in the document.
    pub unresolved_anchors: Vec<String>,
}

/// A way of finding candidate item boundaries in a normalized document.
pub trait MarkerStrategy: Send + Sync {
    fn kind(&self) -> DiscoveryStrategy;

    fn discover(
        &self,
        document: &NormalizedDocument,
        sequence: &CanonicalItemSequence,
    ) -> Result<Discovery, SegmentError>;
}

/// Scans the text for item-header shaped runs.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    excerpt_radius: usize,
}

impl PatternStrategy {
    pub fn new(excerpt_radius: usize) -> Self {
        Self { excerpt_radius }
    }
}

impl MarkerStrategy for PatternStrategy {
    fn kind(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::Pattern
    }

    fn discover(
        &self,
        document: &NormalizedDocument,
        sequence: &CanonicalItemSequence,
    ) -> Result<Discovery, SegmentError> {
        let text = document.text.as_str();

        let parts: Vec<(usize, u8)> = PART_HEADER
            .captures_iter(text)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let part = part_number(caps.get(1)?.as_str())?;
                Some((start, part))
            })
            .collect();
        let mut saw_second_part = parts.iter().any(|(_, part)| *part >= 2);
        let mut part_events = parts.into_iter().peekable();
        let mut current_part = 1;

        let mut candidates = Vec::new();
        let mut pos = 0;
        while let Some(caps) = ITEM_HEADER.captures_at(text, pos) {
            let (Some(whole), Some(designator)) = (caps.get(0), caps.get(2)) else {
                break;
            };
            let letter = caps.get(3);
            let end = letter.map_or(designator.end(), |m| m.end());
            // The terminator may be the separator that opens the next header.
            pos = end;

            while let Some((_, part)) = part_events.next_if(|(at, _)| *at <= whole.start()) {
                current_part = part;
            }
            if let Some(hint) = caps.get(1).and_then(|m| part_number(m.as_str())) {
                current_part = hint;
                saw_second_part |= hint >= 2;
            }

            let Some(number) = parse_designator(designator.as_str()) else {
                continue;
            };
            let letter = letter.and_then(|m| m.as_str().chars().next());
            candidates.push(CandidateMarker {
                code: sequence.code_for(current_part, number, letter),
                start: whole.start(),
                end,
                strategy: DiscoveryStrategy::Pattern,
            });
        }

        log::debug!("Pattern strategy found {} candidate(s)", candidates.len());

        if sequence.is_two_part() && !candidates.is_empty() && !saw_second_part {
            return Err(SegmentError::PartBoundaryUnresolvable {
                excerpt: Some(excerpt(text, candidates[0].start, self.excerpt_radius)),
                position_map: candidates,
            });
        }

        Ok(Discovery {
            candidates,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::report::ReportType;

    fn document(text: &str) -> NormalizedDocument {
        NormalizedDocument {
            text: text.to_string(),
            tables_kept: 0,
            tables_dropped: 0,
        }
    }

    fn codes(discovery: &Discovery) -> Vec<&str> {
        discovery.candidates.iter().map(|c| c.code.as_str()).collect()
    }

    #[test]
    fn test_annual_candidates() {
        let sequence = CanonicalItemSequence::for_report(&ReportType::Form10K).unwrap();
        let text = "<p>Item 1. Business</p><p>We make widgets.</p>\
            <p>Item 1A. Risk Factors</p><p>Item 7 Management</p>\n\nITEM 7A: Market Risk";
        let discovery = PatternStrategy::new(50).discover(&document(text), sequence).unwrap();
        assert_eq!(codes(&discovery), vec!["item1", "item1a", "item7", "item7a"]);
        for candidate in &discovery.candidates {
            assert!(matches!(&text[candidate.start..candidate.start + 1], ">" | "\n"));
        }
    }

    #[test]
    fn test_quarterly_part_two_renumbered() {
        let sequence = CanonicalItemSequence::for_report(&ReportType::Form10Q).unwrap();
        let text = "<p>PART I</p><p>Item 1. Financial Statements</p><p>Item 2. MD&amp;A</p>\
            <p>PART II</p><p>Item 1. Legal Proceedings</p><p>Item 1A. Risk Factors</p>\
            <p>Part II, Item 6. Exhibits</p>";
        let discovery = PatternStrategy::new(50).discover(&document(text), sequence).unwrap();
        assert_eq!(
            codes(&discovery),
            vec!["item1", "item2", "item21", "item21a", "item26"]
        );
    }

    #[test]
    fn test_quarterly_without_part_two() {
        let sequence = CanonicalItemSequence::for_report(&ReportType::Form10Q).unwrap();
        let text = "<p>Item 1. Financial Statements</p><p>Item 2. MD&amp;A</p>";
        let err = PatternStrategy::new(50)
            .discover(&document(text), sequence)
            .unwrap_err();
        match err {
            SegmentError::PartBoundaryUnresolvable { position_map, .. } => {
                assert_eq!(position_map.len(), 2)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_adjacent_headers_on_consecutive_lines() {
        let sequence = CanonicalItemSequence::for_report(&ReportType::Form10K).unwrap();
        let discovery = PatternStrategy::new(50)
            .discover(&document("\nItem 1\nItem 2\nItem 3\n"), sequence)
            .unwrap();
        assert_eq!(codes(&discovery), vec!["item1", "item2", "item3"]);
    }
}
