use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::error::SegmentError;
use super::markers::{Discovery, MarkerStrategy};
use super::normalize::NormalizedDocument;
use super::patterns::{part_number, ITEM_LABEL, PART_LABEL};
use super::text::excerpt;
use super::types::{CandidateMarker, Diagnostic, DiagnosticKind, DiscoveryStrategy};
use crate::edgar::items::{parse_designator, CanonicalItemSequence};

/// Reads the linked table of contents and follows each row's fragment to the
/// header it points at.
#[derive(Debug, Clone)]
pub struct IndexStrategy {
    excerpt_radius: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TocRow {
    part: Option<u8>,
    item: Option<(u32, Option<char>)>,
    fragment: Option<String>,
}

impl TocRow {
    fn is_linked_item(&self) -> bool {
        self.item.is_some() && self.fragment.is_some()
    }
}

impl IndexStrategy {
    pub fn new(excerpt_radius: usize) -> Self {
        Self { excerpt_radius }
    }

    fn toc_rows(text: &str) -> Vec<TocRow> {
        let html = Html::parse_document(text);
        let Ok(table_selector) = Selector::parse("table") else {
            return Vec::new();
        };
        let Ok(row_selector) = Selector::parse("tr") else {
            return Vec::new();
        };
        let Ok(link_selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        for table in html.select(&table_selector) {
            let rows: Vec<TocRow> = table
                .select(&row_selector)
                .map(|row| toc_row(row, &link_selector))
                .collect();
            if rows.iter().filter(|r| r.is_linked_item()).count() >= 2 {
                return rows;
            }
        }
        Vec::new()
    }
}

fn toc_row(row: ElementRef, link_selector: &Selector) -> TocRow {
    let label = row.text().collect::<Vec<_>>().join(" ");
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");

    let part = PART_LABEL
        .captures(&label)
        .and_then(|caps| part_number(&caps[1]));
    let item = ITEM_LABEL.captures(&label).and_then(|caps| {
        let number = parse_designator(&caps[1])?;
        let letter = caps.get(2).and_then(|m| m.as_str().chars().next());
        Some((number, letter))
    });
    let fragment = row
        .select(link_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href.split_once('#').map(|(_, f)| f.trim().to_string()))
        .find(|f| !f.is_empty());

    TocRow {
        part,
        item,
        fragment,
    }
}

/// Offset of the `>` closing the tag whose `id` or `name` equals `fragment`.
fn find_anchor(text: &str, fragment: &str) -> Option<usize> {
    let pattern = format!(
        r#"<[^<>]*?\b(?i:id|name)[ \t\r\n]*=[ \t\r\n]*["']?{}["'\s/>]"#,
        regex::escape(fragment)
    );
    let target = Regex::new(&pattern).ok()?.find(text)?;
    text[target.start()..]
        .find('>')
        .map(|close| target.start() + close)
}

impl MarkerStrategy for IndexStrategy {
    fn kind(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::Index
    }

    fn discover(
        &self,
        document: &NormalizedDocument,
        sequence: &CanonicalItemSequence,
    ) -> Result<Discovery, SegmentError> {
        let text = document.text.as_str();
        let rows = Self::toc_rows(text);
        if rows.is_empty() {
            log::debug!("No linked table of contents found");
            return Ok(Discovery::default());
        }

        let mut discovery = Discovery::default();
        let mut current_part = 1;
        let mut saw_second_part = false;
        for row in rows {
            if let Some(part) = row.part {
                current_part = part;
                saw_second_part |= part >= 2;
            }
            let Some((number, letter)) = row.item else {
                continue;
            };
            let code = sequence.code_for(current_part, number, letter);

            let Some(fragment) = row.fragment else {
                discovery.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnanchoredRow,
                    None,
                    format!("table of contents row for {} has no link", code),
                ));
                continue;
            };

            match find_anchor(text, &fragment) {
                Some(start) => discovery.candidates.push(CandidateMarker {
                    code,
                    start,
                    end: start + 1,
                    strategy: DiscoveryStrategy::Index,
                }),
                None => {
                    log::debug!("Anchor #{} for {} not found", fragment, code);
                    discovery.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnresolvedAnchor,
                        None,
                        format!("anchor #{} for {} not found in document", fragment, code),
                    ));
                    discovery.unresolved_anchors.push(fragment);
                }
            }
        }

        log::debug!(
            "Index strategy resolved {} anchor(s), {} unresolved",
            discovery.candidates.len(),
            discovery.unresolved_anchors.len()
        );

        if sequence.is_two_part() && !discovery.candidates.is_empty() && !saw_second_part {
            return Err(SegmentError::PartBoundaryUnresolvable {
                excerpt: Some(excerpt(
                    text,
                    discovery.candidates[0].start,
                    self.excerpt_radius,
                )),
                position_map: discovery.candidates,
            });
        }

        Ok(discovery)
    }
}
