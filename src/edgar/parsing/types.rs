use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::error::{FailureReason, SegmentError};
use super::header;
use crate::edgar::report::ReportType;

const ARCHIVES_BASE: &str = "https://www.sec.gov/Archives/edgar/data";

/// Identifying metadata carried alongside every outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub cik: Option<String>,
    pub accession_number: Option<String>,
    pub company_name: Option<String>,
    pub form_type: Option<String>,
    pub filed_as_of: Option<NaiveDate>,
    pub document_filename: Option<String>,
}

impl FilingMetadata {
    /// Location of the primary document in the EDGAR archive, when the
    /// header and envelope gave us enough to build it.
    pub fn archive_url(&self) -> Option<String> {
        let cik = self.cik.as_deref()?.trim_start_matches('0');
        let accession = self.accession_number.as_deref()?.replace('-', "");
        let filename = self.document_filename.as_deref()?;
        Some(format!("{}/{}/{}/{}", ARCHIVES_BASE, cik, accession, filename))
    }
}

/// One submission as loaded: raw envelope text plus the form it was filed as.
#[derive(Debug, Clone)]
pub struct FilingDocument {
    pub raw_text: String,
    pub report_type: ReportType,
    pub metadata: FilingMetadata,
}

impl FilingDocument {
    pub fn new(raw_text: String, report_type: ReportType) -> Self {
        let metadata = header::parse_metadata(&raw_text);
        Self {
            raw_text,
            report_type,
            metadata,
        }
    }
}

/// One `<DOCUMENT>` of the submission envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SubDocument {
    pub doc_type: String,
    pub sequence: Option<String>,
    pub filename: Option<String>,
    pub description: Option<String>,
    /// Offset of `text` within the raw submission.
    pub offset: usize,
    #[serde(skip)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStrategy {
    Pattern,
    Index,
}

impl std::fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryStrategy::Pattern => write!(f, "pattern"),
            DiscoveryStrategy::Index => write!(f, "index"),
        }
    }
}

/// An unvalidated item boundary. Offsets index the normalized text; `start`
/// always sits on a one-byte separator (`>` or `\n`) that no section owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMarker {
    pub code: String,
    pub start: usize,
    pub end: usize,
    pub strategy: DiscoveryStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMarker {
    pub code: String,
    pub start: usize,
    pub end: usize,
    pub stripped_len: usize,
    pub strategy: DiscoveryStrategy,
}

impl ResolvedMarker {
    pub fn span(&self) -> Range<usize> {
        self.start + 1..self.end
    }
}

/// Ordered, validated markers; start offsets and canonical indices both
/// strictly increase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPositionMap {
    markers: Vec<ResolvedMarker>,
}

impl ResolvedPositionMap {
    pub(crate) fn new(markers: Vec<ResolvedMarker>) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &[ResolvedMarker] {
        &self.markers
    }

    pub fn codes(&self) -> Vec<&str> {
        self.markers.iter().map(|m| m.code.as_str()).collect()
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub code: String,
    pub text: String,
    /// Byte range of the section in the normalized document.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    SequenceIntegrityWarning,
    DuplicateCollapsed,
    DiscardedOccurrence,
    UnknownItemCode,
    UnanchoredRow,
    UnresolvedAnchor,
    StrategyFallback,
}

/// Heuristic decisions worth auditing. Never fatal on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub offset: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, offset: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFiling {
    pub metadata: FilingMetadata,
    pub report_type: ReportType,
    pub strategy: DiscoveryStrategy,
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedFiling {
    pub fn has_sequence_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::SequenceIntegrityWarning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub metadata: FilingMetadata,
    pub report_type: ReportType,
    pub reason: FailureReason,
    pub message: String,
    pub excerpt: Option<String>,
    pub position_map: Vec<CandidateMarker>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseFailure {
    pub fn from_error(
        metadata: FilingMetadata,
        report_type: ReportType,
        error: SegmentError,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let reason = error.reason();
        let message = error.to_string();
        let excerpt = error.excerpt().map(str::to_string);
        Self {
            metadata,
            report_type,
            reason,
            message,
            excerpt,
            position_map: error.into_position_map(),
            diagnostics,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParseOutcome {
    Parsed(ParsedFiling),
    Failed(ParseFailure),
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }

    pub fn metadata(&self) -> &FilingMetadata {
        match self {
            ParseOutcome::Parsed(p) => &p.metadata,
            ParseOutcome::Failed(f) => &f.metadata,
        }
    }

    /// Empty for failures.
    pub fn sections(&self) -> &[Section] {
        match self {
            ParseOutcome::Parsed(p) => &p.sections,
            ParseOutcome::Failed(_) => &[],
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Failed(f) => Some(f.reason),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ParseOutcome::Parsed(p) => &p.diagnostics,
            ParseOutcome::Failed(f) => &f.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_url() {
        let metadata = FilingMetadata {
            cik: Some("0000123456".to_string()),
            accession_number: Some("0000123456-23-000077".to_string()),
            document_filename: Some("wid-20230701.htm".to_string()),
            ..Default::default()
        };
        assert_eq!(
            metadata.archive_url().unwrap(),
            "https://www.sec.gov/Archives/edgar/data/123456/000012345623000077/wid-20230701.htm"
        );
        assert!(FilingMetadata::default().archive_url().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ParseOutcome::Failed(ParseFailure::from_error(
            FilingMetadata::default(),
            ReportType::Form10Q,
            SegmentError::UnsupportedForm("8-K".to_string()),
            Vec::new(),
        ));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "UnsupportedForm");
        assert_eq!(json["report_type"], "10-Q");
        assert!(outcome.sections().is_empty());
    }
}
