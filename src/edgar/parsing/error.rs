use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::types::CandidateMarker;

/// Stable reason codes written to failure records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum FailureReason {
    SubDocumentNotFound,
    NoMarkersFound,
    RequiredItemMissing,
    PartBoundaryUnresolvable,
    AnchorUnresolvable,
    UnsupportedForm,
}

/// Document-level segmentation failures. None of these abort a batch; the
/// segmenter turns them into `ParseOutcome::Failed` records.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("no {expected} sub-document in submission (found: {})", .found.join(", "))]
    SubDocumentNotFound { expected: String, found: Vec<String> },

    #[error("{strategy} strategy found no item markers")]
    NoMarkersFound {
        strategy: String,
        excerpt: Option<String>,
    },

    #[error("resolved map is missing required {code}")]
    RequiredItemMissing {
        code: String,
        excerpt: Option<String>,
        position_map: Vec<CandidateMarker>,
    },

    #[error("could not locate the Part I / Part II boundary")]
    PartBoundaryUnresolvable {
        excerpt: Option<String>,
        position_map: Vec<CandidateMarker>,
    },

    #[error("{} table of contents anchor(s) missing from document (first: #{})", .targets.len(), .targets.first().map(String::as_str).unwrap_or(""))]
    AnchorUnresolvable {
        targets: Vec<String>,
        excerpt: Option<String>,
    },

    #[error("no canonical item sequence for form {0}")]
    UnsupportedForm(String),
}

impl SegmentError {
    pub fn reason(&self) -> FailureReason {
        match self {
            SegmentError::SubDocumentNotFound { .. } => FailureReason::SubDocumentNotFound,
            SegmentError::NoMarkersFound { .. } => FailureReason::NoMarkersFound,
            SegmentError::RequiredItemMissing { .. } => FailureReason::RequiredItemMissing,
            SegmentError::PartBoundaryUnresolvable { .. } => {
                FailureReason::PartBoundaryUnresolvable
            }
            SegmentError::AnchorUnresolvable { .. } => FailureReason::AnchorUnresolvable,
            SegmentError::UnsupportedForm(_) => FailureReason::UnsupportedForm,
        }
    }

    pub fn excerpt(&self) -> Option<&str> {
        match self {
            SegmentError::NoMarkersFound { excerpt, .. }
            | SegmentError::RequiredItemMissing { excerpt, .. }
            | SegmentError::PartBoundaryUnresolvable { excerpt, .. }
            | SegmentError::AnchorUnresolvable { excerpt, .. } => excerpt.as_deref(),
            SegmentError::SubDocumentNotFound { .. } | SegmentError::UnsupportedForm(_) => None,
        }
    }

    /// Candidates that were on the table when the document was abandoned.
    pub fn into_position_map(self) -> Vec<CandidateMarker> {
        match self {
            SegmentError::RequiredItemMissing { position_map, .. }
            | SegmentError::PartBoundaryUnresolvable { position_map, .. } => position_map,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_stable_strings() {
        assert_eq!(
            FailureReason::RequiredItemMissing.to_string(),
            "RequiredItemMissing"
        );
        assert_eq!(
            serde_json::to_string(&FailureReason::AnchorUnresolvable).unwrap(),
            "\"AnchorUnresolvable\""
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SegmentError::SubDocumentNotFound {
            expected: "10-Q".to_string(),
            found: vec!["10-K".to_string(), "EX-31.1".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no 10-Q sub-document in submission (found: 10-K, EX-31.1)"
        );
        assert_eq!(err.reason(), FailureReason::SubDocumentNotFound);

        let err = SegmentError::AnchorUnresolvable {
            targets: vec!["item_2".to_string(), "item_3".to_string()],
            excerpt: None,
        };
        assert_eq!(
            err.to_string(),
            "2 table of contents anchor(s) missing from document (first: #item_2)"
        );
    }
}
