pub mod document;
pub mod error;
pub mod header;
pub mod markers;
pub mod normalize;
pub mod patterns;
pub mod resolve;
pub mod section;
pub mod segmenter;
pub mod table;
pub mod text;
pub mod toc;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use error::{FailureReason, SegmentError};
pub use segmenter::{Segmenter, StrategyComparison, StrategyRun};
pub use types::{
    CandidateMarker, Diagnostic, DiagnosticKind, DiscoveryStrategy, FilingDocument,
    FilingMetadata, ParseFailure, ParseOutcome, ParsedFiling, ResolvedPositionMap, Section,
};
