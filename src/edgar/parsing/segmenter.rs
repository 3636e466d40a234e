use anyhow::{Context, Result};
use serde::Serialize;

use super::document::extract_sub_document;
use super::error::{FailureReason, SegmentError};
use super::markers::{MarkerStrategy, PatternStrategy};
use super::normalize::{MarkupNormalizer, NormalizedDocument};
use super::resolve::{Resolution, SequenceResolver};
use super::section::assemble_sections;
use super::text::excerpt;
use super::toc::IndexStrategy;
use super::types::{
    Diagnostic, DiagnosticKind, DiscoveryStrategy, FilingDocument, ParseFailure, ParseOutcome,
    ParsedFiling, Section, SubDocument,
};
use crate::core::config::{SegmenterConfig, StrategyMode};
use crate::edgar::items::CanonicalItemSequence;

/// A sub-document ready for discovery.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub sequence: &'static CanonicalItemSequence,
    pub sub_document: SubDocument,
    pub normalized: NormalizedDocument,
}

/// Item codes one strategy produced, or why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRun {
    pub strategy: DiscoveryStrategy,
    pub codes: Vec<String>,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyComparison {
    pub pattern: StrategyRun,
    pub index: StrategyRun,
    pub agree: bool,
}

/// Runs the whole locate/resolve/assemble pipeline for one filing.
///
/// Holds no per-document state, so one instance can be shared across a
/// worker pool.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    normalizer: MarkupNormalizer,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        let normalizer = MarkupNormalizer::new(&config)
            .with_context(|| format!("Invalid payload types: {:?}", config.payload_types))?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn prepare(&self, filing: &FilingDocument) -> Result<PreparedDocument, SegmentError> {
        let sequence = CanonicalItemSequence::for_report(&filing.report_type)
            .ok_or_else(|| SegmentError::UnsupportedForm(filing.report_type.to_string()))?;
        let sub_document = extract_sub_document(&filing.raw_text, &filing.report_type)?;
        log::debug!(
            "Using {} sub-document {:?} ({} bytes)",
            sub_document.doc_type,
            sub_document.filename,
            sub_document.text.len()
        );

        let normalized = self.normalizer.normalize(&sub_document.text);
        log::debug!(
            "Normalized to {} bytes; tables kept {}, dropped {}",
            normalized.text.len(),
            normalized.tables_kept,
            normalized.tables_dropped
        );

        Ok(PreparedDocument {
            sequence,
            sub_document,
            normalized,
        })
    }

    pub fn segment(&self, filing: &FilingDocument) -> ParseOutcome {
        let mut metadata = filing.metadata.clone();
        let mut diagnostics = Vec::new();

        let result = self.prepare(filing).and_then(|prepared| {
            metadata.document_filename = prepared.sub_document.filename.clone();
            self.segment_prepared(&prepared, &mut diagnostics)
        });

        match result {
            Ok((strategy, sections)) => {
                log::info!(
                    "Segmented {} {} into {} section(s) using {} strategy",
                    filing.report_type,
                    metadata.accession_number.as_deref().unwrap_or("<unknown>"),
                    sections.len(),
                    strategy
                );
                ParseOutcome::Parsed(ParsedFiling {
                    metadata,
                    report_type: filing.report_type.clone(),
                    strategy,
                    sections,
                    diagnostics,
                })
            }
            Err(e) => {
                log::warn!(
                    "Failed to segment {} {}: {}",
                    filing.report_type,
                    metadata.accession_number.as_deref().unwrap_or("<unknown>"),
                    e
                );
                ParseOutcome::Failed(ParseFailure::from_error(
                    metadata,
                    filing.report_type.clone(),
                    e,
                    diagnostics,
                ))
            }
        }
    }

    /// Runs both strategies on one filing and reports whether they agree.
    pub fn compare_strategies(
        &self,
        filing: &FilingDocument,
    ) -> Result<StrategyComparison, SegmentError> {
        let prepared = self.prepare(filing)?;
        let radius = self.config.excerpt_radius;

        let run = |strategy: &dyn MarkerStrategy| {
            let mut diagnostics = Vec::new();
            let mut unresolved = Vec::new();
            match self.locate(strategy, &prepared, &mut diagnostics, &mut unresolved) {
                Ok(resolution) => StrategyRun {
                    strategy: strategy.kind(),
                    codes: resolution.map.codes().into_iter().map(String::from).collect(),
                    failure: None,
                },
                Err(e) => StrategyRun {
                    strategy: strategy.kind(),
                    codes: Vec::new(),
                    failure: Some(e.reason()),
                },
            }
        };

        let pattern = run(&PatternStrategy::new(radius));
        let index = run(&IndexStrategy::new(radius));
        let agree = pattern.failure.is_none() && index.failure.is_none() && pattern.codes == index.codes;

        Ok(StrategyComparison {
            pattern,
            index,
            agree,
        })
    }

    fn segment_prepared(
        &self,
        prepared: &PreparedDocument,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(DiscoveryStrategy, Vec<Section>), SegmentError> {
        let radius = self.config.excerpt_radius;
        let mut unresolved = Vec::new();

        let (strategy, resolution) = match self.config.strategy {
            StrategyMode::Pattern => {
                let strategy = PatternStrategy::new(radius);
                let resolution = self.locate(&strategy, prepared, diagnostics, &mut unresolved)?;
                (DiscoveryStrategy::Pattern, resolution)
            }
            StrategyMode::Index => {
                let strategy = IndexStrategy::new(radius);
                let resolution = self.locate(&strategy, prepared, diagnostics, &mut unresolved)?;
                (DiscoveryStrategy::Index, resolution)
            }
            StrategyMode::Auto => self.locate_auto(prepared, diagnostics)?,
        };
        diagnostics.extend(resolution.diagnostics);

        let mut sections = assemble_sections(&prepared.normalized.text, &resolution.map);
        if !self.config.items.is_empty() {
            for code in self.config.items.iter().filter(|c| !prepared.sequence.contains(c)) {
                log::warn!("Requested {} is not a {:?} item", code, prepared.sequence.family());
            }
            sections.retain(|s| self.config.items.contains(&s.code));
        }
        Ok((strategy, sections))
    }

    fn locate(
        &self,
        strategy: &dyn MarkerStrategy,
        prepared: &PreparedDocument,
        diagnostics: &mut Vec<Diagnostic>,
        unresolved: &mut Vec<String>,
    ) -> Result<Resolution, SegmentError> {
        let text = prepared.normalized.text.as_str();
        let discovery = strategy.discover(&prepared.normalized, prepared.sequence)?;
        diagnostics.extend(discovery.diagnostics);
        unresolved.extend(discovery.unresolved_anchors);

        if discovery.candidates.is_empty() {
            if !unresolved.is_empty() {
                return Err(SegmentError::AnchorUnresolvable {
                    targets: unresolved.clone(),
                    excerpt: None,
                });
            }
            return Err(SegmentError::NoMarkersFound {
                strategy: strategy.kind().to_string(),
                excerpt: Some(excerpt(text, 0, self.config.excerpt_radius)),
            });
        }

        SequenceResolver::new(
            prepared.sequence,
            self.config.first_item_policy,
            self.config.excerpt_radius,
        )
        .resolve(text, discovery.candidates)
    }

    /// Prefers a clean index result, then the pattern strategy, then whatever
    /// the index strategy managed to resolve.
    fn locate_auto(
        &self,
        prepared: &PreparedDocument,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(DiscoveryStrategy, Resolution), SegmentError> {
        let radius = self.config.excerpt_radius;

        let mut index_diagnostics = Vec::new();
        let mut unresolved = Vec::new();
        let index = self.locate(
            &IndexStrategy::new(radius),
            prepared,
            &mut index_diagnostics,
            &mut unresolved,
        );
        if index.is_ok() && unresolved.is_empty() {
            diagnostics.append(&mut index_diagnostics);
            return index.map(|resolution| (DiscoveryStrategy::Index, resolution));
        }

        let why = match &index {
            Ok(_) => format!("{} unresolved anchor(s)", unresolved.len()),
            Err(e) => e.to_string(),
        };
        log::warn!("Index strategy unusable ({}), falling back to pattern strategy", why);
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::StrategyFallback,
            None,
            format!("index strategy unusable: {}", why),
        ));

        let mut pattern_diagnostics = Vec::new();
        let pattern = self.locate(
            &PatternStrategy::new(radius),
            prepared,
            &mut pattern_diagnostics,
            &mut Vec::new(),
        );
        match (pattern, index) {
            (Ok(resolution), _) => {
                diagnostics.append(&mut pattern_diagnostics);
                Ok((DiscoveryStrategy::Pattern, resolution))
            }
            (Err(_), Ok(resolution)) => {
                log::warn!("Pattern strategy failed; keeping partial index result");
                diagnostics.append(&mut index_diagnostics);
                Ok((DiscoveryStrategy::Index, resolution))
            }
            (Err(pattern_error), Err(index_error)) => {
                diagnostics.append(&mut index_diagnostics);
                diagnostics.append(&mut pattern_diagnostics);
                if unresolved.is_empty() {
                    Err(pattern_error)
                } else {
                    Err(SegmentError::AnchorUnresolvable {
                        targets: unresolved,
                        excerpt: index_error.excerpt().map(str::to_string),
                    })
                }
            }
        }
    }
}
