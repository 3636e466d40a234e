//! Sequence validation of candidate markers.
//!
//! Every pass builds a new vector from the previous one. The passes run in a
//! fixed order: unknown codes and shared offsets, duplicate collapse,
//! out-of-sequence repair, authoritative first item, required codes.

use super::error::SegmentError;
use super::text::{excerpt, stripped_len};
use super::types::{
    CandidateMarker, Diagnostic, DiagnosticKind, ResolvedMarker, ResolvedPositionMap,
};
use crate::core::config::FirstItemPolicy;
use crate::edgar::items::CanonicalItemSequence;

#[derive(Debug, Clone)]
pub struct Resolution {
    pub map: ResolvedPositionMap,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
struct Ranked {
    index: usize,
    marker: CandidateMarker,
}

pub struct SequenceResolver<'a> {
    sequence: &'a CanonicalItemSequence,
    policy: FirstItemPolicy,
    excerpt_radius: usize,
}

impl<'a> SequenceResolver<'a> {
    pub fn new(
        sequence: &'a CanonicalItemSequence,
        policy: FirstItemPolicy,
        excerpt_radius: usize,
    ) -> Self {
        Self {
            sequence,
            policy,
            excerpt_radius,
        }
    }

    pub fn resolve(
        &self,
        text: &str,
        candidates: Vec<CandidateMarker>,
    ) -> Result<Resolution, SegmentError> {
        let mut diagnostics = Vec::new();

        let ranked = self.rank(candidates, &mut diagnostics);
        let ranked = collapse_duplicates(ranked, &mut diagnostics);
        let ranked = repair_sequence(ranked, &mut diagnostics);
        let ranked = self.select_first_item(text, ranked, &mut diagnostics)?;
        self.check_required(text, &ranked)?;

        let markers: Vec<ResolvedMarker> = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let end = ranked.get(i + 1).map_or(text.len(), |next| next.marker.start);
                ResolvedMarker {
                    code: r.marker.code.clone(),
                    start: r.marker.start,
                    end,
                    stripped_len: stripped_len(&text[r.marker.start + 1..end]),
                    strategy: r.marker.strategy,
                }
            })
            .collect();

        log::debug!(
            "Resolved {} item(s): {}",
            markers.len(),
            markers.iter().map(|m| m.code.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(Resolution {
            map: ResolvedPositionMap::new(markers),
            diagnostics,
        })
    }

    /// Drops codes outside the sequence, orders by offset and keeps one
    /// candidate per offset (earliest in canonical order).
    fn rank(&self, candidates: Vec<CandidateMarker>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Ranked> {
        let mut ranked: Vec<Ranked> = candidates
            .into_iter()
            .filter_map(|marker| match self.sequence.index_of(&marker.code) {
                Some(index) => Some(Ranked { index, marker }),
                None => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnknownItemCode,
                        Some(marker.start),
                        format!("{} is not a {:?} item", marker.code, self.sequence.family()),
                    ));
                    None
                }
            })
            .collect();
        ranked.sort_by_key(|r| (r.marker.start, r.index));
        ranked.dedup_by_key(|r| r.marker.start);
        ranked
    }

    fn select_first_item(
        &self,
        text: &str,
        ranked: Vec<Ranked>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<Ranked>, SegmentError> {
        let first = self.sequence.first();

        // Each occurrence is measured up to whichever candidate follows it.
        let occurrences: Vec<(usize, usize)> = ranked
            .iter()
            .enumerate()
            .filter(|(_, r)| r.marker.code == first)
            .map(|(i, r)| {
                let end = ranked.get(i + 1).map_or(text.len(), |next| next.marker.start);
                (i, stripped_len(&text[r.marker.start + 1..end]))
            })
            .collect();

        let chosen = match self.policy {
            FirstItemPolicy::Longest => occurrences.iter().max_by_key(|(_, len)| *len),
            FirstItemPolicy::Last => occurrences.last(),
        };
        let Some(&(chosen, _)) = chosen else {
            return Err(SegmentError::RequiredItemMissing {
                code: first.to_string(),
                excerpt: ranked
                    .first()
                    .map(|r| excerpt(text, r.marker.start, self.excerpt_radius)),
                position_map: ranked.into_iter().map(|r| r.marker).collect(),
            });
        };

        let stop = occurrences
            .iter()
            .map(|(i, _)| *i)
            .find(|i| *i > chosen)
            .unwrap_or(ranked.len());

        for (i, r) in ranked.iter().enumerate() {
            if i < chosen || i >= stop {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DiscardedOccurrence,
                    Some(r.marker.start),
                    format!(
                        "discarded {} outside the authoritative {} block",
                        r.marker.code, first
                    ),
                ));
            }
        }
        if occurrences.len() > 1 {
            log::debug!(
                "{} occurs {} times; keeping the one at offset {}",
                first,
                occurrences.len(),
                ranked[chosen].marker.start
            );
        }

        Ok(ranked
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i >= chosen && *i < stop)
            .map(|(_, r)| r)
            .collect())
    }

    fn check_required(&self, text: &str, ranked: &[Ranked]) -> Result<(), SegmentError> {
        for required in self.sequence.required() {
            if ranked.iter().any(|r| r.marker.code == *required) {
                continue;
            }
            let expected = self.sequence.index_of(required).unwrap_or(0);
            let near = ranked
                .iter()
                .find(|r| r.index > expected)
                .or(ranked.last())
                .map(|r| excerpt(text, r.marker.start, self.excerpt_radius));
            return Err(SegmentError::RequiredItemMissing {
                code: required.to_string(),
                excerpt: near,
                position_map: ranked.iter().map(|r| r.marker.clone()).collect(),
            });
        }
        Ok(())
    }
}

fn collapse_duplicates(ranked: Vec<Ranked>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Ranked> {
    let mut collapsed: Vec<Ranked> = Vec::with_capacity(ranked.len());
    for r in ranked {
        match collapsed.last() {
            Some(prev) if prev.marker.code == r.marker.code => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateCollapsed,
                    Some(r.marker.start),
                    format!("repeated {} folded into the one at offset {}", r.marker.code, prev.marker.start),
                ));
            }
            _ => collapsed.push(r),
        }
    }
    collapsed
}

/// A candidate is out of sequence when it does not advance past the previous
/// survivor, or when the next two candidates climb from the previous
/// survivor toward it (it would make them unreachable). Its text stays in the
/// previous section.
///
/// Occurrences of the first item always survive: a table of contents and the
/// body each start a run, and the first-item pass picks between them.
fn repair_sequence(ranked: Vec<Ranked>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Ranked> {
    let mut survivors: Vec<Ranked> = Vec::with_capacity(ranked.len());
    for (i, r) in ranked.iter().enumerate() {
        let Some(prev) = survivors.last() else {
            survivors.push(r.clone());
            continue;
        };
        if r.index == 0 {
            survivors.push(r.clone());
            continue;
        }
        let skips_ahead = match (ranked.get(i + 1), ranked.get(i + 2)) {
            (Some(n1), Some(n2)) => {
                prev.index < n1.index && n1.index < n2.index && n2.index < r.index
            }
            _ => false,
        };
        if r.index <= prev.index || skips_ahead {
            log::warn!(
                "{} at offset {} is out of sequence after {}; merged into it",
                r.marker.code,
                r.marker.start,
                prev.marker.code
            );
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SequenceIntegrityWarning,
                Some(r.marker.start),
                format!(
                    "{} out of sequence after {}; merged into {}",
                    r.marker.code, prev.marker.code, prev.marker.code
                ),
            ));
            continue;
        }
        survivors.push(r.clone());
    }
    survivors
}
