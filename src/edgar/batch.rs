use anyhow::{Context, Result};
use indicatif::MultiProgress;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::filing::{load_filing, write_outcome};
use super::parsing::error::FailureReason;
use super::parsing::segmenter::Segmenter;
use super::parsing::types::ParseOutcome;
use super::report::ReportType;
use crate::utils::dirs::ensure_dir;
use crate::utils::pool::WorkerPool;
use crate::utils::progress::ProgressTracker;

pub const SECTIONS_SUFFIX: &str = "sections.txt";
pub const FAILURE_SUFFIX: &str = "error.json";

/// Orchestration flags for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub workers: usize,
    /// Only segment filings of these forms. Empty means all.
    pub forms: Vec<ReportType>,
    /// Only segment filings from these CIKs. Leading zeros are ignored.
    pub ciks: Vec<String>,
    pub overwrite: bool,
    /// Where outputs go; next to each input when unset.
    pub output_dir: Option<PathBuf>,
    /// Form to assume instead of the one each submission declares.
    pub declared_form: Option<ReportType>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            forms: Vec::new(),
            ciks: Vec::new(),
            overwrite: false,
            output_dir: None,
            declared_form: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    OutputExists,
    FormFiltered,
    CikFiltered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentStatus {
    Parsed,
    Failed(FailureReason),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub parsed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Documents that could not be read or written at all.
    pub errors: usize,
    pub failures_by_reason: BTreeMap<FailureReason, usize>,
}

impl BatchSummary {
    fn record(&mut self, status: DocumentStatus) {
        match status {
            DocumentStatus::Parsed => self.parsed += 1,
            DocumentStatus::Failed(reason) => {
                self.failed += 1;
                *self.failures_by_reason.entry(reason).or_insert(0) += 1;
            }
            DocumentStatus::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.parsed + self.failed + self.skipped + self.errors
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parsed, {} failed, {} skipped, {} errors",
            self.parsed, self.failed, self.skipped, self.errors
        )
    }
}

/// Expands directories (one level deep) into the files they hold.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("Failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && !is_output_file(p))
                .collect();
            files.sort();
            inputs.extend(files);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

fn is_output_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(SECTIONS_SUFFIX) || n.ends_with(FAILURE_SUFFIX))
        .unwrap_or(false)
}

/// Section stream and failure record paths for one input.
pub fn output_paths(input: &Path, options: &BatchOptions) -> (PathBuf, PathBuf) {
    let dir = options
        .output_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "filing".to_string());
    (
        dir.join(format!("{}.{}", name, SECTIONS_SUFFIX)),
        dir.join(format!("{}.{}", name, FAILURE_SUFFIX)),
    )
}

fn cik_matches(cik: Option<&str>, wanted: &[String]) -> bool {
    let Some(cik) = cik else {
        return false;
    };
    let cik = cik.trim_start_matches('0');
    wanted.iter().any(|w| w.trim_start_matches('0') == cik)
}

/// Loads, filters, segments and writes one filing.
pub fn process_document(
    path: &Path,
    segmenter: &Segmenter,
    options: &BatchOptions,
) -> Result<DocumentStatus> {
    let (sections_path, failure_path) = output_paths(path, options);
    if !options.overwrite && (sections_path.exists() || failure_path.exists()) {
        log::debug!("Skipping {}: output exists", path.display());
        return Ok(DocumentStatus::Skipped(SkipReason::OutputExists));
    }

    let filing = load_filing(path, options.declared_form.clone())?;
    if !options.forms.is_empty() && !options.forms.contains(&filing.report_type) {
        log::debug!("Skipping {}: form {}", path.display(), filing.report_type);
        return Ok(DocumentStatus::Skipped(SkipReason::FormFiltered));
    }
    if !options.ciks.is_empty() && !cik_matches(filing.metadata.cik.as_deref(), &options.ciks) {
        log::debug!("Skipping {}: CIK {:?}", path.display(), filing.metadata.cik);
        return Ok(DocumentStatus::Skipped(SkipReason::CikFiltered));
    }

    let outcome = segmenter.segment(&filing);
    let marker = segmenter.config().section_marker;
    match &outcome {
        ParseOutcome::Parsed(_) => {
            write_outcome(&outcome, &sections_path, marker)?;
            // A stale failure record would contradict the new output.
            if failure_path.exists() {
                fs::remove_file(&failure_path)?;
            }
            Ok(DocumentStatus::Parsed)
        }
        ParseOutcome::Failed(failure) => {
            write_outcome(&outcome, &failure_path, marker)?;
            if sections_path.exists() {
                fs::remove_file(&sections_path)?;
            }
            Ok(DocumentStatus::Failed(failure.reason))
        }
    }
}

/// Runs one document on the pool. The tracker advances whatever the result.
async fn segment_tracked(
    path: PathBuf,
    pool: WorkerPool,
    segmenter: Arc<Segmenter>,
    options: Arc<BatchOptions>,
    tracker: ProgressTracker,
) -> (PathBuf, Result<DocumentStatus>) {
    let result = async {
        let _permit = pool.acquire().await?;
        tracker.update_message(&path.display().to_string());
        let doc_path = path.clone();
        let status = tokio::task::spawn_blocking(move || {
            process_document(&doc_path, &segmenter, &options)
        })
        .await??;
        Ok::<DocumentStatus, anyhow::Error>(status)
    }
    .await;
    tracker.increment(1);
    (path, result)
}

/// Segments every input on a bounded pool of blocking workers. Per-document
/// failures are counted, never propagated.
pub async fn run_batch(
    inputs: Vec<PathBuf>,
    segmenter: Arc<Segmenter>,
    options: BatchOptions,
    multi_progress: Option<&Arc<MultiProgress>>,
) -> Result<BatchSummary> {
    if let Some(dir) = &options.output_dir {
        ensure_dir(dir)?;
    }

    let pool = WorkerPool::new(options.workers);
    let tracker = ProgressTracker::new(multi_progress, "Segmenting", inputs.len() as u64);
    log::info!(
        "Segmenting {} file(s) with {} worker(s)",
        inputs.len(),
        pool.size()
    );

    let options = Arc::new(options);
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|path| {
            let pool = pool.clone();
            let segmenter = segmenter.clone();
            let options = options.clone();
            let tracker = tracker.clone();
            tokio::spawn(segment_tracked(path, pool, segmenter, options, tracker))
        })
        .collect();

    let mut summary = BatchSummary::default();
    for handle in handles {
        match handle.await {
            Ok((_, Ok(status))) => summary.record(status),
            Ok((path, Err(e))) => {
                log::error!("Failed to process {}: {:#}", path.display(), e);
                summary.errors += 1;
            }
            Err(e) => {
                log::error!("Batch task panicked: {}", e);
                summary.errors += 1;
            }
        }
    }

    tracker.finish(&summary.to_string());
    log::info!("Batch finished: {}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let options = BatchOptions::default();
        let (sections, failure) = output_paths(Path::new("/data/0000123456-23-000077.txt"), &options);
        assert_eq!(sections, Path::new("/data/0000123456-23-000077.txt.sections.txt"));
        assert_eq!(failure, Path::new("/data/0000123456-23-000077.txt.error.json"));

        let options = BatchOptions {
            output_dir: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        let (sections, _) = output_paths(Path::new("/data/a.txt"), &options);
        assert_eq!(sections, Path::new("/out/a.txt.sections.txt"));
    }

    #[test]
    fn test_cik_matching_ignores_leading_zeros() {
        let wanted = vec!["123456".to_string()];
        assert!(cik_matches(Some("0000123456"), &wanted));
        assert!(!cik_matches(Some("0000654321"), &wanted));
        assert!(!cik_matches(None, &wanted));
    }

    #[tokio::test]
    async fn test_tracker_advances_on_unreadable_input() {
        let multi_progress = Arc::new(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ));
        let tracker = ProgressTracker::new(Some(&multi_progress), "Segmenting", 1);
        let segmenter = Arc::new(Segmenter::new(Default::default()).unwrap());
        let dir = tempfile::tempdir().unwrap();

        let (_, result) = segment_tracked(
            dir.path().join("missing.txt"),
            WorkerPool::new(1),
            segmenter,
            Arc::new(BatchOptions::default()),
            tracker.clone(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(tracker.position(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(DocumentStatus::Parsed);
        summary.record(DocumentStatus::Failed(FailureReason::NoMarkersFound));
        summary.record(DocumentStatus::Failed(FailureReason::NoMarkersFound));
        summary.record(DocumentStatus::Skipped(SkipReason::OutputExists));
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.failures_by_reason[&FailureReason::NoMarkersFound], 2);
        assert_eq!(summary.to_string(), "1 parsed, 2 failed, 1 skipped, 0 errors");
    }
}
