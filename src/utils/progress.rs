use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    label: String,
}

impl ProgressTracker {
    /// A bar of `total` steps under `multi_progress`; a no-op tracker when
    /// there is nothing to draw on.
    pub fn new(multi_progress: Option<&Arc<MultiProgress>>, label: &str, total: u64) -> Self {
        let progress_bar = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(total));
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            progress_bar,
            label: label.to_string(),
        }
    }

    pub fn update_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} [{}]", self.label, message));
        }
    }

    pub fn increment(&self, delta: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Steps completed so far; zero for a no-op tracker.
    pub fn position(&self) -> u64 {
        self.progress_bar.as_ref().map_or(0, |pb| pb.position())
    }

    pub fn finish(&self, summary: &str) {
        if let Some(pb) = &self.progress_bar {
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.finish_with_message(format!("{} complete [{}]", self.label, summary));
        }
    }
}
