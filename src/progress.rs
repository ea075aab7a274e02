//! Row progress display for the ingestion loop

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar over the rows of one run
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Visible bar on stderr
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({per_sec}, eta {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    /// Tracker that draws nothing
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self { bar }
    }

    /// Count one processed row
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Rows processed so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Run `f` with the bar cleared so its output is not overdrawn
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_tracker_counts_rows() {
        let tracker = ProgressTracker::hidden(3);
        tracker.inc();
        tracker.inc();
        assert_eq!(tracker.position(), 2);
        assert_eq!(tracker.suspend(|| 7), 7);
        tracker.finish();
    }
}
