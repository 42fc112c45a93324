//! Unit-based progress normalization.

use super::ProgressReporter;

/// Converts processed work units into a non-decreasing percentage.
///
/// The total is fixed up front. Advancing past it saturates at 100, and a
/// reported value never drops below the previous one.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    last: f64,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            last: 0.0,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done
    }

    /// Current percentage without reporting it.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let raw = (self.done as f64 / self.total as f64 * 100.0).min(100.0);
        raw.max(self.last)
    }

    /// Records `units` more processed units and reports the new percentage.
    pub fn advance(&mut self, units: usize, reporter: &dyn ProgressReporter) {
        self.done = self.done.saturating_add(units);
        self.last = self.percent();
        reporter.set_progress(self.last);
    }

    /// Reports exactly 100.
    pub fn finish(&mut self, reporter: &dyn ProgressReporter) {
        self.done = self.done.max(self.total);
        self.last = 100.0;
        reporter.set_progress(100.0);
    }
}
