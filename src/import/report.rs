//! Import summary counts.

use serde::Serialize;
use std::fmt;

/// Per-phase tallies from one import run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub categories_matched: usize,
    pub categories_created: usize,
    pub images_matched: usize,
    /// Document images with no file-name match in the dataset.
    pub images_missing: usize,
    /// Document images matching more than one dataset image.
    pub images_ambiguous: usize,
    pub annotations_created: usize,
    /// Existing annotations found by merge key and reconciled in place.
    pub annotations_reconciled: usize,
    /// Annotations with no spatial content or an unresolved reference.
    pub annotations_skipped: usize,
}

impl ImportSummary {
    /// Annotations from the document that now exist in the store.
    pub fn annotations_merged(&self) -> usize {
        self.annotations_created + self.annotations_reconciled
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Categories: {} matched, {} created",
            self.categories_matched, self.categories_created
        )?;
        writeln!(
            f,
            "Images: {} matched, {} missing, {} ambiguous",
            self.images_matched, self.images_missing, self.images_ambiguous
        )?;
        writeln!(
            f,
            "Annotations: {} created, {} already present, {} skipped",
            self.annotations_created, self.annotations_reconciled, self.annotations_skipped
        )
    }
}
