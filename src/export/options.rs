//! Export configuration.

use crate::redaction::DEFAULT_BLUR_SIGMA;

/// Tunables for an export run.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Format tag recorded first in the artifact's tags. Its lowercase form
    /// prefixes the output file names.
    pub format_tag: String,

    /// Gaussian sigma for redaction blurring.
    pub blur_sigma: f32,

    /// Progress units reserved for archiving.
    pub archive_overhead_units: usize,

    /// Leading path components of an image's storage path that are not
    /// mirrored into the archive.
    pub storage_prefix_segments: usize,

    /// Directory, relative to the dataset directory, that receives exports.
    pub exports_dir_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format_tag: "COCO".to_string(),
            blur_sigma: DEFAULT_BLUR_SIGMA,
            archive_overhead_units: 30,
            storage_prefix_segments: 2,
            exports_dir_name: ".exports".to_string(),
        }
    }
}

impl ExportOptions {
    /// File name prefix for the document and archive, e.g. `coco`.
    pub fn file_prefix(&self) -> String {
        self.format_tag.to_lowercase()
    }
}
