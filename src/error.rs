use std::path::PathBuf;
use thiserror::Error;

use crate::model::{AnnotationId, CategoryId, DatasetId, ImageId, JobId};

/// The main error type for labelport operations.
///
/// Every variant is fatal for the job that raised it. Per-item problems
/// during import (missing images, orphaned references) are reported through
/// the job's progress reporter instead and never surface here.
#[derive(Debug, Error)]
pub enum LabelportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse exchange JSON from {path}: {source}")]
    ExchangeJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write exchange JSON to {path}: {source}")]
    ExchangeJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse store JSON from {path}: {source}")]
    StoreJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write store JSON to {path}: {source}")]
    StoreJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize job output: {0}")]
    OutputJson(#[source] serde_json::Error),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset {0} not found")]
    DatasetNotFound(DatasetId),

    #[error("Category {0} not found")]
    CategoryNotFound(CategoryId),

    #[error("Image {0} not found")]
    ImageNotFound(ImageId),

    #[error("Annotation {0} not found")]
    AnnotationNotFound(AnnotationId),

    #[error("Job {0} failed")]
    JobFailed(JobId),

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}
