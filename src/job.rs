//! Job entry points.
//!
//! A job wraps one pipeline run with a [`JobReporter`] tagged by job id and
//! folds the result into a terminal status. The job log is the only failure
//! channel: a fatal error is logged at error level and the job is marked
//! failed. Scheduling jobs (and keeping two of them off the same dataset)
//! is up to the caller.

use std::path::PathBuf;

use serde::Serialize;

use crate::exchange::ExchangeDocument;
use crate::export::{ExportOptions, ExportPipeline};
use crate::import::{ImportPipeline, ImportSummary};
use crate::model::{CategoryId, DatasetId, JobId};
use crate::progress::{JobEvent, JobReporter, ProgressReporter};
use crate::store::Store;

/// Terminal status of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Everything a finished job leaves behind.
#[derive(Clone, Debug, Serialize)]
pub struct JobOutcome<T> {
    pub job_id: JobId,
    pub status: JobStatus,
    /// The pipeline's result when the job completed.
    pub output: Option<T>,
    pub events: Vec<JobEvent>,
}

impl<T> JobOutcome<T> {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    fn from_result<E: std::fmt::Display>(reporter: JobReporter, result: Result<T, E>) -> Self {
        let job_id = reporter.job_id();
        let (status, output) = match result {
            Ok(output) => (JobStatus::Completed, Some(output)),
            Err(err) => {
                reporter.error(&err.to_string());
                (JobStatus::Failed, None)
            }
        };

        Self {
            job_id,
            status,
            output,
            events: reporter.into_events(),
        }
    }
}

/// Runs an export job. On success the output is the exchange document path
/// recorded in the export artifact.
pub fn run_export_job<S: Store + ?Sized>(
    job_id: JobId,
    store: &mut S,
    dataset_id: DatasetId,
    export_category_ids: &[CategoryId],
    blur_category_ids: &[CategoryId],
    options: ExportOptions,
) -> JobOutcome<PathBuf> {
    let reporter = JobReporter::new(job_id);
    let span = tracing::info_span!("export", job_id = %job_id, dataset_id = %dataset_id);
    let _guard = span.enter();

    let result = ExportPipeline::new(&reporter, options)
        .run(store, dataset_id, export_category_ids, blur_category_ids)
        .map(|summary| summary.artifact.path);

    JobOutcome::from_result(reporter, result)
}

/// Runs an import job.
pub fn run_import_job<S: Store + ?Sized>(
    job_id: JobId,
    store: &mut S,
    dataset_id: DatasetId,
    document: &ExchangeDocument,
) -> JobOutcome<ImportSummary> {
    let reporter = JobReporter::new(job_id);
    let span = tracing::info_span!("import", job_id = %job_id, dataset_id = %dataset_id);
    let _guard = span.enter();

    let result = ImportPipeline::new(&reporter).run(store, dataset_id, document);

    JobOutcome::from_result(reporter, result)
}
