//! Progress and log reporting for pipeline jobs.
//!
//! Pipelines receive a [`ProgressReporter`] explicitly instead of reaching
//! for a "current job". Every call is fire-and-forget: reporters return
//! nothing, and a reporter that fails to deliver an event must swallow the
//! failure rather than abort the pipeline.

mod tracker;

pub use tracker::ProgressTracker;

use std::sync::Mutex;

use serde::Serialize;

use crate::model::JobId;

/// Receiver of job progress and leveled log messages.
pub trait ProgressReporter {
    /// Reports completion as a percentage in `0.0..=100.0`.
    fn set_progress(&self, percent: f64);

    fn info(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);
}

/// Severity of a job log message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in a job's event log.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobEvent {
    Progress { percent: f64 },
    Message { level: LogLevel, message: String },
}

/// Reporter bound to one job.
///
/// Events are appended to an in-memory job log and mirrored to `tracing`
/// with the job id attached, which is how they reach any subscriber the
/// host application installed.
#[derive(Debug)]
pub struct JobReporter {
    job_id: JobId,
    events: Mutex<Vec<JobEvent>>,
}

impl JobReporter {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// A snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Consumes the reporter and returns its event log.
    pub fn into_events(self) -> Vec<JobEvent> {
        self.events.into_inner().unwrap_or_default()
    }

    /// All progress percentages reported, in order.
    pub fn progress_values(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                JobEvent::Progress { percent } => Some(percent),
                JobEvent::Message { .. } => None,
            })
            .collect()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                JobEvent::Message { level: l, message } if l == level => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: JobEvent) {
        // A poisoned log drops the event; reporting never fails the job.
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(job_id = %self.job_id, "{message}"),
            LogLevel::Warning => tracing::warn!(job_id = %self.job_id, "{message}"),
            LogLevel::Error => tracing::error!(job_id = %self.job_id, "{message}"),
        }
        self.record(JobEvent::Message {
            level,
            message: message.to_string(),
        });
    }
}

impl ProgressReporter for JobReporter {
    fn set_progress(&self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        tracing::debug!(job_id = %self.job_id, percent, "progress");
        self.record(JobEvent::Progress { percent });
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Reporter that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_progress(&self, _percent: f64) {}

    fn info(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
