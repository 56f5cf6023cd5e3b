//! Observer for job lifecycle events.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Tracing target for job lifecycle events.
const JOBS_TARGET: &str = "shuttle_queue::jobs";

/// Observer notified as the queue runs jobs.
///
/// This is the boundary at which failed jobs are surfaced; the queue itself
/// never propagates a job failure beyond the tickets waiting on it.
/// A callback that panics is logged by the queue and otherwise ignored; the
/// job and its tickets proceed as if the callback had returned.
pub trait JobReporter: Send + Sync {
    /// An execution for `key` is about to start.
    fn job_started(&self, key: &str);

    /// A submission for `key` joined an execution already in flight.
    fn job_coalesced(&self, key: &str);

    /// An execution for `key` completed successfully.
    fn job_succeeded(&self, key: &str, elapsed: Duration);

    /// An execution for `key` failed or panicked.
    fn job_failed(&self, key: &str, elapsed: Duration, error: &dyn Error);
}

impl<T> JobReporter for Arc<T>
where
    T: JobReporter + ?Sized,
{
    fn job_started(&self, key: &str) {
        (**self).job_started(key);
    }

    fn job_coalesced(&self, key: &str) {
        (**self).job_coalesced(key);
    }

    fn job_succeeded(&self, key: &str, elapsed: Duration) {
        (**self).job_succeeded(key, elapsed);
    }

    fn job_failed(&self, key: &str, elapsed: Duration, error: &dyn Error) {
        (**self).job_failed(key, elapsed, error);
    }
}

/// Default reporter that records job events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredJobReporter;

impl StructuredJobReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl JobReporter for StructuredJobReporter {
    fn job_started(&self, key: &str) {
        tracing::debug!(
            target: JOBS_TARGET,
            event = "job_started",
            key,
            "starting job"
        );
    }

    fn job_coalesced(&self, key: &str) {
        tracing::debug!(
            target: JOBS_TARGET,
            event = "job_coalesced",
            key,
            "job already in flight; submission will run next"
        );
    }

    fn job_succeeded(&self, key: &str, elapsed: Duration) {
        tracing::info!(
            target: JOBS_TARGET,
            event = "job_succeeded",
            key,
            elapsed_ms = millis(elapsed),
            "job completed"
        );
    }

    fn job_failed(&self, key: &str, elapsed: Duration, error: &dyn Error) {
        tracing::error!(
            target: JOBS_TARGET,
            event = "job_failed",
            key,
            elapsed_ms = millis(elapsed),
            error = %error,
            "job failed"
        );
    }
}
