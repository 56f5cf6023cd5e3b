//! Completion handles returned by [`SingleInstanceQueue::submit`].
//!
//! [`SingleInstanceQueue::submit`]: super::SingleInstanceQueue::submit

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::error::JobFailure;

/// Result delivered to every ticket of an execution.
pub type JobResult<O, E> = Result<O, JobFailure<E>>;

/// One-shot slot a worker fills when the execution a ticket waits on ends.
pub(crate) struct Completion<O, E>
where
    E: StdError + Send + Sync + 'static,
{
    state: Mutex<Option<JobResult<O, E>>>,
    ready: Condvar,
}

impl<O, E> Completion<O, E>
where
    O: Clone,
    E: StdError + Send + Sync + 'static,
{
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn resolve(&self, result: JobResult<O, E>) {
        *self.lock() = Some(result);
        self.ready.notify_all();
    }

    fn is_resolved(&self) -> bool {
        self.lock().is_some()
    }

    fn wait(&self) -> JobResult<O, E> {
        let mut state = self.lock();
        loop {
            if let Some(result) = state.take() {
                return result;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> Option<JobResult<O, E>> {
        let (state, _) = self
            .ready
            .wait_timeout_while(self.lock(), timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<JobResult<O, E>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the outcome of one submission.
///
/// A coalesced ticket resolves with the outcome of the follow-up execution
/// that runs after the in-flight one, using the latest submitted request.
pub struct JobTicket<O, E>
where
    E: StdError + Send + Sync + 'static,
{
    key: String,
    completion: Arc<Completion<O, E>>,
    coalesced: bool,
}

impl<O, E> JobTicket<O, E>
where
    O: Clone,
    E: StdError + Send + Sync + 'static,
{
    pub(crate) const fn new(key: String, completion: Arc<Completion<O, E>>, coalesced: bool) -> Self {
        Self {
            key,
            completion,
            coalesced,
        }
    }

    /// Deduplication key of the submission.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` when the submission joined an execution already in
    /// flight instead of starting one.
    #[must_use]
    pub const fn is_coalesced(&self) -> bool {
        self.coalesced
    }

    /// Returns `true` once the outcome is available.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completion.is_resolved()
    }

    /// Blocks until the execution this ticket waits on has finished.
    ///
    /// # Errors
    ///
    /// Returns the [`JobFailure`] recorded for the execution.
    pub fn wait(self) -> JobResult<O, E> {
        self.completion.wait()
    }

    /// Blocks for at most `timeout`, returning `None` if the execution is
    /// still running.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobResult<O, E>> {
        self.completion.wait_timeout(timeout)
    }
}

impl<O, E> fmt::Debug for JobTicket<O, E>
where
    O: Clone,
    E: StdError + Send + Sync + 'static,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("JobTicket")
            .field("key", &self.key)
            .field("coalesced", &self.coalesced)
            .field("finished", &self.is_finished())
            .finish()
    }
}
