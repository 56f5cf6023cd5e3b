//! Deduplicating job queue running at most one execution per key.
//!
//! Each distinct in-flight key owns a worker thread. A submission for a key
//! that is already executing does not start a second run; it is parked as
//! the entry's follow-up, replacing any follow-up parked before it. When the
//! current run ends the worker runs the follow-up once, with the latest
//! request, and removes the entry when nothing further is parked. Different
//! keys run fully concurrently and are not ordered with respect to each
//! other. Cancelling a running execution is not supported.

mod error;
mod ticket;

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::reporter::{JobReporter, StructuredJobReporter};

pub use self::error::{JobFailure, QueueError};
pub use self::ticket::{JobResult, JobTicket};

use self::ticket::Completion;

/// Tracing target for queue bookkeeping.
const QUEUE_TARGET: &str = "shuttle_queue::single_instance";

/// Unit of work the queue knows how to deduplicate and run.
pub trait QueueJob: Send + Sync + 'static {
    /// Parameters of one submission.
    type Request: Send + 'static;
    /// Value produced by a successful execution.
    type Outcome: Clone + Send + 'static;
    /// Error produced by a failed execution.
    type Error: StdError + Send + Sync + 'static;

    /// Deduplication key for `request`.
    fn key(&self, request: &Self::Request) -> String;

    /// Runs the job to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the job's own error type; the queue hands it to every ticket
    /// waiting on this execution.
    fn execute(&self, request: &Self::Request) -> Result<Self::Outcome, Self::Error>;
}

type Waiter<J> = Arc<Completion<<J as QueueJob>::Outcome, <J as QueueJob>::Error>>;

/// Request waiting to run together with the tickets that will observe it.
struct Pending<J: QueueJob> {
    request: J::Request,
    waiters: Vec<Waiter<J>>,
}

/// Queue entry for a key that is currently executing.
struct Entry<J: QueueJob> {
    follow_up: Option<Pending<J>>,
}

struct Shared<J: QueueJob> {
    job: J,
    entries: Mutex<HashMap<String, Entry<J>>>,
    idle: Condvar,
    reporter: Arc<dyn JobReporter>,
}

/// Queue bound to one job implementation.
///
/// Cloning the queue yields another handle to the same entries.
pub struct SingleInstanceQueue<J: QueueJob> {
    shared: Arc<Shared<J>>,
}

impl<J: QueueJob> SingleInstanceQueue<J> {
    /// Creates a queue reporting job events through `tracing`.
    #[must_use]
    pub fn new(job: J) -> Self {
        Self::with_reporter(job, Arc::new(StructuredJobReporter::new()))
    }

    /// Creates a queue reporting job events to `reporter`.
    #[must_use]
    pub fn with_reporter(job: J, reporter: Arc<dyn JobReporter>) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                entries: Mutex::new(HashMap::new()),
                idle: Condvar::new(),
                reporter,
            }),
        }
    }

    /// The job implementation this queue instantiates for every execution.
    #[must_use]
    pub fn job(&self) -> &J {
        &self.shared.job
    }

    /// Submits `request`, starting an execution unless one is in flight for
    /// the same key.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::WorkerSpawn`] when a worker thread cannot be
    /// started. The key is left free in that case.
    pub fn submit(&self, request: J::Request) -> Result<JobTicket<J::Outcome, J::Error>, QueueError> {
        let key = self.shared.job.key(&request);
        let completion = Arc::new(Completion::new());
        let mut entries = self.shared.lock_entries();

        if let Some(entry) = entries.get_mut(&key) {
            let mut waiters = entry
                .follow_up
                .take()
                .map(|pending| pending.waiters)
                .unwrap_or_default();
            waiters.push(Arc::clone(&completion));
            entry.follow_up = Some(Pending { request, waiters });
            drop(entries);
            self.shared
                .notify(&key, "job_coalesced", |reporter| reporter.job_coalesced(&key));
            return Ok(JobTicket::new(key, completion, true));
        }

        entries.insert(key.clone(), Entry { follow_up: None });
        let first = Pending {
            request,
            waiters: vec![Arc::clone(&completion)],
        };
        let shared = Arc::clone(&self.shared);
        let worker_key = key.clone();
        let spawned = thread::Builder::new()
            .name(format!("shuttle-job-{key}"))
            .spawn(move || shared.run_entry(&worker_key, first));

        if let Err(source) = spawned {
            entries.remove(&key);
            drop(entries);
            self.shared.idle.notify_all();
            return Err(QueueError::WorkerSpawn {
                key,
                source: Arc::new(source),
            });
        }
        drop(entries);

        debug!(target: QUEUE_TARGET, key = %key, "dispatched job");
        Ok(JobTicket::new(key, completion, false))
    }

    /// Submits `request` and blocks until the execution it joined finishes.
    ///
    /// # Errors
    ///
    /// Returns the [`JobFailure`] of the execution, or
    /// [`JobFailure::Rejected`] when the submission could not be dispatched.
    pub fn execute_sync(&self, request: J::Request) -> JobResult<J::Outcome, J::Error> {
        self.submit(request).map_err(JobFailure::Rejected)?.wait()
    }

    /// Number of keys with an execution in flight.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.shared.lock_entries().len()
    }

    /// Keys with an execution in flight, sorted.
    #[must_use]
    pub fn in_flight_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.lock_entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Blocks until no key is in flight or `timeout` elapses.
    ///
    /// Returns `true` when the queue drained in time.
    #[must_use]
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let guard = self.shared.lock_entries();
        let (entries, _) = self
            .shared
            .idle
            .wait_timeout_while(guard, timeout, |pending| !pending.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        entries.is_empty()
    }
}

impl<J: QueueJob> Clone for SingleInstanceQueue<J> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<J: QueueJob> fmt::Debug for SingleInstanceQueue<J> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SingleInstanceQueue")
            .field("in_flight_keys", &self.in_flight_keys())
            .finish_non_exhaustive()
    }
}

impl<J: QueueJob> Shared<J> {
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry<J>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Worker loop for one key: runs the first request, then any follow-up.
    ///
    /// The entry is settled before waiters are woken, so a caller returning
    /// from `wait` never observes its own key still in flight.
    fn run_entry(&self, key: &str, first: Pending<J>) {
        let mut next = Some(first);
        while let Some(Pending { request, waiters }) = next.take() {
            let result = self.run_once(key, &request);
            next = self.finish_run(key);
            for waiter in waiters {
                waiter.resolve(result.clone());
            }
        }
    }

    /// Takes the parked follow-up, or clears the entry when there is none.
    fn finish_run(&self, key: &str) -> Option<Pending<J>> {
        let mut entries = self.lock_entries();
        let follow_up = entries
            .get_mut(key)
            .and_then(|entry| entry.follow_up.take());
        if follow_up.is_none() {
            entries.remove(key);
            drop(entries);
            self.idle.notify_all();
            debug!(target: QUEUE_TARGET, key, "job entry cleared");
        }
        follow_up
    }

    fn run_once(&self, key: &str, request: &J::Request) -> JobResult<J::Outcome, J::Error> {
        self.notify(key, "job_started", |reporter| reporter.job_started(key));
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.job.execute(request)));
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(JobFailure::Failed(Arc::new(error))),
            Err(payload) => Err(JobFailure::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        };
        match &result {
            Ok(_) => self.notify(key, "job_succeeded", |reporter| {
                reporter.job_succeeded(key, elapsed);
            }),
            Err(failure) => self.notify(key, "job_failed", |reporter| {
                reporter.job_failed(key, elapsed, failure);
            }),
        }
        result
    }

    /// Invokes a reporter callback; a panicking reporter is logged and
    /// otherwise ignored.
    fn notify(&self, key: &str, event: &'static str, callback: impl FnOnce(&dyn JobReporter)) {
        let reporter: &dyn JobReporter = &*self.reporter;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(reporter))) {
            warn!(
                target: QUEUE_TARGET,
                key,
                event,
                panic = %panic_message(payload.as_ref()),
                "job reporter panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}

#[cfg(test)]
mod tests;
