//! Unit tests for the single-instance queue.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::{fixture, rstest};
use thiserror::Error;

use super::*;
use crate::reporter::JobReporter;
use crate::tests::support::{Gate, JobEvent, RecordingReporter};

const PATIENCE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Echo {
    key: &'static str,
    value: &'static str,
}

const fn echo(key: &'static str, value: &'static str) -> Echo {
    Echo { key, value }
}

#[derive(Debug, Error)]
#[error("echo failed: {0}")]
struct EchoError(String);

#[derive(Debug, Default)]
struct Concurrency {
    active: HashMap<&'static str, usize>,
    max_per_key: usize,
}

/// Job that records its runs and parks requests whose value starts with
/// `block` until the gate opens.
struct EchoJob {
    gate: Gate,
    entered: Mutex<Sender<&'static str>>,
    runs: Mutex<Vec<&'static str>>,
    concurrency: Mutex<Concurrency>,
}

impl EchoJob {
    fn runs(&self) -> Vec<&'static str> {
        self.runs.lock().expect("runs mutex poisoned").clone()
    }

    fn max_per_key(&self) -> usize {
        self.concurrency
            .lock()
            .expect("concurrency mutex poisoned")
            .max_per_key
    }
}

impl QueueJob for EchoJob {
    type Request = Echo;
    type Outcome = &'static str;
    type Error = EchoError;

    fn key(&self, request: &Echo) -> String {
        request.key.to_owned()
    }

    fn execute(&self, request: &Echo) -> Result<&'static str, EchoError> {
        {
            let mut concurrency = self.concurrency.lock().expect("concurrency mutex poisoned");
            let active = concurrency.active.entry(request.key).or_insert(0);
            *active += 1;
            let current = *active;
            concurrency.max_per_key = concurrency.max_per_key.max(current);
        }
        self.entered
            .lock()
            .expect("sender mutex poisoned")
            .send(request.value)
            .expect("test receiver dropped");
        if request.value.starts_with("block") {
            self.gate.wait();
        }
        self.runs.lock().expect("runs mutex poisoned").push(request.value);
        if let Some(active) = self
            .concurrency
            .lock()
            .expect("concurrency mutex poisoned")
            .active
            .get_mut(request.key)
        {
            *active -= 1;
        }

        match request.value {
            "fail" => Err(EchoError(String::from("requested failure"))),
            "panic" => panic!("echo panic"),
            value => Ok(value),
        }
    }
}

struct Harness {
    queue: SingleInstanceQueue<EchoJob>,
    entered: Receiver<&'static str>,
    gate: Gate,
    reporter: Arc<RecordingReporter>,
}

impl Harness {
    fn await_entry(&self, expected: &str) {
        let value = self
            .entered
            .recv_timeout(PATIENCE)
            .expect("job did not start in time");
        assert_eq!(value, expected);
    }
}

fn echo_queue(
    reporter: Arc<dyn JobReporter>,
) -> (SingleInstanceQueue<EchoJob>, Receiver<&'static str>, Gate) {
    let (sender, entered) = mpsc::channel();
    let gate = Gate::default();
    let job = EchoJob {
        gate: gate.clone(),
        entered: Mutex::new(sender),
        runs: Mutex::new(Vec::new()),
        concurrency: Mutex::new(Concurrency::default()),
    };
    (SingleInstanceQueue::with_reporter(job, reporter), entered, gate)
}

#[fixture]
fn harness() -> Harness {
    let reporter = Arc::new(RecordingReporter::default());
    let (queue, entered, gate) = echo_queue(reporter.clone());
    Harness {
        queue,
        entered,
        gate,
        reporter,
    }
}

/// Reporter whose every callback panics.
struct PanickingReporter;

impl JobReporter for PanickingReporter {
    fn job_started(&self, _key: &str) {
        panic!("reporter failed on start");
    }

    fn job_coalesced(&self, _key: &str) {
        panic!("reporter failed on coalesce");
    }

    fn job_succeeded(&self, _key: &str, _elapsed: Duration) {
        panic!("reporter failed on success");
    }

    fn job_failed(&self, _key: &str, _elapsed: Duration, _error: &dyn std::error::Error) {
        panic!("reporter failed on failure");
    }
}

#[rstest]
fn submission_runs_and_clears_entry(harness: Harness) {
    let ticket = harness.queue.submit(echo("k", "one")).expect("submit");
    assert!(!ticket.is_coalesced());
    assert_eq!(ticket.key(), "k");

    assert_eq!(ticket.wait().expect("job outcome"), "one");
    assert!(harness.queue.wait_for_idle(PATIENCE));
    assert_eq!(harness.queue.queue_size(), 0);
    assert_eq!(harness.queue.job().runs(), ["one"]);
}

#[rstest]
fn mid_flight_submissions_coalesce_into_one_follow_up_with_latest_request(harness: Harness) {
    let first = harness.queue.submit(echo("k", "block-first")).expect("submit");
    harness.await_entry("block-first");

    let second = harness.queue.submit(echo("k", "second")).expect("submit");
    let third = harness.queue.submit(echo("k", "third")).expect("submit");
    assert!(second.is_coalesced());
    assert!(third.is_coalesced());
    assert_eq!(harness.queue.queue_size(), 1);
    assert_eq!(harness.queue.in_flight_keys(), ["k"]);

    harness.gate.open();

    assert_eq!(first.wait().expect("first outcome"), "block-first");
    assert_eq!(second.wait().expect("second outcome"), "third");
    assert_eq!(third.wait().expect("third outcome"), "third");
    assert!(harness.queue.wait_for_idle(PATIENCE));

    let job = harness.queue.job();
    assert_eq!(job.runs(), ["block-first", "third"]);
    assert_eq!(job.max_per_key(), 1);
}

#[rstest]
fn different_keys_run_concurrently(harness: Harness) {
    let alpha = harness.queue.submit(echo("alpha", "block-alpha")).expect("submit");
    let beta = harness.queue.submit(echo("beta", "block-beta")).expect("submit");

    let mut started = vec![
        harness.entered.recv_timeout(PATIENCE).expect("first start"),
        harness.entered.recv_timeout(PATIENCE).expect("second start"),
    ];
    started.sort_unstable();
    assert_eq!(started, ["block-alpha", "block-beta"]);
    assert_eq!(harness.queue.in_flight_keys(), ["alpha", "beta"]);

    harness.gate.open();
    assert_eq!(alpha.wait().expect("alpha outcome"), "block-alpha");
    assert_eq!(beta.wait().expect("beta outcome"), "block-beta");
}

#[rstest]
fn failure_is_delivered_and_key_accepts_new_work(harness: Harness) {
    let failure = harness
        .queue
        .execute_sync(echo("k", "fail"))
        .expect_err("job should fail");
    let error = failure.job_error().expect("job error");
    assert_eq!(error.to_string(), "echo failed: requested failure");
    assert_eq!(harness.queue.queue_size(), 0);

    let outcome = harness.queue.execute_sync(echo("k", "again"));
    assert_eq!(outcome.expect("second run"), "again");
}

#[rstest]
fn panicking_job_does_not_poison_the_queue(harness: Harness) {
    let failure = harness
        .queue
        .execute_sync(echo("k", "panic"))
        .expect_err("job should panic");
    match failure {
        JobFailure::Panicked { message } => assert_eq!(message, "echo panic"),
        other => panic!("expected panic failure, got {other:?}"),
    }
    assert!(harness.queue.wait_for_idle(PATIENCE));

    let outcome = harness.queue.execute_sync(echo("k", "recovered"));
    assert_eq!(outcome.expect("run after panic"), "recovered");
}

#[rstest]
fn waiting_with_timeout_reports_running_jobs(harness: Harness) {
    let ticket = harness.queue.submit(echo("k", "block-slow")).expect("submit");
    harness.await_entry("block-slow");

    assert!(ticket.wait_timeout(Duration::from_millis(20)).is_none());
    assert!(!ticket.is_finished());
    assert!(!harness.queue.wait_for_idle(Duration::from_millis(20)));

    harness.gate.open();
    let outcome = ticket.wait_timeout(PATIENCE).expect("finished in time");
    assert_eq!(outcome.expect("job outcome"), "block-slow");
    assert!(ticket.is_finished());
    assert!(harness.queue.wait_for_idle(PATIENCE));
}

#[rstest]
fn reporter_observes_lifecycle(harness: Harness) {
    let first = harness.queue.submit(echo("k", "block-first")).expect("submit");
    harness.await_entry("block-first");
    let follow_up = harness.queue.submit(echo("k", "fail")).expect("submit");
    harness.gate.open();

    first.wait().expect("first outcome");
    follow_up.wait().expect_err("follow-up should fail");

    let events = harness.reporter.events();
    assert_eq!(
        events,
        [
            JobEvent::Started(String::from("k")),
            JobEvent::Coalesced(String::from("k")),
            JobEvent::Succeeded(String::from("k")),
            JobEvent::Started(String::from("k")),
            JobEvent::Failed {
                key: String::from("k"),
                message: String::from("job failed: echo failed: requested failure"),
            },
        ]
    );
}

#[rstest]
fn cloned_handles_share_entries(harness: Harness) {
    let other = harness.queue.clone();
    let ticket = harness.queue.submit(echo("k", "block-shared")).expect("submit");
    harness.await_entry("block-shared");

    assert_eq!(other.in_flight_keys(), ["k"]);
    harness.gate.open();
    ticket.wait().expect("job outcome");
    assert!(other.wait_for_idle(PATIENCE));
}

#[rstest]
fn key_is_free_as_soon_as_the_waiter_returns(harness: Harness) {
    for _ in 0..50 {
        let outcome = harness.queue.execute_sync(echo("k", "again"));
        assert_eq!(outcome.expect("job outcome"), "again");
        assert_eq!(harness.queue.queue_size(), 0);
        assert!(harness.queue.in_flight_keys().is_empty());

        let ticket = harness.queue.submit(echo("k", "fresh")).expect("submit");
        assert!(!ticket.is_coalesced());
        assert_eq!(ticket.wait().expect("fresh outcome"), "fresh");
        assert_eq!(harness.queue.queue_size(), 0);
    }
}

#[rstest]
fn failed_waiter_sees_its_key_cleared(harness: Harness) {
    for _ in 0..50 {
        harness
            .queue
            .execute_sync(echo("k", "fail"))
            .expect_err("job should fail");
        assert_eq!(harness.queue.queue_size(), 0);
    }
}

#[test]
fn panicking_reporter_does_not_strand_tickets_or_keys() {
    let (queue, entered, gate) = echo_queue(Arc::new(PanickingReporter));

    let outcome = queue.execute_sync(echo("k", "one"));
    assert_eq!(outcome.expect("job outcome"), "one");
    assert!(queue.wait_for_idle(PATIENCE));

    let failure = queue
        .execute_sync(echo("k", "fail"))
        .expect_err("job should fail");
    assert!(failure.job_error().is_some());
    assert!(queue.wait_for_idle(PATIENCE));

    let first = queue.submit(echo("k", "block-first")).expect("submit");
    assert_eq!(
        entered.recv_timeout(PATIENCE).expect("job did not start in time"),
        "one"
    );
    assert_eq!(
        entered.recv_timeout(PATIENCE).expect("job did not start in time"),
        "fail"
    );
    assert_eq!(
        entered.recv_timeout(PATIENCE).expect("job did not start in time"),
        "block-first"
    );
    let second = queue.submit(echo("k", "second")).expect("coalesced submit");
    assert!(second.is_coalesced());

    gate.open();
    assert_eq!(first.wait().expect("first outcome"), "block-first");
    assert_eq!(second.wait().expect("second outcome"), "second");
    assert!(queue.wait_for_idle(PATIENCE));
    assert_eq!(queue.queue_size(), 0);
}
