//! Background refresh of sidecar metadata.
//!
//! [`SingleInstanceQueue`] deduplicates work by key so that at most one
//! execution per key is in flight, re-running once with the latest request
//! when submissions arrive mid-flight. [`SidecarQueueJob`] is the job bound
//! to it in the language server: it runs the sidecar for a connection and
//! imports the decoded metadata into that connection's object cache.

pub mod reporter;
pub mod sidecar_job;
pub mod single_instance;
pub mod telemetry;

pub use self::reporter::{JobReporter, StructuredJobReporter};
pub use self::sidecar_job::{
    ConnectionResolver, SidecarJobError, SidecarOutcome, SidecarQueue, SidecarQueueJob,
    SidecarRequest, SidecarTicket, job_key,
};
pub use self::single_instance::{
    JobFailure, JobResult, JobTicket, QueueError, QueueJob, SingleInstanceQueue,
};

#[cfg(test)]
mod tests;
