//! Queue job that refreshes a connection's metadata from the sidecar.

mod resolver;

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use shuttle_session::{CacheError, ImportSummary, ObjectCache};
use shuttle_sidecar::{
    Action, ActionPayload, AggregateMetadata, MetadataEntry, MetadataList, ObjectKind, Origin,
    ProtocolError, PuppetClass, PuppetFunction, PuppetType, SidecarError, SidecarInvoker,
};

use crate::single_instance::{JobTicket, QueueError, QueueJob, SingleInstanceQueue};

pub use self::resolver::ConnectionResolver;

/// Tracing target for sidecar jobs.
const SIDECAR_JOB_TARGET: &str = "shuttle_queue::sidecar_job";

/// Deduplication key for `action` on `connection_id`.
///
/// ```
/// use shuttle_queue::job_key;
/// use shuttle_sidecar::Action;
///
/// assert_eq!(job_key(Action::DefaultClasses, "conn-1"), "default_classes-conn-1");
/// ```
#[must_use]
pub fn job_key(action: Action, connection_id: &str) -> String {
    format!("{action}-{connection_id}")
}

/// Parameters of one sidecar refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRequest {
    /// Sidecar action to run.
    pub action: Action,
    /// Arguments appended after the connection's base arguments.
    pub args: Vec<String>,
    /// Absorb execution failures instead of failing the job.
    pub handle_errors: bool,
    /// Connection whose cache receives the results.
    pub connection_id: String,
}

impl SidecarRequest {
    /// Builds a request.
    #[must_use]
    pub fn new(
        action: Action,
        args: Vec<String>,
        handle_errors: bool,
        connection_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            args,
            handle_errors,
            connection_id: connection_id.into(),
        }
    }

    /// Deduplication key of this request.
    #[must_use]
    pub fn key(&self) -> String {
        job_key(self.action, &self.connection_id)
    }
}

/// Errors raised by a sidecar refresh.
#[derive(Debug, Clone, Error)]
pub enum SidecarJobError {
    /// No live connection has the requested identifier.
    #[error("unknown connection '{connection_id}'")]
    UnknownConnection {
        /// Identifier that failed to resolve.
        connection_id: String,
    },

    /// The connection exists but has no session state.
    #[error("connection '{connection_id}' has no session state")]
    MissingSession {
        /// Identifier of the connection.
        connection_id: String,
    },

    /// The sidecar could not be run.
    #[error(transparent)]
    Invocation(#[from] SidecarError),

    /// The sidecar exited with a failure status.
    #[error("sidecar action {action} exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Action that was run.
        action: Action,
        /// Exit status reported by the invoker.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The sidecar output could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The decoded entries could not be written to the cache.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// What a successful refresh did.
#[derive(Debug, Clone)]
pub enum SidecarOutcome {
    /// Entries were imported, one summary per kind touched.
    Imported(Vec<ImportSummary>),
    /// The refresh failed and the request asked for failures to be absorbed.
    /// The cache was left untouched.
    Suppressed(SidecarJobError),
}

impl SidecarOutcome {
    /// Import summaries, empty when the failure was suppressed.
    #[must_use]
    pub fn summaries(&self) -> &[ImportSummary] {
        match self {
            Self::Imported(summaries) => summaries,
            Self::Suppressed(_) => &[],
        }
    }

    /// Returns `true` when a failure was absorbed.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed(_))
    }
}

/// Runs the sidecar for a connection and imports the result into its cache.
pub struct SidecarQueueJob<R, I> {
    resolver: R,
    invoker: I,
}

impl<R, I> SidecarQueueJob<R, I>
where
    R: ConnectionResolver,
    I: SidecarInvoker,
{
    /// Binds the job to its collaborators.
    #[must_use]
    pub const fn new(resolver: R, invoker: I) -> Self {
        Self { resolver, invoker }
    }

    /// Connection lookups used by the job.
    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Sidecar invoker used by the job.
    #[must_use]
    pub const fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Invokes the sidecar and imports its output; nothing is written to the
    /// cache unless the whole document decoded.
    fn refresh(
        &self,
        action: Action,
        args: &[String],
        cache: &ObjectCache,
    ) -> Result<Vec<ImportSummary>, SidecarJobError> {
        let output = self.invoker.run(action, args)?;
        if !output.is_success() {
            return Err(SidecarJobError::NonZeroExit {
                action,
                status: output.status(),
                stderr: output.stderr().to_owned(),
            });
        }

        let origin = action.origin();
        let stdout = output.stdout();
        match action.payload() {
            ActionPayload::Aggregate => {
                let aggregate = AggregateMetadata::from_json(stdout)?;
                log_skipped(action, aggregate.skipped());
                cache
                    .import_aggregate(aggregate, origin)
                    .map_err(SidecarJobError::from)
            }
            ActionPayload::List(ObjectKind::Class) => {
                import_list::<PuppetClass>(action, stdout, cache, origin)
            }
            ActionPayload::List(ObjectKind::Function) => {
                import_list::<PuppetFunction>(action, stdout, cache, origin)
            }
            ActionPayload::List(ObjectKind::Type) => {
                import_list::<PuppetType>(action, stdout, cache, origin)
            }
        }
    }
}

fn import_list<T: MetadataEntry>(
    action: Action,
    stdout: &str,
    cache: &ObjectCache,
    origin: Origin,
) -> Result<Vec<ImportSummary>, SidecarJobError> {
    let list = MetadataList::<T>::from_json(stdout)?;
    log_skipped(action, list.skipped());
    Ok(vec![cache.import(list, origin)?])
}

fn log_skipped(action: Action, skipped: usize) {
    if skipped > 0 {
        warn!(
            target: SIDECAR_JOB_TARGET,
            %action,
            skipped,
            "sidecar output contained entries without a usable key"
        );
    }
}

impl<R, I> QueueJob for SidecarQueueJob<R, I>
where
    R: ConnectionResolver + 'static,
    I: SidecarInvoker + 'static,
{
    type Request = SidecarRequest;
    type Outcome = SidecarOutcome;
    type Error = SidecarJobError;

    fn key(&self, request: &SidecarRequest) -> String {
        request.key()
    }

    fn execute(&self, request: &SidecarRequest) -> Result<SidecarOutcome, SidecarJobError> {
        let connection_id = request.connection_id.as_str();
        let connection = self
            .resolver
            .connection_from_connection_id(connection_id)
            .ok_or_else(|| SidecarJobError::UnknownConnection {
                connection_id: connection_id.to_owned(),
            })?;

        let mut args = self.resolver.sidecar_args_from_connection(&connection);
        args.extend(request.args.iter().cloned());

        let session = self
            .resolver
            .session_state_from_connection(&connection)
            .ok_or_else(|| SidecarJobError::MissingSession {
                connection_id: connection_id.to_owned(),
            })?;

        match self.refresh(request.action, &args, session.object_cache()) {
            Ok(summaries) => {
                debug!(
                    target: SIDECAR_JOB_TARGET,
                    action = %request.action,
                    connection_id,
                    kinds = summaries.len(),
                    "sidecar refresh imported"
                );
                Ok(SidecarOutcome::Imported(summaries))
            }
            Err(error) if request.handle_errors => {
                warn!(
                    target: SIDECAR_JOB_TARGET,
                    action = %request.action,
                    connection_id,
                    error = %error,
                    "sidecar refresh failed; error suppressed"
                );
                Ok(SidecarOutcome::Suppressed(error))
            }
            Err(error) => Err(error),
        }
    }
}

impl<R, I> fmt::Debug for SidecarQueueJob<R, I> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("SidecarQueueJob").finish_non_exhaustive()
    }
}

/// Queue bound to [`SidecarQueueJob`].
pub type SidecarQueue<R, I> = SingleInstanceQueue<SidecarQueueJob<R, I>>;

/// Ticket returned by `SidecarQueue::enqueue`.
pub type SidecarTicket = JobTicket<SidecarOutcome, SidecarJobError>;

impl<R, I> SingleInstanceQueue<SidecarQueueJob<R, I>>
where
    R: ConnectionResolver + 'static,
    I: SidecarInvoker + 'static,
{
    /// Queues a refresh of `action` for `connection_id`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::WorkerSpawn`] when no worker could be started.
    pub fn enqueue(
        &self,
        action: Action,
        args: Vec<String>,
        handle_errors: bool,
        connection_id: impl Into<String>,
    ) -> Result<SidecarTicket, QueueError> {
        self.submit(SidecarRequest::new(
            action,
            args,
            handle_errors,
            connection_id,
        ))
    }
}
