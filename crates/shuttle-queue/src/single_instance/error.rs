//! Failures observed by queue callers.

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised when a submission cannot be dispatched.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker for job '{key}': {source}")]
    WorkerSpawn {
        /// Key of the rejected submission.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Why a job did not produce an outcome.
///
/// Every ticket waiting on the same execution receives a clone, so the job
/// error is shared behind an `Arc`.
#[derive(Debug, Error)]
pub enum JobFailure<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// The job returned an error.
    #[error("job failed: {0}")]
    Failed(#[source] Arc<E>),

    /// The job panicked; the queue caught the panic and kept running.
    #[error("job panicked: {message}")]
    Panicked {
        /// Panic payload when it was a string, otherwise a placeholder.
        message: String,
    },

    /// The submission was never dispatched.
    #[error(transparent)]
    Rejected(QueueError),
}

impl<E> JobFailure<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// The job error, when the job itself returned one.
    #[must_use]
    pub fn job_error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error.as_ref()),
            Self::Panicked { .. } | Self::Rejected(_) => None,
        }
    }
}

impl<E> Clone for JobFailure<E>
where
    E: StdError + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        match self {
            Self::Failed(error) => Self::Failed(Arc::clone(error)),
            Self::Panicked { message } => Self::Panicked {
                message: message.clone(),
            },
            Self::Rejected(error) => Self::Rejected(error.clone()),
        }
    }
}
