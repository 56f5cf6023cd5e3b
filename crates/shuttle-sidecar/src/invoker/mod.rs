//! The boundary between the refresh engine and the sidecar process.
//!
//! [`SidecarInvoker`] abstracts "run the sidecar for this action and hand
//! back what it printed". The production implementation is
//! [`ProcessInvoker`], which spawns a child process; tests substitute doubles
//! that return canned output without spawning anything.
//!
//! Invocation is blocking. Callers that must not stall other work run the
//! invoker on a worker thread of their own. There is no retry logic here.

mod process;

pub use self::process::ProcessInvoker;

use crate::action::Action;
use crate::error::SidecarError;

/// Raw result of one sidecar run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarOutput {
    stdout: String,
    stderr: String,
    status: i32,
}

impl SidecarOutput {
    /// Creates an output record.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    /// Creates a record for a run that exited with status 0.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(stdout, String::new(), 0)
    }

    /// Everything the sidecar wrote to stdout.
    #[must_use]
    pub const fn stdout(&self) -> &str {
        self.stdout.as_str()
    }

    /// Everything the sidecar wrote to stderr.
    #[must_use]
    pub const fn stderr(&self) -> &str {
        self.stderr.as_str()
    }

    /// Exit status; `-1` when the process was terminated by a signal.
    #[must_use]
    pub const fn status(&self) -> i32 {
        self.status
    }

    /// Returns `true` when the sidecar exited with status 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Runs the sidecar for an action.
///
/// # Example
///
/// ```
/// use shuttle_sidecar::{Action, SidecarError, SidecarInvoker, SidecarOutput};
///
/// struct CannedInvoker;
///
/// impl SidecarInvoker for CannedInvoker {
///     fn run(&self, _action: Action, _args: &[String]) -> Result<SidecarOutput, SidecarError> {
///         Ok(SidecarOutput::success("[]"))
///     }
/// }
///
/// let output = CannedInvoker.run(Action::DefaultClasses, &[]).unwrap();
/// assert!(output.is_success());
/// ```
pub trait SidecarInvoker: Send + Sync {
    /// Runs the sidecar for `action` with the extra `args`, blocking until it
    /// exits.
    ///
    /// # Errors
    ///
    /// Returns a [`SidecarError`] when the process cannot be launched, times
    /// out, or its output cannot be collected. A non-zero exit status is
    /// reported through [`SidecarOutput::status`], not as an error.
    fn run(&self, action: Action, args: &[String]) -> Result<SidecarOutput, SidecarError>;
}

impl<T: SidecarInvoker + ?Sized> SidecarInvoker for std::sync::Arc<T> {
    fn run(&self, action: Action, args: &[String]) -> Result<SidecarOutput, SidecarError> {
        (**self).run(action, args)
    }
}
