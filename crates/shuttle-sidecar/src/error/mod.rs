//! Domain errors raised while running the sidecar and decoding its output.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O and JSON errors are wrapped in
//! `Arc` so the errors stay cheap to clone when several waiters observe the
//! same failed run.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::action::Action;

/// Errors arising from launching or talking to the sidecar process.
///
/// A non-zero exit status is *not* an error at this layer: the invoker
/// reports it in [`SidecarOutput`](crate::invoker::SidecarOutput) and leaves
/// the policy to the caller.
#[derive(Debug, Clone, Error)]
pub enum SidecarError {
    /// The sidecar process could not be spawned.
    #[error("sidecar '{executable}' failed to start for action {action}: {source}")]
    SpawnFailed {
        /// Executable that was launched.
        executable: Utf8PathBuf,
        /// Action being requested.
        action: Action,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The sidecar did not complete within the configured timeout.
    #[error("sidecar action {action} timed out after {timeout_ms}ms")]
    Timeout {
        /// Action being requested.
        action: Action,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// An I/O error occurred while communicating with the sidecar.
    #[error("I/O error running sidecar action {action}: {source}")]
    Io {
        /// Action being requested.
        action: Action,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The sidecar wrote output that cannot be handed to the JSON decoder.
    #[error("sidecar action {action} wrote invalid output: {message}")]
    InvalidOutput {
        /// Action being requested.
        action: Action,
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while encoding or decoding protocol documents.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// A protocol document could not be serialised to JSON.
    #[error("failed to serialise {document}: {source}")]
    Serialize {
        /// Human-readable name of the document.
        document: &'static str,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A protocol document could not be deserialised from JSON.
    #[error("failed to deserialise {document}: {source}")]
    Deserialize {
        /// Human-readable name of the document.
        document: &'static str,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl ProtocolError {
    pub(crate) fn serialize(document: &'static str, source: serde_json::Error) -> Self {
        Self::Serialize {
            document,
            source: Arc::new(source),
        }
    }

    pub(crate) fn deserialize(document: &'static str, source: serde_json::Error) -> Self {
        Self::Deserialize {
            document,
            source: Arc::new(source),
        }
    }
}
