//! Structured telemetry initialisation for the language-server process.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use shuttle_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the
/// global state again.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable `log_filter` and
/// [`TelemetryError::Subscriber`] when another subscriber is already
/// installed globally.
///
/// # Examples
///
/// ```rust
/// use shuttle_config::Config;
/// use shuttle_queue::telemetry;
///
/// # fn main() -> Result<(), shuttle_queue::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn build_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            // Stdout belongs to the language-server protocol stream.
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
