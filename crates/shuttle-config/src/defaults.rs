use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Executable launched when no sidecar path is configured.
pub const DEFAULT_SIDECAR_EXECUTABLE: &str = "puppet-languageserver-sidecar";

/// Wall-clock limit applied to a single sidecar run, in seconds.
pub const DEFAULT_SIDECAR_TIMEOUT_SECS: u64 = 300;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default sidecar executable as an owned path.
#[must_use]
pub fn default_sidecar_executable() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SIDECAR_EXECUTABLE)
}

/// Default sidecar timeout in seconds.
#[must_use]
pub const fn default_sidecar_timeout_secs() -> u64 {
    DEFAULT_SIDECAR_TIMEOUT_SECS
}

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
