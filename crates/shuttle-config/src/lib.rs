//! Shared configuration for the sidecar refresh engine.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! (`--config-path` or `SHUTTLE_CONFIG_PATH`), then `SHUTTLE_*` environment
//! variables, then command-line flags. The resolved [`Config`] tells the
//! process invoker which sidecar to launch and how long a single lookup may
//! run, and tells the telemetry layer how to format log output.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoResult};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SIDECAR_EXECUTABLE, DEFAULT_SIDECAR_TIMEOUT_SECS,
    default_log_filter, default_log_filter_string, default_log_format,
    default_sidecar_executable, default_sidecar_timeout_secs,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for the refresh engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SHUTTLE")]
pub struct Config {
    /// Sidecar executable launched for every lookup.
    #[ortho_config(default = defaults::default_sidecar_executable())]
    pub sidecar_executable: Utf8PathBuf,
    /// Arguments placed before the action flag on every invocation.
    #[serde(default)]
    pub sidecar_args: Vec<String>,
    /// Wall-clock limit for one sidecar run, in seconds.
    #[ortho_config(default = defaults::DEFAULT_SIDECAR_TIMEOUT_SECS)]
    pub sidecar_timeout_secs: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log lines.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sidecar_executable: default_sidecar_executable(),
            sidecar_args: Vec::new(),
            sidecar_timeout_secs: DEFAULT_SIDECAR_TIMEOUT_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and any
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when a layer cannot be parsed or merged.
    pub fn load() -> OrthoResult<Self> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration with `args` standing in for the command line.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns an error when a layer cannot be parsed or merged.
    pub fn load_from_iter<I, T>(args: I) -> OrthoResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Sidecar executable launched for every lookup.
    #[must_use]
    pub fn sidecar_executable(&self) -> &Utf8Path {
        self.sidecar_executable.as_path()
    }

    /// Base arguments passed to the sidecar ahead of the action flag.
    #[must_use]
    pub fn sidecar_args(&self) -> &[String] {
        &self.sidecar_args
    }

    /// Wall-clock limit for one sidecar run.
    #[must_use]
    pub const fn sidecar_timeout(&self) -> Duration {
        Duration::from_secs(self.sidecar_timeout_secs)
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log lines.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
