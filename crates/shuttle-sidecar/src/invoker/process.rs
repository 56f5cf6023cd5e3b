//! Sidecar execution as a child process.

use std::io::{self, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use shuttle_config::Config;

use super::{SidecarInvoker, SidecarOutput};
use crate::action::Action;
use crate::error::SidecarError;

/// Tracing target for sidecar process operations.
const PROCESS_TARGET: &str = "shuttle_sidecar::process";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs the sidecar as a child process.
///
/// The command line is `<executable> <base args> --action=<action> <args>`.
/// Stdin is closed; stdout and stderr are drained on helper threads so a
/// chatty sidecar cannot block on a full pipe. When the run exceeds the
/// timeout the child is killed and [`SidecarError::Timeout`] is returned;
/// that is the only cancellation the invoker offers. The same deadline bounds
/// draining the pipes, so a descendant that inherited them and outlives the
/// child also ends the run with [`SidecarError::Timeout`].
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    executable: Utf8PathBuf,
    base_args: Vec<String>,
    timeout: Duration,
}

impl ProcessInvoker {
    /// Creates an invoker for the given executable.
    #[must_use]
    pub fn new(executable: impl Into<Utf8PathBuf>, base_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            base_args,
            timeout,
        }
    }

    /// Creates an invoker from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.sidecar_executable(),
            config.sidecar_args().to_vec(),
            config.sidecar_timeout(),
        )
    }

    /// Executable launched for each run.
    #[must_use]
    pub fn executable(&self) -> &Utf8Path {
        self.executable.as_path()
    }

    /// Wall-clock limit for a single run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, action: Action, args: &[String]) -> Command {
        let mut command = Command::new(self.executable.as_std_path());
        command
            .args(&self.base_args)
            .arg(format!("--action={action}"))
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl SidecarInvoker for ProcessInvoker {
    fn run(&self, action: Action, args: &[String]) -> Result<SidecarOutput, SidecarError> {
        let started = Instant::now();
        debug!(
            target: PROCESS_TARGET,
            executable = %self.executable,
            %action,
            extra_args = args.len(),
            "spawning sidecar process"
        );

        let mut child = self
            .command(action, args)
            .spawn()
            .map_err(|err| SidecarError::SpawnFailed {
                executable: self.executable.clone(),
                action,
                source: Arc::new(err),
            })?;

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());
        let deadline = started.checked_add(self.timeout);

        let status = wait_for_exit(action, &mut child, self.timeout)?;
        let stdout_bytes = collect(action, stdout_reader, deadline, self.timeout)?;
        let stderr_bytes = collect(action, stderr_reader, deadline, self.timeout)?;

        let elapsed = started.elapsed();
        debug!(
            target: PROCESS_TARGET,
            %action,
            ?status,
            stdout_bytes = stdout_bytes.len(),
            stderr_bytes = stderr_bytes.len(),
            elapsed_ms = millis(elapsed),
            "sidecar process exited"
        );

        let stdout = String::from_utf8(stdout_bytes).map_err(|err| SidecarError::InvalidOutput {
            action,
            message: format!("stdout is not valid UTF-8: {err}"),
        })?;
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        Ok(SidecarOutput::new(stdout, stderr, status.code().unwrap_or(-1)))
    }
}

type Reader = Option<Receiver<io::Result<Vec<u8>>>>;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn timed_out(action: Action, timeout: Duration) -> SidecarError {
    SidecarError::Timeout {
        action,
        timeout_ms: millis(timeout),
    }
}

/// Drains `pipe` on a detached thread that sends the bytes once the pipe
/// reaches end of file.
fn spawn_reader(pipe: Option<impl Read + Send + 'static>) -> Reader {
    pipe.map(|stream| {
        let (sender, receiver) = mpsc::sync_channel(1);
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let drained = BufReader::new(stream).read_to_end(&mut buffer);
            drop(sender.send(drained.map(|_| buffer)));
        });
        receiver
    })
}

/// Takes a reader's bytes, giving up at `deadline`.
///
/// A reader still blocked at the deadline is abandoned; it finishes on its
/// own once every holder of the pipe has closed it.
fn collect(
    action: Action,
    reader: Reader,
    deadline: Option<Instant>,
    timeout: Duration,
) -> Result<Vec<u8>, SidecarError> {
    let Some(receiver) = reader else {
        return Ok(Vec::new());
    };
    let received = match deadline {
        Some(at) => receiver.recv_timeout(at.saturating_duration_since(Instant::now())),
        None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(err)) => Err(SidecarError::Io {
            action,
            source: Arc::new(err),
        }),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                target: PROCESS_TARGET,
                %action,
                timeout_ms = millis(timeout),
                "sidecar exited but its output pipes stayed open past the timeout"
            );
            Err(timed_out(action, timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(SidecarError::Io {
            action,
            source: Arc::new(io::Error::other("sidecar output reader panicked")),
        }),
    }
}

/// Waits for the child to exit, killing it once `timeout` has elapsed.
fn wait_for_exit(
    action: Action,
    child: &mut Child,
    timeout: Duration,
) -> Result<ExitStatus, SidecarError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        %action,
                        timeout_ms = millis(timeout),
                        "sidecar timed out, killing process"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return Err(timed_out(action, timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(SidecarError::Io {
                    action,
                    source: Arc::new(err),
                });
            }
        }
    }
}
