//! The repetition loop.
//!
//! [`RepeatRunner`] invokes a [`Launcher`] a fixed number of times, strictly in
//! sequence, forwarding the same arguments each time. After every invocation it
//! prints the remaining count (`N`, `N-1`, ..., `1`) and moves on. Failures are
//! logged and recorded but never retried, and they never stop the loop.
//!
//! # Example
//!
//! ```no_run
//! use simrepeat_core::platform::PlatformInstall;
//! use simrepeat_core::runner::{ProcessLauncher, RepeatRunner};
//!
//! let launcher = ProcessLauncher::new(PlatformInstall::new("/opt/isaac-sim"));
//! let mut runner = RepeatRunner::new(launcher, Vec::new());
//!
//! let report = runner.run(3, &mut std::io::stdout()).unwrap();
//! assert_eq!(report.invocations(), 3);
//! ```

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitStatus;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::platform::PlatformInstall;
use crate::report::{duration_ms, IterationRecord, RunReport};

/// Exit code used when the command does not exist.
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

/// Exit code used when the command exists but cannot be executed.
pub const NOT_EXECUTABLE_EXIT_CODE: i32 = 126;

/// Errors that stop the loop itself.
///
/// A failing invocation is not one of these; see [`InvocationStatus`].
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Writing the counter line failed.
    #[error("failed to write progress output: {0}")]
    Output(#[from] io::Error),
}

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    /// The command exited with status 0.
    Success,
    /// The command ran and exited unsuccessfully, or was killed by a signal
    /// (`code` is then `128 + signal`).
    Failed { code: i32 },
    /// The command could not be started.
    NotLaunched { code: i32, reason: String },
}

impl InvocationStatus {
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if status.success() {
            return Self::Success;
        }
        let code = status
            .code()
            .or_else(|| signal_exit_code(&status))
            .unwrap_or(1);
        Self::Failed { code }
    }

    pub fn from_spawn_error(err: &io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => NOT_FOUND_EXIT_CODE,
            _ => NOT_EXECUTABLE_EXIT_CODE,
        };
        Self::NotLaunched {
            code,
            reason: err.to_string(),
        }
    }

    /// Shell-style exit code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed { code } | Self::NotLaunched { code, .. } => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(unix)]
fn signal_exit_code(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + sig)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Runs the external command once.
///
/// Implementations block until the command has finished.
pub trait Launcher {
    fn launch(&mut self, args: &[OsString]) -> InvocationStatus;

    /// The full command line for `args`, used in reports.
    fn command_line(&self, args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }
}

/// Launches the platform's test runner as a child process.
///
/// The child inherits stdin, stdout, stderr, the environment and the working
/// directory.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    platform: PlatformInstall,
}

impl ProcessLauncher {
    pub fn new(platform: PlatformInstall) -> Self {
        Self { platform }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, args: &[OsString]) -> InvocationStatus {
        let program = self.platform.interpreter_path();
        debug!(program = %program.display(), "Spawning test runner");

        match self.platform.command(args).status() {
            Ok(status) => InvocationStatus::from_exit_status(status),
            Err(e) => InvocationStatus::from_spawn_error(&e),
        }
    }

    fn command_line(&self, args: &[OsString]) -> Vec<String> {
        self.platform.command_line(args)
    }
}

/// Invokes a [`Launcher`] a fixed number of times.
pub struct RepeatRunner<L> {
    launcher: L,
    args: Vec<OsString>,
}

impl<L: Launcher> RepeatRunner<L> {
    /// Creates a runner that forwards `args` unchanged on every invocation.
    pub fn new(launcher: L, args: Vec<OsString>) -> Self {
        Self { launcher, args }
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs the command `count` times.
    ///
    /// After each invocation the remaining count is written to `out` on its own
    /// line, before decrementing, so the lines read `count` down to `1`. With
    /// `count == 0` nothing is launched and nothing is written.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::Output`] if writing to `out` fails. Invocation failures
    ///   are recorded in the returned report instead.
    pub fn run<W: Write>(&mut self, count: u64, out: &mut W) -> Result<RunReport, RunnerError> {
        let mut report = RunReport::new(count, self.launcher.command_line(&self.args));
        info!(count, "Starting repeat run");

        let mut remaining = count;
        while remaining > 0 {
            let iteration = count - remaining + 1;
            let span = info_span!("iteration", iteration, remaining);
            let _enter = span.enter();

            let started_at = Utc::now();
            let start = Instant::now();
            let status = self.launcher.launch(&self.args);
            let elapsed = start.elapsed();

            match &status {
                InvocationStatus::Success => {
                    let elapsed_ms = duration_ms(elapsed);
                    debug!(elapsed_ms, "Invocation succeeded");
                }
                InvocationStatus::Failed { code } => {
                    warn!(code, "Test runner exited unsuccessfully");
                }
                InvocationStatus::NotLaunched { code, reason } => {
                    warn!(code, %reason, "Test runner could not be launched");
                }
            }

            writeln!(out, "{}", remaining)?;
            out.flush()?;

            let record = IterationRecord::new(iteration, remaining, &status, started_at, elapsed);
            report.push(record);
            remaining -= 1;
        }

        report.finish();
        info!(
            invocations = report.invocations(),
            failures = report.failures(),
            "Repeat run finished"
        );
        Ok(report)
    }
}
