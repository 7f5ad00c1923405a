//! External command execution behind an injectable seam.
//!
//! The archive filters that shell out to `unrar` and `7zr` go through the
//! [`Executor`] trait so tests can substitute a fake and never spawn real
//! binaries. Production code uses [`SystemExecutor`].

use std::ffi::OsString;
use std::io;
use std::process::{Command, Output, Stdio};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Exit status code (`None` if terminated by a signal).
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over spawning external commands.
///
/// Arguments are [`OsString`]s because they routinely carry filesystem
/// paths. Implementations must capture the child's output rather than
/// inheriting the parent's stdio; the engine reports tool failures through
/// its own error types and keeps the tools quiet otherwise.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args` to completion and report its outcome.
    ///
    /// A non-zero exit is *not* an `Err`; callers inspect
    /// [`ExecResult::success`]. `Err` means the command could not be
    /// spawned or waited on at all.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`io::Error`] when the program cannot be
    /// found or started.
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ExecResult>;
}

/// Production [`Executor`] that delegates to [`std::process::Command`].
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        Ok(ExecResult::from(output))
    }
}
