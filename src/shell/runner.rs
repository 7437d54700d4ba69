//! Command runner abstraction

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a non-zero exit into `BuildError::Shellout`
    pub fn into_checked(self, command: &str) -> BuildResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(BuildError::Shellout {
                command: command.to_string(),
                code: self.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Executes shell commands and reports their output.
///
/// Implementations block the calling task until the command finishes.
/// Timeouts and cancellation are the implementation's concern; a killed
/// command is reported like any other failure.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command and return its output whatever the exit status
    async fn shellout(&self, command: &str) -> BuildResult<CommandOutput>;

    /// Run a command, failing with `BuildError::Shellout` on non-zero exit
    async fn shellout_checked(&self, command: &str) -> BuildResult<CommandOutput> {
        self.shellout(command).await?.into_checked(command)
    }

    /// Like `shellout_checked`, with output forwarded to the log as it arrives
    async fn shellout_verbose(&self, command: &str) -> BuildResult<CommandOutput> {
        self.shellout_checked(command).await
    }

    /// Run a command attached to the current terminal, returning its exit code
    async fn interactive(&self, command: &str) -> BuildResult<i32>;
}
