//! `sh -c` command runner backed by tokio processes

use crate::error::{BuildError, BuildResult};
use crate::shell::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Runs commands through the system shell
#[derive(Debug, Default, Clone)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn shellout(&self, command: &str) -> BuildResult<CommandOutput> {
        debug!("Executing: {}", command);

        let output = Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BuildError::command_failed(command, e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        })
    }

    async fn shellout_verbose(&self, command: &str) -> BuildResult<CommandOutput> {
        debug!("Executing (streaming): {}", command);

        let mut child = Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::command_failed(command, e))?;

        let (stdout, stderr) = stream_child_output(&mut child).await;

        let status = child
            .wait()
            .await
            .map_err(|e| BuildError::command_failed(command, e))?;

        CommandOutput {
            stdout: stdout.join("\n"),
            stderr: stderr.join("\n"),
            code: status.code(),
        }
        .into_checked(command)
    }

    async fn interactive(&self, command: &str) -> BuildResult<i32> {
        debug!("Executing interactively: {}", command);

        let status = Self::command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| BuildError::command_failed(command, e))?;

        Ok(status.code().unwrap_or(-1))
    }
}

/// Stream stdout and stderr of a child process into the log.
///
/// Returns the collected (stdout, stderr) lines once both pipes close.
async fn stream_child_output(child: &mut Child) -> (Vec<String>, Vec<String>) {
    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (stdout_lines, stderr_lines);
    };

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        info!("{}", line);
                        stdout_lines.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        info!("{}", line);
                        stderr_lines.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
        }
    }

    (stdout_lines, stderr_lines)
}
