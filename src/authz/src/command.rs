//! Bounded external command execution
//!
//! The credential helper is the only process the service ever starts. It goes
//! through [`CommandRunner`] so the token logic never touches processes
//! directly and tests can substitute a fake.

use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Port for running an external command with a hard time limit
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`
    ///
    /// # Errors
    ///
    /// - [`AuthzError::CredentialTimeout`] if the command outlives `timeout`;
    ///   the process has been killed by then
    /// - [`AuthzError::CommandFailed`] on a non-zero exit, carrying stderr
    /// - [`AuthzError::Io`] if the process could not be started
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let command_line = format_command(program, args);
        debug!("Executing command: {}", command_line);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AuthzError::Internal("child stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AuthzError::Internal("child stderr not captured".to_string()))?;

        let read_stdout = async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        };
        let read_stderr = async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        };

        let outcome = tokio::time::timeout(timeout, async {
            tokio::try_join!(child.wait(), read_stdout, read_stderr)
        })
        .await;

        let (status, stdout, stderr) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!("Command timed out after {:?}, killing: {}", timeout, command_line);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out command: {}", e);
                }
                return Err(AuthzError::CredentialTimeout {
                    command: command_line,
                    timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            return Err(AuthzError::CommandFailed {
                command: command_line,
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn format_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
