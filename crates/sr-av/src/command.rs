//! Builder for executing external tool commands with timeout support.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use sr_core::{Error, Result};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Output captured from a successful tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// The child is killed if the wait is abandoned, whether through the timeout,
/// a cancellation token or the caller dropping the future.
///
/// # Example
///
/// ```no_run
/// use sr_av::ToolCommand;
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// # async fn example() -> sr_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .timeout(Duration::from_secs(10))
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path. No timeout is set.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Set or clear the maximum execution time.
    pub fn timeout_opt(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short name of the program, used in error messages.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Shell-quoted preview of the full command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|a| shell_quote(&a))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::EncoderLaunch`] if spawning the process fails.
    /// - [`Error::Timeout`] if the process outlives the timeout; it is killed.
    /// - [`Error::EncoderExecution`] if the process exits unsuccessfully; the
    ///   captured stderr is carried verbatim.
    pub async fn execute(&self) -> Result<ToolOutput> {
        self.run(None).await
    }

    /// Like [`execute`](Self::execute), but kills the process and returns
    /// [`Error::Cancelled`] as soon as `token` is cancelled.
    pub async fn execute_with_cancel(&self, token: &CancellationToken) -> Result<ToolOutput> {
        self.run(Some(token)).await
    }

    async fn run(&self, cancel: Option<&CancellationToken>) -> Result<ToolOutput> {
        let tool = self.tool_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            Error::launch(
                tool.clone(),
                format!("failed to spawn {}: {e}", self.program.display()),
            )
        })?;

        tracing::trace!(pid = ?child.id(), "spawned {tool}");

        let wait = child.wait_with_output();
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_elapsed| {
                    Error::Timeout {
                        tool: tool.clone(),
                        after: limit,
                    }
                }),
                None => Ok(wait.await),
            }
        };

        // Dropping the pending wait drops the child, which kills it.
        let waited = match cancel {
            Some(token) => tokio::select! {
                res = bounded => res,
                _ = token.cancelled() => Err(Error::Cancelled { tool: tool.clone() }),
            },
            None => bounded.await,
        };
        let output = waited??;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(Error::execution(
                tool,
                output.status.code(),
                tool_output.stderr,
            ));
        }

        Ok(tool_output)
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%,".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        assert!(matches!(result, Err(Error::EncoderLaunch { .. })));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr_verbatim() {
        let result = ToolCommand::new(PathBuf::from("sh"))
            .arg("-c")
            .arg(r#"printf "No such filter: 'zzz'" >&2; exit 1"#)
            .execute()
            .await;
        match result {
            Err(Error::EncoderExecution {
                tool,
                status,
                stderr,
            }) => {
                assert_eq!(tool, "sh");
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "No such filter: 'zzz'");
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let started = std::time::Instant::now();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "unexpected error: {err}");
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_kills_process() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .execute_with_cancel(&token)
            .await;
        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn command_line_quotes_when_needed() {
        let mut cmd = ToolCommand::new(PathBuf::from("/usr/bin/ffmpeg"));
        cmd.args(["-y", "-i", "my clip.png", "-filter_complex", "[0:v]scale=2:2[outv]"]);
        assert_eq!(
            cmd.command_line(),
            "/usr/bin/ffmpeg -y -i 'my clip.png' -filter_complex '[0:v]scale=2:2[outv]'"
        );
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(cmd.tool_name(), "ffmpeg");
    }
}
