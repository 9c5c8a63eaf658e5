//! External tool runner.
//!
//! Runs ffprobe/ffmpeg non-interactively, captures both output streams and
//! enforces a per-invocation timeout. A process that outlives its timeout is
//! killed.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use metrics::histogram;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Histogram of tool run time in seconds, labelled by tool.
pub const TOOL_DURATION_SECONDS: &str = "vqc_tool_duration_seconds";

/// Builder for one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Program name or path
    program: String,
    /// Arguments
    args: Vec<OsString>,
    /// Timeout for the whole run
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the tool to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; see [`ToolOutput::into_success`].
    pub async fn run(&self) -> MediaResult<ToolOutput> {
        check_tool(&self.program)?;

        debug!(
            "Running {} {}",
            self.program,
            self.args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let started = Instant::now();
        let output_future = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, output_future).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the future kills the child.
                    warn!("{} timed out after {:?}, killing process", self.program, timeout);
                    return Err(MediaError::Timeout {
                        tool: self.program.clone(),
                        secs: timeout.as_secs(),
                    });
                }
            },
            None => output_future.await?,
        };

        histogram!(TOOL_DURATION_SECONDS, "tool" => self.program.clone())
            .record(started.elapsed().as_secs_f64());

        Ok(ToolOutput {
            tool: self.program.clone(),
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Captured output of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a non-zero exit into [`MediaError::ToolFailed`], keeping at most
    /// `max_stderr` characters of diagnostic text.
    pub fn into_success(self, max_stderr: usize) -> MediaResult<Self> {
        if self.success {
            return Ok(self);
        }
        Err(MediaError::tool_failed(
            self.tool,
            self.exit_code,
            truncate_chars(&self.stderr, max_stderr),
        ))
    }
}

/// Keep the first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Resolve a tool on PATH (or as a path).
pub fn check_tool(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::ToolNotFound {
        tool: program.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("žluťoučký", 4), "žluť");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let err = ToolCommand::new("definitely-not-a-real-tool-vqc")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_exit_code_and_stderr() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo out; echo diagnostic >&2; exit 3"])
            .run()
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");

        let err = output.into_success(4).unwrap_err();
        assert_eq!(err.to_string(), "sh failed (exit code 3): diag");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let err = ToolCommand::new("sh")
            .args(["-c", "sleep 5"])
            .timeout(Duration::from_millis(100))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout { .. }));
    }
}
