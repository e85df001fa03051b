//! External tool invocation
//!
//! Tools are configured as a command string (`"whisper"`,
//! `"python3 -m edge_tts"`). Arguments are always passed as discrete argv
//! entries; nothing goes through a shell.

use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::PipelineError;

/// Program plus leading arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    leading_args: Vec<String>,
}

impl CommandSpec {
    /// Split a configured command line on whitespace
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            leading_args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion, killing the child if `timeout` elapses
    pub async fn run<I, S>(&self, args: I, timeout: Duration) -> Result<Output, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| PipelineError::Timeout(timeout.as_millis() as u64))?
            .map_err(|e| PipelineError::Io(format!("failed to run {}: {}", self.program, e)))
    }
}

/// Last line of stderr, for log messages
pub(crate) fn stderr_tail(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}
