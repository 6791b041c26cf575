//! External tool invocation
//!
//! Provides a trait for running the package manager that can be implemented
//! by different backends:
//! - `ProcessRunner`: spawns real processes
//! - `RecordingRunner`: records invocations and replays scripted results
//!
//! Runners never decide which exit codes are acceptable for a subcommand;
//! `run` treats any non-zero exit as a failure and `run_capturing` hands the
//! status back to the caller.

mod process;
mod recording;

pub use process::ProcessRunner;
pub use recording::RecordingRunner;

use crate::error::{ComposerError, ComposerResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Max number of stderr lines kept for error messages
const ERROR_TAIL_LINES: usize = 50;

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// Indexes into `args` that must not appear in logs
    redacted: Vec<usize>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: dir.into(),
            env: BTreeMap::new(),
            redacted: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument that is masked in `command_line`
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.redacted.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Whether any argument equals `arg`
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Printable command line with secrets masked
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        for (i, arg) in self.args.iter().enumerate() {
            if self.redacted.contains(&i) {
                parts.push("***".to_string());
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl RunOutput {
    /// A successful run printing `stdout`
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// A run that exited with `code`
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Fail unless the exit code is one of `accepted`
    pub fn ensure_status(&self, invocation: &Invocation, accepted: &[i32]) -> ComposerResult<()> {
        match self.code {
            Some(code) if accepted.contains(&code) => Ok(()),
            code => Err(ComposerError::execution(
                invocation.command_line(),
                &invocation.dir,
                code,
                &self.stderr,
            )),
        }
    }
}

/// Abstract tool runner interface
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion, echoing output to the build log
    async fn run(&self, invocation: &Invocation) -> ComposerResult<()>;

    /// Run to completion and return stdout whatever the exit status
    async fn run_capturing(&self, invocation: &Invocation) -> ComposerResult<RunOutput>;
}

/// Output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

/// Keep the last `ERROR_TAIL_LINES` lines of captured stderr
pub(crate) fn error_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Read both pipes line by line until EOF, calling `on_line` for each line.
///
/// Returns `(stdout_lines, stderr_lines)`. Invalid UTF-8 is replaced rather
/// than ending the stream early.
pub(crate) async fn stream_output<O, E>(
    stdout: O,
    stderr: E,
    on_line: &(dyn Fn(Stream, &str) + Send + Sync),
) -> (Vec<String>, Vec<String>)
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout_reader = BufReader::new(stdout).split(b'\n');
    let mut stderr_reader = BufReader::new(stderr).split(b'\n');

    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            segment = stdout_reader.next_segment(), if !stdout_done => {
                match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        on_line(Stream::Stdout, &line);
                        stdout_lines.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
            segment = stderr_reader.next_segment(), if !stderr_done => {
                match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        on_line(Stream::Stderr, &line);
                        stderr_lines.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
        }
    }

    (stdout_lines, stderr_lines)
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Format a directory for log lines
pub(crate) fn display_dir(dir: &Path) -> String {
    dir.display().to_string()
}
