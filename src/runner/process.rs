//! Process-spawning tool runner

use super::{display_dir, error_tail, stream_output, Invocation, RunOutput, Stream, ToolRunner};
use crate::error::{ComposerError, ComposerResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Runs tools as child processes of the buildpack
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    echo: bool,
}

impl ProcessRunner {
    /// Runner that echoes tool output to the build log
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Runner that only captures output
    #[cfg(test)]
    pub(crate) fn quiet() -> Self {
        Self { echo: false }
    }

    fn spawn(&self, invocation: &Invocation) -> ComposerResult<Child> {
        debug!(
            "Running `{}` from directory '{}'",
            invocation.command_line(),
            display_dir(&invocation.dir)
        );

        Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ComposerError::launch(invocation.command_line(), &invocation.dir, e))
    }

    /// Stream the child's output, echoing the selected streams
    async fn collect(
        &self,
        invocation: &Invocation,
        mut child: Child,
        echo_stdout: bool,
    ) -> ComposerResult<RunOutput> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ComposerError::Internal("child stdout not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ComposerError::Internal("child stderr not piped".to_string()))?;

        let echo = self.echo;
        let on_line = move |stream: Stream, line: &str| {
            if !echo {
                return;
            }
            match stream {
                Stream::Stdout if echo_stdout => println!("      {}", line),
                Stream::Stdout => {}
                Stream::Stderr => eprintln!("      {}", line),
            }
        };

        let (stdout_lines, stderr_lines) = stream_output(stdout, stderr, &on_line).await;

        let status = child.wait().await.map_err(|e| {
            ComposerError::io(format!("waiting for `{}`", invocation.command_line()), e)
        })?;

        let mut captured = stdout_lines.join("\n");
        if !stdout_lines.is_empty() {
            captured.push('\n');
        }

        Ok(RunOutput {
            stdout: captured,
            stderr: error_tail(&stderr_lines),
            code: status.code(),
        })
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> ComposerResult<()> {
        let child = self.spawn(invocation)?;
        let output = self.collect(invocation, child, true).await?;
        output.ensure_status(invocation, &[0])
    }

    async fn run_capturing(&self, invocation: &Invocation) -> ComposerResult<RunOutput> {
        let child = self.spawn(invocation)?;
        self.collect(invocation, child, false).await
    }
}
