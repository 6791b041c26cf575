//! Deterministic tool runner that records invocations

use super::{Invocation, RunOutput, ToolRunner};
use crate::error::{ComposerError, ComposerResult};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Script {
    /// Matches invocations that carry this argument
    subcommand: String,
    output: RunOutput,
}

/// Runner that never spawns anything
///
/// Every invocation is recorded. Invocations whose arguments contain a
/// scripted subcommand get the scripted output; everything else succeeds
/// with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    scripts: Vec<Script>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to invocations of `subcommand` with `output`
    pub fn with_output(mut self, subcommand: &str, output: RunOutput) -> Self {
        self.scripts.push(Script {
            subcommand: subcommand.to_string(),
            output,
        });
        self
    }

    /// Make invocations of `subcommand` exit with `code`
    pub fn failing(self, subcommand: &str, code: i32, stderr: &str) -> Self {
        self.with_output(subcommand, RunOutput::exited(code, "", stderr))
    }

    /// All invocations so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().clone()
    }

    /// Number of invocations so far
    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    /// First recorded invocation carrying `subcommand`
    pub fn find(&self, subcommand: &str) -> Option<Invocation> {
        self.lock().iter().find(|inv| inv.has_arg(subcommand)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Invocation>> {
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, invocation: &Invocation) -> RunOutput {
        self.lock().push(invocation.clone());
        self.scripts
            .iter()
            .find(|script| invocation.has_arg(&script.subcommand))
            .map(|script| script.output.clone())
            .unwrap_or_else(|| RunOutput::success(""))
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> ComposerResult<()> {
        let output = self.record(invocation);
        if output.is_success() {
            Ok(())
        } else {
            Err(ComposerError::execution(
                invocation.command_line(),
                &invocation.dir,
                output.code,
                output.stderr,
            ))
        }
    }

    async fn run_capturing(&self, invocation: &Invocation) -> ComposerResult<RunOutput> {
        Ok(self.record(invocation))
    }
}
