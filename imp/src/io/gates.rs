//! External check and review gates.
//!
//! A gate is an opaque command run inside a worktree: exit 0 means pass, and the
//! captured text travels with the outcome either way. The pipeline only needs
//! pass/fail; any structured data in the review output is for its caller.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::io::process::{run_command_with_timeout, sanitized_command};

pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

#[derive(Debug, Clone)]
pub struct GateRequest {
    pub ticket_id: String,
    pub workdir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub passed: bool,
    pub output: String,
}

impl GateOutcome {
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
        }
    }

    pub fn fail(output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
        }
    }
}

/// A pass/fail step run against a worktree.
///
/// `Err` is reserved for a gate that cannot run at all; a failing gate is `Ok`.
pub trait Gate {
    fn run(&self, request: &GateRequest) -> Result<GateOutcome>;
}

impl<T: Gate + ?Sized> Gate for Box<T> {
    fn run(&self, request: &GateRequest) -> Result<GateOutcome> {
        (**self).run(request)
    }
}

impl<T: Gate + ?Sized> Gate for &T {
    fn run(&self, request: &GateRequest) -> Result<GateOutcome> {
        (**self).run(request)
    }
}

/// Which streams a [`CommandGate`] reports as its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCapture {
    /// stdout followed by stderr (validation gates).
    Combined,
    /// stdout only (review gates emit structured data there).
    StdoutOnly,
}

/// Gate backed by a configured argv, e.g. `["just", "check"]`.
#[derive(Debug, Clone)]
pub struct CommandGate {
    pub name: String,
    pub command: Vec<String>,
    pub capture: OutputCapture,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CommandGate {
    pub fn new(name: impl Into<String>, command: Vec<String>, capture: OutputCapture) -> Self {
        Self {
            name: name.into(),
            command,
            capture,
            timeout: DEFAULT_GATE_TIMEOUT,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    pub fn with_limits(mut self, timeout: Duration, output_limit_bytes: usize) -> Self {
        self.timeout = timeout;
        self.output_limit_bytes = output_limit_bytes;
        self
    }
}

impl Gate for CommandGate {
    #[instrument(skip_all, fields(gate = %self.name, ticket_id = %request.ticket_id))]
    fn run(&self, request: &GateRequest) -> Result<GateOutcome> {
        info!(workdir = %request.workdir.display(), command = ?self.command, "running gate");
        let cmd = sanitized_command(&self.command, &request.workdir)?;
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {} gate {:?}", self.name, self.command))?;

        let mut text = match self.capture {
            OutputCapture::Combined => output.combined_text(),
            OutputCapture::StdoutOnly => output.stdout_text(),
        };
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "gate timed out");
            text.push_str(&format!("\n[timed out after {}s]\n", self.timeout.as_secs()));
        }

        let passed = output.success();
        debug!(passed, exit_code = ?output.status.code(), "gate finished");
        Ok(GateOutcome {
            passed,
            output: text,
        })
    }
}
