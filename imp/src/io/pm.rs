//! Project-management notification adapters.
//!
//! The pipeline reports completion to the PM system on a best-effort basis.
//! Which adapter is used is decided once, from configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::config::ImpConfig;
use crate::io::process::{run_command_with_timeout, sanitized_command};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(60);
const NOTIFY_OUTPUT_LIMIT_BYTES: usize = 10_000;

/// Capability to comment on a ticket.
pub trait PmNotifier {
    fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()>;
}

impl<T: PmNotifier + ?Sized> PmNotifier for Box<T> {
    fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        (**self).add_comment(ticket_id, text)
    }
}

impl<T: PmNotifier + ?Sized> PmNotifier for &T {
    fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        (**self).add_comment(ticket_id, text)
    }
}

/// Used when no PM integration is configured; every comment is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl PmNotifier for NullNotifier {
    fn add_comment(&self, _ticket_id: &str, _text: &str) -> Result<()> {
        Err(anyhow!("PM integration not configured"))
    }
}

/// Runs `<command...> <ticket_id> <text>` from the repository root.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    pub command: Vec<String>,
    pub workdir: std::path::PathBuf,
}

impl PmNotifier for CommandNotifier {
    #[instrument(skip_all, fields(ticket_id))]
    fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        let mut argv = self.command.clone();
        argv.push(ticket_id.to_string());
        argv.push(text.to_string());
        let cmd = sanitized_command(&argv, &self.workdir)?;
        let output = run_command_with_timeout(cmd, NOTIFY_TIMEOUT, NOTIFY_OUTPUT_LIMIT_BYTES)?;
        if !output.success() {
            return Err(anyhow!(
                "pm command {:?} failed: {}",
                self.command,
                output.stderr_text().trim()
            ));
        }
        debug!("pm comment posted");
        Ok(())
    }
}

/// Select the PM adapter for this configuration.
pub fn notifier_from_config(config: &ImpConfig, root: &Path) -> Box<dyn PmNotifier> {
    if config.pm.command.is_empty() {
        debug!("pm integration disabled");
        return Box::new(NullNotifier);
    }
    Box::new(CommandNotifier {
        command: config.pm.command.clone(),
        workdir: root.to_path_buf(),
    })
}

/// Comment posted on the ticket when a pipeline run finishes.
pub fn completion_comment(ticket_id: &str, passed: bool) -> String {
    let status = if passed { "done" } else { "escalated" };
    format!("imp done: ticket={ticket_id} status={status}")
}
