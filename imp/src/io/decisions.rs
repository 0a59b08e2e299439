//! Decision log under `.imp/decisions/`, one JSON record per ticket.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::core::completion::{CompletionAttempt, Outcome};
use crate::core::decision::{DecisionEntry, parse_diff_stat};
use crate::core::session::validate_ticket_id;
use crate::io::files::{json_files, read_json, write_json_atomic};
use crate::io::git::Git;
use crate::io::paths::ImpPaths;

#[derive(Debug, Clone)]
pub struct DecisionLogger {
    dir: PathBuf,
}

impl DecisionLogger {
    pub fn new(project_root: &Path) -> Self {
        Self {
            dir: ImpPaths::new(project_root).decisions_dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record the latest completion run for `ticket_id`, replacing any earlier one.
    ///
    /// The worktree diff is best-effort: if git cannot produce it the entry is
    /// written with no files and an empty summary.
    #[instrument(skip_all, fields(ticket_id, outcome = %outcome))]
    pub fn log_completion(
        &self,
        ticket_id: &str,
        attempts: &[CompletionAttempt],
        outcome: Outcome,
        worktree_path: &Path,
    ) -> Result<DecisionEntry> {
        let (files_changed, diff_summary) = diff_info(worktree_path);
        self.record(ticket_id, attempts, outcome, files_changed, diff_summary)
    }

    /// Like [`Self::log_completion`], with the diff-stat captured before the
    /// run committed the worktree.
    #[instrument(skip_all, fields(ticket_id, outcome = %outcome))]
    pub fn log_committed(
        &self,
        ticket_id: &str,
        attempts: &[CompletionAttempt],
        outcome: Outcome,
        diff_stat: &str,
    ) -> Result<DecisionEntry> {
        self.record(
            ticket_id,
            attempts,
            outcome,
            parse_diff_stat(diff_stat),
            diff_stat.to_string(),
        )
    }

    fn record(
        &self,
        ticket_id: &str,
        attempts: &[CompletionAttempt],
        outcome: Outcome,
        files_changed: Vec<String>,
        diff_summary: String,
    ) -> Result<DecisionEntry> {
        validate_ticket_id(ticket_id)?;
        let entry = DecisionEntry {
            ticket_id: ticket_id.to_string(),
            timestamp: Utc::now(),
            files_changed,
            diff_summary,
            attempt_history: attempts.to_vec(),
            outcome,
        };
        write_json_atomic(&self.path_for(ticket_id), &entry)?;
        debug!(files = entry.files_changed.len(), "decision logged");
        Ok(entry)
    }

    pub fn load(&self, ticket_id: &str) -> Result<Option<DecisionEntry>> {
        validate_ticket_id(ticket_id)?;
        let path = self.path_for(ticket_id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn list_decisions(&self) -> Result<Vec<DecisionEntry>> {
        json_files(&self.dir)?
            .iter()
            .map(|path| read_json(path))
            .collect()
    }

    fn path_for(&self, ticket_id: &str) -> PathBuf {
        self.dir.join(format!("{ticket_id}.json"))
    }
}

fn diff_info(worktree_path: &Path) -> (Vec<String>, String) {
    match Git::new(worktree_path).diff_stat_head() {
        Ok(stat) => (parse_diff_stat(&stat), stat),
        Err(err) => {
            warn!(err = %err, worktree = %worktree_path.display(), "diff unavailable");
            (Vec::new(), String::new())
        }
    }
}
