//! Completion pipeline: check -> review -> commit -> PM report.
//!
//! Each iteration runs the check gate. A failing check consumes one retry; once
//! `max_retries` checks have failed the session escalates. A passing check is
//! reviewed immediately: a failing review ends the run as fixable (no further
//! retries), a passing review commits the worktree and reports to the PM
//! adapter on a best-effort basis.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::core::completion::{CompletionAttempt, CompletionResult, apply_outcome};
use crate::core::session::Session;
use crate::io::gates::{Gate, GateRequest};
use crate::io::git::Git;
use crate::io::pm::{PmNotifier, completion_comment};

pub use crate::core::breaker::{AttemptTracker, EscalationReport};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Result of one run plus the session value that should be persisted next.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: CompletionResult,
    pub session: Session,
    /// `git diff --stat` of what the success commit recorded; `None` when nothing was committed.
    pub committed_diff: Option<String>,
}

pub struct CompletionPipeline<C, R, P> {
    check: C,
    review: R,
    notifier: P,
    max_retries: u32,
}

impl<C: Gate, R: Gate, P: PmNotifier> CompletionPipeline<C, R, P> {
    pub fn new(check: C, review: R, notifier: P) -> Self {
        Self {
            check,
            review,
            notifier,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Drive `session` to a terminal outcome using the worktree at `worktree_dir`.
    ///
    /// Check and review failures are outcomes, not errors. `Err` means a gate
    /// could not be invoked or git failed while committing.
    #[instrument(skip_all, fields(ticket_id = %session.ticket_id, max_retries = self.max_retries))]
    pub fn run(&self, session: &Session, worktree_dir: &Path) -> Result<PipelineRun> {
        let ticket_id = session.ticket_id.as_str();
        let request = GateRequest {
            ticket_id: ticket_id.to_string(),
            workdir: worktree_dir.to_path_buf(),
        };
        let mut attempts = Vec::new();

        for attempt_number in 1..=self.max_retries {
            let timestamp = Utc::now();
            let check = self
                .check
                .run(&request)
                .with_context(|| format!("run check gate for {ticket_id}"))?;

            if !check.passed {
                info!(attempt_number, "checks failed");
                attempts.push(CompletionAttempt {
                    attempt_number,
                    check_passed: false,
                    check_output: check.output,
                    review_passed: None,
                    review_output: String::new(),
                    timestamp,
                });
                continue;
            }

            let review = self
                .review
                .run(&request)
                .with_context(|| format!("run review gate for {ticket_id}"))?;
            attempts.push(CompletionAttempt {
                attempt_number,
                check_passed: true,
                check_output: check.output,
                review_passed: Some(review.passed),
                review_output: review.output,
                timestamp,
            });

            if !review.passed {
                info!(attempt_number, "review found issues");
                let result = CompletionResult::fixable(ticket_id, attempts);
                return Ok(self.finish(session, result, None));
            }

            let (commit_hash, diff_stat) = commit_worktree(worktree_dir, ticket_id)?;
            info!(attempt_number, commit = %commit_hash, "session completed");
            let pm_updated = self.notify(ticket_id, true);
            let result = CompletionResult {
                ticket_id: ticket_id.to_string(),
                passed: true,
                escalated: false,
                attempts,
                committed: true,
                commit_hash: Some(commit_hash),
                pm_updated,
            };
            return Ok(self.finish(session, result, Some(diff_stat)));
        }

        warn!(attempts = attempts.len(), "retries exhausted, escalating");
        let result = CompletionResult::escalated(ticket_id, attempts);
        Ok(self.finish(session, result, None))
    }

    fn finish(
        &self,
        session: &Session,
        result: CompletionResult,
        committed_diff: Option<String>,
    ) -> PipelineRun {
        PipelineRun {
            session: apply_outcome(session, &result),
            result,
            committed_diff,
        }
    }

    fn notify(&self, ticket_id: &str, passed: bool) -> bool {
        match self
            .notifier
            .add_comment(ticket_id, &completion_comment(ticket_id, passed))
        {
            Ok(()) => true,
            Err(err) => {
                debug!(err = %err, "pm update skipped");
                false
            }
        }
    }
}

/// Stage everything, commit `"{ticket_id}: complete"`, and return the new
/// HEAD with the diff-stat of the staged changes.
fn commit_worktree(worktree_dir: &Path, ticket_id: &str) -> Result<(String, String)> {
    let git = Git::new(worktree_dir);
    git.add_all()?;
    let diff_stat = git.diff_stat_staged()?;
    git.commit_allow_empty(&format!("{ticket_id}: complete"))?;
    Ok((git.head_sha()?, diff_stat))
}
