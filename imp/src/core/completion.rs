//! Records produced by a completion pipeline run.
//!
//! These types are the stable contract between the pipeline, the decision log,
//! and the CLI exit code. They carry no behaviour beyond derived views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::session::{Session, SessionStatus};
use crate::exit_codes;

/// One iteration of the pipeline's check/review loop. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAttempt {
    /// 1-based, increasing within a run.
    pub attempt_number: u32,
    pub check_passed: bool,
    #[serde(default)]
    pub check_output: String,
    /// `None` when the review step was never reached on this attempt.
    #[serde(default)]
    pub review_passed: Option<bool>,
    #[serde(default)]
    pub review_output: String,
    pub timestamp: DateTime<Utc>,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub ticket_id: String,
    pub passed: bool,
    #[serde(default)]
    pub escalated: bool,
    pub attempts: Vec<CompletionAttempt>,
    #[serde(default)]
    pub committed: bool,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub pm_updated: bool,
}

impl CompletionResult {
    /// Review found issues: not passed, not escalated.
    pub fn fixable(ticket_id: &str, attempts: Vec<CompletionAttempt>) -> Self {
        Self {
            ticket_id: ticket_id.to_string(),
            passed: false,
            escalated: false,
            attempts,
            committed: false,
            commit_hash: None,
            pm_updated: false,
        }
    }

    /// Checks never passed within the retry budget.
    pub fn escalated(ticket_id: &str, attempts: Vec<CompletionAttempt>) -> Self {
        Self {
            escalated: true,
            ..Self::fixable(ticket_id, attempts)
        }
    }

    /// CLI exit code: 0 passed, 2 escalated, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            exit_codes::OK
        } else if self.escalated {
            exit_codes::ESCALATED
        } else {
            exit_codes::FAILED
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.passed {
            Outcome::Done
        } else if self.escalated {
            Outcome::Escalated
        } else {
            Outcome::Failed
        }
    }
}

/// Outcome label recorded in the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Done,
    Escalated,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Escalated => "escalated",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produce the session value that follows a pipeline run.
///
/// The input session is left untouched; the store persists the returned value.
pub fn apply_outcome(session: &Session, result: &CompletionResult) -> Session {
    let mut next = session.clone();
    next.attempt_count = next
        .attempt_count
        .saturating_add(u32::try_from(result.attempts.len()).unwrap_or(u32::MAX));
    if result.passed {
        next.status = SessionStatus::Done;
    } else if result.escalated {
        next.status = SessionStatus::Escalated;
    }
    next
}
