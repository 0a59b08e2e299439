//! Orchestration for `imp done`: run the completion pipeline for a stored
//! session, record the decision, and persist the updated session.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::completion::CompletionResult;
use crate::core::decision::DecisionEntry;
use crate::core::session::Session;
use crate::exit_codes;
use crate::io::config::ImpConfig;
use crate::io::decisions::DecisionLogger;
use crate::io::gates::Gate;
use crate::io::paths::ImpPaths;
use crate::io::pm::{PmNotifier, notifier_from_config};
use crate::io::session_store::SessionStore;
use crate::pipeline::CompletionPipeline;

#[derive(Debug, Clone, PartialEq)]
pub enum DoneOutcome {
    /// No session is stored for the ticket.
    NotFound,
    Completed {
        result: CompletionResult,
        session: Session,
        decision: DecisionEntry,
    },
}

impl DoneOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound => exit_codes::FAILED,
            Self::Completed { result, .. } => result.exit_code(),
        }
    }
}

/// `imp done` with gates and PM adapter taken from `config`.
pub fn complete_with_config(root: &Path, ticket_id: &str, config: &ImpConfig) -> Result<DoneOutcome> {
    let pipeline = CompletionPipeline::new(
        config.check_gate(),
        config.review_gate(),
        notifier_from_config(config, root),
    )
    .with_max_retries(config.max_retries);
    complete_session(root, ticket_id, &pipeline)
}

/// Drive the stored session for `ticket_id` through `pipeline`.
#[instrument(skip_all, fields(ticket_id))]
pub fn complete_session<C: Gate, R: Gate, P: PmNotifier>(
    root: &Path,
    ticket_id: &str,
    pipeline: &CompletionPipeline<C, R, P>,
) -> Result<DoneOutcome> {
    let store = SessionStore::new(root);
    let Some(session) = store.load(ticket_id)? else {
        info!("no session found");
        return Ok(DoneOutcome::NotFound);
    };

    let worktree_dir = ImpPaths::new(root).worktree_dir(&session.worktree_path);
    let run = pipeline.run(&session, &worktree_dir)?;

    let logger = DecisionLogger::new(root);
    let outcome = run.result.outcome();
    let decision = match &run.committed_diff {
        Some(diff_stat) => {
            logger.log_committed(ticket_id, &run.result.attempts, outcome, diff_stat)?
        }
        None => logger.log_completion(ticket_id, &run.result.attempts, outcome, &worktree_dir)?,
    };
    store.save(&run.session)?;
    info!(outcome = %outcome, attempts = run.result.attempts.len(), "session updated");

    Ok(DoneOutcome::Completed {
        result: run.result,
        session: run.session,
        decision,
    })
}
