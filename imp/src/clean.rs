//! Orchestration for `imp clean`.
//!
//! Terminal sessions (every session with `force`) lose their worktree and
//! their session record together. Branches are only deleted when git
//! considers them merged; anything else is left for the operator.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::session::branch_for;
use crate::io::session_store::SessionStore;
use crate::io::worktree::WorktreeManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanResult {
    /// Tickets whose worktree and session record were removed.
    pub removed_sessions: Vec<String>,
    /// Active tickets left alone (no `--force`).
    pub skipped_sessions: Vec<String>,
    /// Branches deleted because they were fully merged.
    pub pruned_branches: Vec<String>,
}

#[instrument(skip_all, fields(force))]
pub fn clean_sessions(root: &Path, force: bool) -> Result<CleanResult> {
    let store = SessionStore::new(root);
    let manager = WorktreeManager::new(root);
    let mut sessions = store.list()?;
    sessions.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));

    let mut result = CleanResult::default();
    for session in sessions {
        let ticket_id = session.ticket_id;
        if !force && !session.status.is_terminal() {
            debug!(ticket_id = %ticket_id, "skipping active session");
            result.skipped_sessions.push(ticket_id);
            continue;
        }

        if manager.has_worktree(&ticket_id)? {
            manager.discard(&ticket_id)?;
        }
        store.delete(&ticket_id)?;

        match manager.delete_branch(&ticket_id, false) {
            Ok(()) => result.pruned_branches.push(branch_for(&ticket_id)),
            Err(err) => debug!(ticket_id = %ticket_id, err = %err, "branch kept"),
        }
        info!(ticket_id = %ticket_id, "session cleaned");
        result.removed_sessions.push(ticket_id);
    }

    manager.prune()?;
    Ok(result)
}
