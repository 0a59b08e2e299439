//! Orchestration for `imp start`.
//!
//! Starting a session creates the ticket's worktree and branch, persists the
//! initial session record, and drops a `TASK.md` briefing into the worktree.
//! The briefing is git-excluded so it never lands on the ticket branch.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::session::{Session, validate_ticket_id};
use crate::io::context::{ContextGenerator, exclude_task_file, load_scan_data};
use crate::io::paths::ImpPaths;
use crate::io::session_store::SessionStore;
use crate::io::worktree::WorktreeManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub ticket_id: String,
    pub title: String,
    pub description: String,
    pub base_branch: String,
}

/// Outcome of `imp start`.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started {
        session: Session,
        worktree_dir: PathBuf,
        /// `None` when the briefing could not be written.
        task_file: Option<PathBuf>,
    },
    /// An active session already owns this ticket; nothing was changed.
    AlreadyActive(Session),
}

/// Start a session for `request.ticket_id` in the repository at `root`.
///
/// A terminal session for the same ticket is replaced. Worktree creation
/// failures propagate before anything is persisted.
#[instrument(skip_all, fields(ticket_id = %request.ticket_id, base_branch = %request.base_branch))]
pub fn start_session(root: &Path, request: &StartRequest) -> Result<StartOutcome> {
    validate_ticket_id(&request.ticket_id)?;
    let store = SessionStore::new(root);

    let active = store
        .load(&request.ticket_id)?
        .filter(|existing| !existing.status.is_terminal());
    if let Some(existing) = active {
        warn!("session already active");
        return Ok(StartOutcome::AlreadyActive(existing));
    }

    let worktree_dir =
        WorktreeManager::new(root).create(&request.ticket_id, &request.base_branch)?;

    let session = Session::new(
        request.ticket_id.clone(),
        request.title.clone(),
        request.description.clone(),
    );
    store.save(&session)?;
    info!(branch = %session.branch, "session started");

    let task_file = match write_briefing(root, &session, &worktree_dir) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(err = %format!("{err:#}"), "task briefing skipped");
            None
        }
    };

    Ok(StartOutcome::Started {
        session,
        worktree_dir,
        task_file,
    })
}

fn write_briefing(root: &Path, session: &Session, worktree_dir: &Path) -> Result<PathBuf> {
    let scan = load_scan_data(&ImpPaths::new(root).scan_path)?;
    let generator = ContextGenerator::new();
    let doc = generator.generate(session, scan.as_ref())?;
    let path = generator.write_task_file(worktree_dir, &doc)?;
    exclude_task_file(worktree_dir)?;
    Ok(path)
}
