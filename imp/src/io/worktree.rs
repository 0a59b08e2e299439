//! Per-ticket git worktree lifecycle.
//!
//! Each ticket owns branch `imp/<ticket>` checked out at `.trees/<ticket>`
//! relative to the repository root. All invocations run from the root repo.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::core::session::{branch_for, worktree_path_for};
use crate::io::git::{Git, WorktreeError};

/// One block of `git worktree list --porcelain`, e.g. `worktree`, `HEAD`, `branch`.
/// Flag-only lines such as `bare` or `detached` map to an empty value.
pub type WorktreeRecord = BTreeMap<String, String>;

/// Creates, inspects and removes ticket worktrees.
#[derive(Debug, Clone)]
pub struct WorktreeManager {
    repo_root: PathBuf,
    git: Git,
}

impl WorktreeManager {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            git: Git::new(&repo_root),
            repo_root,
        }
    }

    /// Checked-out branch of the root repository.
    pub fn current_branch(&self) -> Result<String, WorktreeError> {
        self.git.current_branch()
    }

    /// Create `imp/<ticket>` off `base_branch` at `.trees/<ticket>`; returns the absolute path.
    #[instrument(skip_all, fields(ticket_id, base_branch))]
    pub fn create(&self, ticket_id: &str, base_branch: &str) -> Result<PathBuf, WorktreeError> {
        let worktree_path = worktree_path_for(ticket_id);
        let branch = branch_for(ticket_id);
        self.git.worktree_add(&branch, &worktree_path, base_branch)?;
        info!(ticket_id, branch = %branch, path = %worktree_path, "worktree created");
        Ok(self.repo_root.join(worktree_path))
    }

    /// Remove the ticket's worktree. Fails when it is missing or has local changes.
    #[instrument(skip_all, fields(ticket_id))]
    pub fn remove(&self, ticket_id: &str) -> Result<(), WorktreeError> {
        self.git.worktree_remove(&worktree_path_for(ticket_id), false)?;
        info!(ticket_id, "worktree removed");
        Ok(())
    }

    /// Remove the ticket's worktree even when it holds uncommitted files.
    #[instrument(skip_all, fields(ticket_id))]
    pub fn discard(&self, ticket_id: &str) -> Result<(), WorktreeError> {
        self.git.worktree_remove(&worktree_path_for(ticket_id), true)?;
        info!(ticket_id, "worktree discarded");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<WorktreeRecord>, WorktreeError> {
        let output = self.git.worktree_list_porcelain()?;
        Ok(parse_porcelain(&output))
    }

    /// True when any known worktree path contains `.trees/<ticket>`.
    pub fn exists(&self, ticket_id: &str) -> Result<bool, WorktreeError> {
        let needle = worktree_path_for(ticket_id);
        let found = self.list()?.iter().any(|record| {
            record
                .get("worktree")
                .is_some_and(|path| path.contains(&needle))
        });
        debug!(ticket_id, found, "worktree lookup");
        Ok(found)
    }

    /// True when a worktree is registered at exactly `.trees/<ticket>`.
    ///
    /// Unlike [`Self::exists`], `T-1` does not match a live `.trees/T-10`.
    pub fn has_worktree(&self, ticket_id: &str) -> Result<bool, WorktreeError> {
        let expected = worktree_path_for(ticket_id);
        let found = self.list()?.iter().any(|record| {
            record
                .get("worktree")
                .is_some_and(|path| Path::new(path).ends_with(&expected))
        });
        Ok(found)
    }

    /// Drop admin metadata for worktrees whose directories vanished.
    pub fn prune(&self) -> Result<(), WorktreeError> {
        self.git.worktree_prune()
    }

    pub fn delete_branch(&self, ticket_id: &str, force: bool) -> Result<(), WorktreeError> {
        self.git.delete_branch(&branch_for(ticket_id), force)
    }
}

/// Parse blank-line-delimited `key value` blocks.
pub fn parse_porcelain(output: &str) -> Vec<WorktreeRecord> {
    let mut records = Vec::new();
    let mut current = WorktreeRecord::new();
    for line in output.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        current.insert(key.to_string(), value.to_string());
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}
