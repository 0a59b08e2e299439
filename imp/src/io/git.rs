//! Git adapter.
//!
//! Every version-control subprocess goes through [`Git`]. Non-zero exits are
//! surfaced as [`WorktreeError::CommandFailed`] with git's stderr verbatim;
//! nothing here retries.

use std::path::PathBuf;
use std::process::{Command, Output};

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Failure in the version-control subprocess layer.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// git could not be invoked at all (missing binary, bad cwd, ...).
    #[error("spawn git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
    /// git ran and exited non-zero.
    #[error("git {args} failed: {}", .stderr.trim())]
    CommandFailed { args: String, stderr: String },
}

impl WorktreeError {
    /// git's diagnostic text, when the command ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } => Some(stderr),
            Self::Spawn { .. } => None,
        }
    }
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Name of the checked-out branch (`HEAD` when detached).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String, WorktreeError> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Full SHA of HEAD.
    pub fn head_sha(&self) -> Result<String, WorktreeError> {
        let out = self.run_capture(&["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// `git worktree add -b <branch> <path> <base>`.
    #[instrument(skip_all, fields(branch, path, base))]
    pub fn worktree_add(&self, branch: &str, path: &str, base: &str) -> Result<(), WorktreeError> {
        debug!(branch, path, base, "adding worktree");
        self.run_checked(&["worktree", "add", "-b", branch, path, base])?;
        Ok(())
    }

    /// `git worktree remove`; `force` also discards local modifications.
    #[instrument(skip_all, fields(path, force))]
    pub fn worktree_remove(&self, path: &str, force: bool) -> Result<(), WorktreeError> {
        debug!(path, force, "removing worktree");
        if force {
            self.run_checked(&["worktree", "remove", "--force", path])?;
        } else {
            self.run_checked(&["worktree", "remove", path])?;
        }
        Ok(())
    }

    /// Raw `git worktree list --porcelain` output.
    pub fn worktree_list_porcelain(&self) -> Result<String, WorktreeError> {
        self.run_capture(&["worktree", "list", "--porcelain"])
    }

    pub fn worktree_prune(&self) -> Result<(), WorktreeError> {
        self.run_checked(&["worktree", "prune"])?;
        Ok(())
    }

    /// Delete a local branch; `force` uses `-D` and skips the merged check.
    #[instrument(skip_all, fields(branch, force))]
    pub fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WorktreeError> {
        let flag = if force { "-D" } else { "-d" };
        debug!(branch, force, "deleting branch");
        self.run_checked(&["branch", flag, branch])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<(), WorktreeError> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Commit whatever is staged; an empty index still produces a commit.
    #[instrument(skip_all)]
    pub fn commit_allow_empty(&self, message: &str) -> Result<(), WorktreeError> {
        debug!("committing staged changes");
        self.run_checked(&["commit", "--allow-empty", "-m", message])?;
        Ok(())
    }

    /// `git diff --stat HEAD` against the last commit.
    pub fn diff_stat_head(&self) -> Result<String, WorktreeError> {
        self.run_capture(&["diff", "--stat", "HEAD"])
    }

    /// `git diff --cached --stat HEAD`: what the next commit will contain.
    pub fn diff_stat_staged(&self) -> Result<String, WorktreeError> {
        self.run_capture(&["diff", "--cached", "--stat", "HEAD"])
    }

    /// Location of `name` inside the git directory, e.g. `info/exclude`.
    ///
    /// Linked worktrees resolve shared entries to the common directory.
    pub fn git_path(&self, name: &str) -> Result<PathBuf, WorktreeError> {
        let out = self.run_capture(&["rev-parse", "--git-path", name])?;
        Ok(self.workdir.join(out.trim()))
    }

    fn run_capture(&self, args: &[&str]) -> Result<String, WorktreeError> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, WorktreeError> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            warn!(args = %args.join(" "), exit_code = ?output.status.code(), "git command failed");
            return Err(WorktreeError::CommandFailed {
                args: args.join(" "),
                stderr,
            });
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output, WorktreeError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| WorktreeError::Spawn {
                args: args.join(" "),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn failed_command_keeps_stderr_verbatim() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        let err = git
            .delete_branch("no-such-branch", false)
            .expect_err("missing branch");
        let stderr = err.stderr().expect("stderr");
        assert!(stderr.contains("no-such-branch"), "stderr: {stderr}");
        assert!(err.to_string().starts_with("git branch -d no-such-branch failed"));
    }

    #[test]
    fn spawn_failure_in_missing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path().join("missing"));
        let err = git.head_sha().expect_err("spawn should fail");
        assert!(matches!(err, WorktreeError::Spawn { .. }));
        assert!(err.stderr().is_none());
    }

    #[test]
    fn current_branch_reads_main() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        assert_eq!(git.current_branch().expect("branch"), "main");
        assert_eq!(git.head_sha().expect("sha").len(), 40);
    }

    #[test]
    fn git_path_resolves_against_workdir() {
        let repo = TestRepo::new().expect("repo");
        let exclude = Git::new(repo.path())
            .git_path("info/exclude")
            .expect("git path");
        assert!(exclude.ends_with(".git/info/exclude"));
        assert!(exclude.starts_with(repo.path()));
    }

    #[test]
    fn staged_diff_includes_new_files() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        std::fs::write(repo.path().join("new.txt"), "new\n").expect("write");
        assert_eq!(git.diff_stat_head().expect("diff"), "");

        git.add_all().expect("add");
        let stat = git.diff_stat_staged().expect("staged diff");
        assert!(stat.contains("new.txt"), "stat: {stat}");
    }
}
