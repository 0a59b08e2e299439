//! Canonical on-disk locations under a project root.

use std::path::{Path, PathBuf};

/// All paths `imp` reads or writes for a repository root.
#[derive(Debug, Clone)]
pub struct ImpPaths {
    pub root: PathBuf,
    pub imp_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub decisions_dir: PathBuf,
    pub config_path: PathBuf,
    /// Module inventory from the indexing step; optional.
    pub scan_path: PathBuf,
}

impl ImpPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let imp_dir = root.join(".imp");
        Self {
            root: root.clone(),
            imp_dir: imp_dir.clone(),
            sessions_dir: imp_dir.join("sessions"),
            decisions_dir: imp_dir.join("decisions"),
            config_path: imp_dir.join("config.toml"),
            scan_path: imp_dir.join("scan.json"),
        }
    }

    /// Absolute location of a session's worktree (`worktree_path` is stored relative).
    pub fn worktree_dir(&self, worktree_path: &str) -> PathBuf {
        self.root.join(worktree_path)
    }
}

/// File name of the briefing written into each worktree.
pub const TASK_FILE: &str = "TASK.md";

pub fn task_file_path(worktree_dir: &Path) -> PathBuf {
    worktree_dir.join(TASK_FILE)
}
