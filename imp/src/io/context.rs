//! `TASK.md` briefing for the coding agent working in a session's worktree.
//!
//! Rendering is a pure function of the session (and optional scan data);
//! writing the file is a separate step.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::budget::ContextBudget;
use crate::core::session::Session;
use crate::io::files::read_json;
use crate::io::git::Git;
use crate::io::paths::{TASK_FILE, task_file_path};

const TASK_TEMPLATE: &str = include_str!("templates/task.md");

/// Module inventory produced by the indexing step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanData {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub path: String,
}

/// Read scan data if the indexing step has produced it.
pub fn load_scan_data(path: &Path) -> Result<Option<ScanData>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Budget numbers pre-formatted for the template.
#[derive(Debug, Serialize)]
struct BudgetView {
    used: String,
    max: String,
    usage_pct: String,
    available: String,
    reserved: String,
}

impl BudgetView {
    fn from_budget(budget: &ContextBudget) -> Self {
        Self {
            used: group_thousands(budget.used_tokens),
            max: group_thousands(budget.max_tokens),
            usage_pct: format!("{:.1}", budget.usage_pct()),
            available: group_thousands(budget.available_tokens()),
            reserved: group_thousands(budget.reserved_tokens),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContextGenerator;

impl ContextGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the briefing document for `session`.
    pub fn generate(&self, session: &Session, scan_data: Option<&ScanData>) -> Result<String> {
        let mut env = Environment::new();
        env.add_template("task", TASK_TEMPLATE)
            .context("parse task template")?;
        let template = env.get_template("task")?;
        let rendered = template
            .render(context! {
                session => session,
                modules => scan_data.map(|scan| &scan.modules),
                budget => BudgetView::from_budget(&session.context_budget),
            })
            .context("render task template")?;
        let mut doc = rendered;
        if !doc.ends_with('\n') {
            doc.push('\n');
        }
        Ok(doc)
    }

    /// Write `content` as `TASK.md` inside `worktree_dir`; returns the file path.
    pub fn write_task_file(&self, worktree_dir: &Path, content: &str) -> Result<PathBuf> {
        let path = task_file_path(worktree_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), "task file written");
        Ok(path)
    }
}

/// List `/TASK.md` in the repository's `info/exclude` so `git add -A` skips it.
///
/// The exclude file is shared by every worktree of the repository; the entry
/// is appended once.
pub fn exclude_task_file(worktree_dir: &Path) -> Result<()> {
    let exclude = Git::new(worktree_dir).git_path("info/exclude")?;
    let pattern = format!("/{TASK_FILE}");
    let existing = match fs::read_to_string(&exclude) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("read {}", exclude.display()));
        }
    };
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }

    if let Some(parent) = exclude.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&pattern);
    updated.push('\n');
    fs::write(&exclude, updated).with_context(|| format!("write {}", exclude.display()))?;
    debug!(path = %exclude.display(), "task file excluded from commits");
    Ok(())
}

/// `1234567` -> `1,234,567`; negative values keep their sign.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
