//! Test-only helpers: scratch git repositories and scripted collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::io::gates::{Gate, GateOutcome, GateRequest};
use crate::io::pm::PmNotifier;

/// A throwaway git repository with one commit (`README.md`) on `main`.
#[derive(Debug)]
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let root = dir.path();
        git(root, &["init", "-q"])?;
        git(root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        git(root, &["config", "user.name", "imp tests"])?;
        git(root, &["config", "user.email", "imp-tests@example.com"])?;
        git(root, &["config", "commit.gpgsign", "false"])?;
        fs::write(root.join("README.md"), "# scratch\n").context("write README.md")?;
        git(root, &["add", "README.md"])?;
        git(root, &["commit", "-q", "-m", "initial"])?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `name` inside `workdir` (the repo or one of its worktrees) and commit it.
    pub fn commit_file(&self, workdir: &Path, name: &str, content: &str, message: &str) -> Result<()> {
        fs::write(workdir.join(name), content).with_context(|| format!("write {name}"))?;
        git(workdir, &["add", name])?;
        git(workdir, &["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Subject line of HEAD in `workdir`.
    pub fn last_commit_message(&self, workdir: &Path) -> Result<String> {
        Ok(git(workdir, &["log", "-1", "--format=%s"])?.trim().to_string())
    }

    /// Local branch names.
    pub fn branches(&self) -> Result<Vec<String>> {
        let out = git(self.path(), &["branch", "--format=%(refname:short)"])?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Gate that replays a fixed script of outcomes; the last one repeats forever.
#[derive(Debug)]
pub struct ScriptedGate {
    script: RefCell<VecDeque<GateOutcome>>,
    broken: Option<String>,
    calls: Cell<usize>,
}

impl ScriptedGate {
    pub fn new(outcomes: Vec<GateOutcome>) -> Self {
        Self {
            script: RefCell::new(outcomes.into()),
            broken: None,
            calls: Cell::new(0),
        }
    }

    pub fn repeating(outcome: GateOutcome) -> Self {
        Self::new(vec![outcome])
    }

    /// A gate whose command cannot be invoked at all.
    pub fn broken(message: &str) -> Self {
        Self {
            broken: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Gate for ScriptedGate {
    fn run(&self, _request: &GateRequest) -> Result<GateOutcome> {
        self.calls.set(self.calls.get() + 1);
        if let Some(message) = &self.broken {
            return Err(anyhow!("{message}"));
        }
        let mut script = self.script.borrow_mut();
        let outcome = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        outcome.context("scripted gate has no outcomes")
    }
}

/// PM adapter that records every comment it is asked to post.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    fail: bool,
    comments: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(ticket_id, text)` pairs, in call order.
    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.borrow().clone()
    }
}

impl PmNotifier for RecordingNotifier {
    fn add_comment(&self, ticket_id: &str, text: &str) -> Result<()> {
        self.comments
            .borrow_mut()
            .push((ticket_id.to_string(), text.to_string()));
        if self.fail {
            bail!("pm unavailable");
        }
        Ok(())
    }
}
