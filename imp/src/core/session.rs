//! The session entity: one ticket's isolated unit of automated work.
//!
//! `branch`, `worktree_path`, `created_at` and `context_budget` are derived once,
//! when the session is first built, and then carried verbatim through every
//! save/load cycle. A later title change never moves the branch or the worktree.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::budget::ContextBudget;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const BRANCH_PREFIX: &str = "imp/";
pub const TREES_DIR: &str = ".trees";

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Done,
    Escalated,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Done => "done",
            Self::Escalated => "escalated",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of a ticket's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSession")]
pub struct Session {
    pub ticket_id: String,
    pub title: String,
    pub description: String,
    pub status: SessionStatus,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub context_budget: ContextBudget,
    pub branch: String,
    pub worktree_path: String,
}

impl Session {
    /// Build a fresh active session with every derived field computed now.
    pub fn new(
        ticket_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        NewSession {
            ticket_id: ticket_id.into(),
            title: title.into(),
            description: description.into(),
            ..NewSession::default()
        }
        .build()
    }

    /// Listing projection used by `imp list`.
    pub fn list_entry(&self) -> SessionListEntry {
        SessionListEntry {
            ticket_id: self.ticket_id.clone(),
            title: self.title.clone(),
            status: self.status,
            branch: self.branch.clone(),
            attempt_count: self.attempt_count,
            created_at: self.created_at,
        }
    }
}

/// Construction input for a [`Session`]. Unset optional fields are derived.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub ticket_id: String,
    pub title: String,
    pub description: String,
    pub max_attempts: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub context_budget: Option<ContextBudget>,
    pub branch: Option<String>,
    pub worktree_path: Option<String>,
}

impl NewSession {
    pub fn build(self) -> Session {
        StoredSession {
            ticket_id: self.ticket_id,
            title: self.title,
            description: self.description,
            status: SessionStatus::Active,
            attempt_count: 0,
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            created_at: self.created_at,
            context_budget: self.context_budget,
            branch: self.branch,
            worktree_path: self.worktree_path,
        }
        .into()
    }
}

/// On-disk shape of a session. Derived fields may be absent in hand-written or
/// older records; they are filled in exactly as at construction time.
#[derive(Debug, Deserialize)]
struct StoredSession {
    ticket_id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_status")]
    status: SessionStatus,
    #[serde(default)]
    attempt_count: u32,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    context_budget: Option<ContextBudget>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    worktree_path: Option<String>,
}

fn default_status() -> SessionStatus {
    SessionStatus::Active
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        let branch = stored
            .branch
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| branch_for(&stored.ticket_id));
        let worktree_path = stored
            .worktree_path
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| worktree_path_for(&stored.ticket_id));
        Self {
            branch,
            worktree_path,
            created_at: stored.created_at.unwrap_or_else(Utc::now),
            context_budget: stored.context_budget.unwrap_or_default(),
            ticket_id: stored.ticket_id,
            title: stored.title,
            description: stored.description,
            status: stored.status,
            attempt_count: stored.attempt_count,
            max_attempts: stored.max_attempts,
        }
    }
}

/// Summary row for session listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListEntry {
    pub ticket_id: String,
    pub title: String,
    pub status: SessionStatus,
    pub branch: String,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Branch name owned by a ticket.
pub fn branch_for(ticket_id: &str) -> String {
    format!("{BRANCH_PREFIX}{ticket_id}")
}

/// Worktree path (relative to the repository root) owned by a ticket.
pub fn worktree_path_for(ticket_id: &str) -> String {
    format!("{TREES_DIR}/{ticket_id}")
}

/// Validate that a ticket id is safe as a file name and a branch component.
pub fn validate_ticket_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(anyhow!("ticket id must not be empty"));
    }
    if id.contains('/') {
        return Err(anyhow!("ticket id must not contain '/'"));
    }
    if id == "." || id == ".." {
        return Err(anyhow!("ticket id must not be '.' or '..'"));
    }
    if id
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(anyhow!("ticket id must be [A-Za-z0-9._-] only (got '{id}')"));
    }
    Ok(())
}
