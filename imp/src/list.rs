//! Orchestration for `imp list`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::session::SessionListEntry;
use crate::io::session_store::SessionStore;

/// Stored sessions projected for listing, sorted by ticket id.
pub fn list_sessions(root: &Path) -> Result<Vec<SessionListEntry>> {
    let mut entries: Vec<SessionListEntry> = SessionStore::new(root)
        .list()?
        .iter()
        .map(|session| session.list_entry())
        .collect();
    entries.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
    Ok(entries)
}

/// One line per session: `{ticket_id}  {status}  {title}`.
pub fn render_human(entries: &[SessionListEntry]) -> String {
    if entries.is_empty() {
        return "No sessions found.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{}  {}  {}\n",
            entry.ticket_id, entry.status, entry.title
        ));
    }
    out
}

pub fn render_json(entries: &[SessionListEntry]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(entries).context("serialize session list")?;
    out.push('\n');
    Ok(out)
}
