//! File-backed session persistence: one JSON document per ticket in `.imp/sessions/`.
//!
//! Saves are last-write-wins. Callers serialise work on a single ticket;
//! different tickets never share a file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::session::{Session, validate_ticket_id};
use crate::io::files::{json_files, read_json, write_json_atomic};

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store rooted at `<project_root>/.imp/sessions`.
    pub fn new(project_root: &Path) -> Self {
        Self::at(crate::io::paths::ImpPaths::new(project_root).sessions_dir)
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the full session, replacing any previous record.
    pub fn save(&self, session: &Session) -> Result<()> {
        let path = self.path_for(&session.ticket_id)?;
        debug!(ticket_id = %session.ticket_id, status = %session.status, "saving session");
        write_json_atomic(&path, session)
    }

    /// `Ok(None)` when no session is stored for the ticket.
    pub fn load(&self, ticket_id: &str) -> Result<Option<Session>> {
        let path = self.path_for(ticket_id)?;
        if !path.exists() {
            debug!(ticket_id, "session not found");
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// All stored sessions, in no particular order.
    pub fn list(&self) -> Result<Vec<Session>> {
        json_files(&self.dir)?
            .iter()
            .map(|path| read_json(path))
            .collect()
    }

    /// Remove the record; returns whether it existed.
    pub fn delete(&self, ticket_id: &str) -> Result<bool> {
        let path = self.path_for(ticket_id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        debug!(ticket_id, "session deleted");
        Ok(true)
    }

    pub fn exists(&self, ticket_id: &str) -> Result<bool> {
        Ok(self.path_for(ticket_id)?.exists())
    }

    fn path_for(&self, ticket_id: &str) -> Result<PathBuf> {
        validate_ticket_id(ticket_id)?;
        Ok(self.dir.join(format!("{ticket_id}.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::{NewSession, SessionStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn save_then_load_round_trips_derived_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        let session = Session::new("T-1", "title", "description");

        store.save(&session).expect("save");
        let loaded = store.load("T-1").expect("load").expect("present");
        assert_eq!(loaded, session);
        assert_eq!(loaded.branch, session.branch);
        assert_eq!(loaded.worktree_path, session.worktree_path);
        assert_eq!(loaded.created_at, session.created_at);
        assert_eq!(loaded.context_budget, session.context_budget);
    }

    #[test]
    fn overrides_survive_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        let session = NewSession {
            ticket_id: "T-7".to_string(),
            title: "custom".to_string(),
            branch: Some("custom/branch".to_string()),
            worktree_path: Some("wt/T-7".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
            ..NewSession::default()
        }
        .build();
        store.save(&session).expect("save");
        assert_eq!(store.load("T-7").expect("load"), Some(session));
    }

    #[test]
    fn missing_session_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        assert_eq!(store.load("nope").expect("load"), None);
        assert!(!store.exists("nope").expect("exists"));
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn save_overwrites_previous_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        let mut session = Session::new("T-1", "title", "");
        store.save(&session).expect("save");

        session.status = SessionStatus::Done;
        session.attempt_count = 2;
        store.save(&session).expect("save again");

        let loaded = store.load("T-1").expect("load").expect("present");
        assert_eq!(loaded.status, SessionStatus::Done);
        assert_eq!(loaded.attempt_count, 2);
    }

    #[test]
    fn delete_reports_existence_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        assert!(!store.delete("T-1").expect("delete missing"));

        store.save(&Session::new("T-1", "title", "")).expect("save");
        assert!(store.exists("T-1").expect("exists"));
        assert!(store.delete("T-1").expect("delete"));
        assert!(!store.delete("T-1").expect("delete again"));
        assert!(!store.exists("T-1").expect("exists"));
    }

    #[test]
    fn list_reflects_deletions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        store.save(&Session::new("A", "a", "")).expect("save a");
        store.save(&Session::new("B", "b", "")).expect("save b");
        store.delete("A").expect("delete a");

        let ids: Vec<String> = store
            .list()
            .expect("list")
            .into_iter()
            .map(|s| s.ticket_id)
            .collect();
        assert_eq!(ids, vec!["B"]);
    }

    #[test]
    fn rejects_unsafe_ticket_ids() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        assert!(store.load("../escape").is_err());
        assert!(store.save(&Session::new("a/b", "t", "")).is_err());
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path());
        fs::create_dir_all(store.dir()).expect("mkdir");
        fs::write(store.dir().join("T-1.json"), "not json").expect("write");
        assert!(store.load("T-1").is_err());
    }
}
