//! End-to-end session lifecycle through real git repositories.
//!
//! These tests drive `start` → `done` → `list` → `clean` with scripted gates,
//! checking what lands on disk (session records, decision log, worktrees,
//! commits) at each step.

use std::fs;

use imp::clean::clean_sessions;
use imp::core::completion::Outcome;
use imp::core::session::SessionStatus;
use imp::done::{DoneOutcome, complete_session};
use imp::exit_codes;
use imp::io::decisions::DecisionLogger;
use imp::io::gates::GateOutcome;
use imp::io::git::Git;
use imp::io::pm::NullNotifier;
use imp::io::session_store::SessionStore;
use imp::io::worktree::WorktreeManager;
use imp::list::list_sessions;
use imp::pipeline::{AttemptTracker, CompletionPipeline};
use imp::start::{StartOutcome, StartRequest, start_session};
use imp::test_support::{RecordingNotifier, ScriptedGate, TestRepo};

fn request(ticket_id: &str) -> StartRequest {
    StartRequest {
        ticket_id: ticket_id.to_string(),
        title: format!("{ticket_id} title"),
        description: "Make the thing work.".to_string(),
        base_branch: "main".to_string(),
    }
}

/// Checks fail twice, then pass; review passes on the third attempt.
///
/// Expected: 3 attempts recorded, committed, session `done`, decision `done`,
/// and the commit on `imp/T-1` carries the fixed message.
#[test]
fn checks_recover_on_third_attempt() {
    let repo = TestRepo::new().expect("repo");
    let root = repo.path();

    let StartOutcome::Started { session, worktree_dir, .. } =
        start_session(root, &request("T-1")).expect("start")
    else {
        panic!("expected Started");
    };
    assert_eq!(session.branch, "imp/T-1");
    assert_eq!(session.worktree_path, ".trees/T-1");
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(
        Git::new(&worktree_dir).current_branch().expect("branch"),
        "imp/T-1"
    );

    fs::write(worktree_dir.join("feature.txt"), "implemented\n").expect("agent work");

    let check = ScriptedGate::new(vec![
        GateOutcome::fail("1 test failed"),
        GateOutcome::fail("1 test failed"),
        GateOutcome::pass("all green"),
    ]);
    let review = ScriptedGate::repeating(GateOutcome::pass("{\"issues\":[]}"));
    let notifier = RecordingNotifier::succeeding();
    let pipeline = CompletionPipeline::new(&check, &review, &notifier);

    let outcome = complete_session(root, "T-1", &pipeline).expect("done");
    assert_eq!(outcome.exit_code(), exit_codes::OK);
    let DoneOutcome::Completed {
        result,
        session,
        decision,
    } = outcome
    else {
        panic!("expected Completed");
    };

    assert_eq!(result.attempts.len(), 3);
    assert!(result.passed);
    assert!(!result.escalated);
    assert!(result.committed);
    assert_eq!(
        result.attempts.iter().map(|a| a.check_passed).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    assert_eq!(review.calls(), 1);
    assert_eq!(session.status, SessionStatus::Done);
    assert_eq!(session.attempt_count, 3);
    assert_eq!(decision.outcome, Outcome::Done);
    assert_eq!(decision.attempt_history, result.attempts);

    let stored = SessionStore::new(root)
        .load("T-1")
        .expect("load")
        .expect("present");
    assert_eq!(stored, session);

    assert_eq!(
        repo.last_commit_message(&worktree_dir).expect("log"),
        "T-1: complete"
    );
    assert_eq!(
        result.commit_hash.as_deref(),
        Some(Git::new(&worktree_dir).head_sha().expect("head").as_str())
    );
    assert_eq!(notifier.comments().len(), 1);
}

/// A session that escalates, is retried by an outer fix loop, and is cleaned.
#[test]
fn escalation_then_clean_removes_everything() {
    let repo = TestRepo::new().expect("repo");
    let root = repo.path();
    start_session(root, &request("T-2")).expect("start");

    let check = ScriptedGate::repeating(GateOutcome::fail("type error"));
    let review = ScriptedGate::repeating(GateOutcome::pass("ok"));
    let pipeline = CompletionPipeline::new(&check, &review, NullNotifier).with_max_retries(3);

    let mut tracker = AttemptTracker::new(2);
    let outcome = complete_session(root, "T-2", &pipeline).expect("done");
    assert_eq!(outcome.exit_code(), exit_codes::ESCALATED);
    tracker.record_attempt("T-2", "escalated: type error");
    assert!(!tracker.should_escalate("T-2"));

    let entries = list_sessions(root).expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, SessionStatus::Escalated);
    assert_eq!(entries[0].attempt_count, 3);

    let decision = DecisionLogger::new(root)
        .load("T-2")
        .expect("load")
        .expect("present");
    assert_eq!(decision.outcome, Outcome::Escalated);
    assert!(decision.attempt_history.iter().all(|a| a.review_passed.is_none()));

    let cleaned = clean_sessions(root, false).expect("clean");
    assert_eq!(cleaned.removed_sessions, vec!["T-2"]);
    assert_eq!(cleaned.pruned_branches, vec!["imp/T-2"]);
    assert!(list_sessions(root).expect("list").is_empty());
    assert!(!WorktreeManager::new(root).exists("T-2").expect("exists"));
    assert!(!root.join(".trees/T-2").exists());
}

/// Review failures short-circuit and leave the session active for another `done`.
#[test]
fn review_failure_then_fixed_review_completes() {
    let repo = TestRepo::new().expect("repo");
    let root = repo.path();
    start_session(root, &request("T-3")).expect("start");

    let check = ScriptedGate::repeating(GateOutcome::pass("ok"));
    let failing_review = ScriptedGate::repeating(GateOutcome::fail("missing test"));
    let first = complete_session(
        root,
        "T-3",
        &CompletionPipeline::new(&check, &failing_review, NullNotifier),
    )
    .expect("first done");
    assert_eq!(first.exit_code(), exit_codes::FAILED);
    assert_eq!(check.calls(), 1);

    let passing_review = ScriptedGate::repeating(GateOutcome::pass("ok"));
    let second = complete_session(
        root,
        "T-3",
        &CompletionPipeline::new(&check, &passing_review, NullNotifier),
    )
    .expect("second done");
    assert_eq!(second.exit_code(), exit_codes::OK);

    let stored = SessionStore::new(root)
        .load("T-3")
        .expect("load")
        .expect("present");
    assert_eq!(stored.status, SessionStatus::Done);
    assert_eq!(stored.attempt_count, 2);

    let decision = DecisionLogger::new(root)
        .load("T-3")
        .expect("load")
        .expect("present");
    assert_eq!(decision.outcome, Outcome::Done);
    assert_eq!(decision.attempt_history.len(), 1);
}

/// Sessions on different tickets are fully isolated from each other.
#[test]
fn parallel_tickets_do_not_share_state() {
    let repo = TestRepo::new().expect("repo");
    let root = repo.path();
    start_session(root, &request("A")).expect("start A");
    start_session(root, &request("B")).expect("start B");

    fs::write(root.join(".trees/A/a.txt"), "a\n").expect("write A");

    let check = ScriptedGate::repeating(GateOutcome::pass("ok"));
    let review = ScriptedGate::repeating(GateOutcome::pass("ok"));
    let pipeline = CompletionPipeline::new(&check, &review, NullNotifier);
    complete_session(root, "A", &pipeline).expect("done A");

    let entries = list_sessions(root).expect("list");
    let statuses: Vec<(String, SessionStatus)> = entries
        .into_iter()
        .map(|e| (e.ticket_id, e.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("A".to_string(), SessionStatus::Done),
            ("B".to_string(), SessionStatus::Active),
        ]
    );
    assert!(!root.join(".trees/B/a.txt").exists());
    assert!(DecisionLogger::new(root).load("B").expect("load").is_none());
}
