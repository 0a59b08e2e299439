//! Ticket-scoped executor for automated engineering work.
//!
//! Each ticket gets its own git worktree and branch, a persisted session
//! record, and a bounded completion pipeline (check, review, commit, report)
//! that ends in `done` or `escalated`. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (session model, budget math,
//!   completion results, attempt bookkeeping). No I/O.
//! - **[`io`]**: Side-effecting adapters (filesystem stores, git, subprocess
//!   gates, PM notifier). Isolated behind small types and traits so tests can
//!   substitute scripted collaborators.
//!
//! [`pipeline`] holds the completion state machine; the orchestration modules
//! ([`start`], [`done`], [`list`], [`clean`]) implement the CLI commands.

pub mod clean;
pub mod core;
pub mod done;
pub mod exit_codes;
pub mod io;
pub mod list;
pub mod logging;
pub mod pipeline;
pub mod start;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
