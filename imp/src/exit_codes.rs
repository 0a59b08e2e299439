//! Stable exit codes for imp CLI commands.

/// Command succeeded; for `imp done`, the session passed and was committed.
pub const OK: i32 = 0;
/// Command failed, the session was not found, or review reported fixable issues.
pub const FAILED: i32 = 1;
/// `imp done` exhausted its check retries and escalated the session.
pub const ESCALATED: i32 = 2;
