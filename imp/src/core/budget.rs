//! Context-window accounting for a coding agent session.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: i64 = 200_000;
pub const DEFAULT_RESERVED_TOKENS: i64 = 50_000;

/// Snapshot of how much of the agent's context window has been consumed.
///
/// Only the three counters are stored. `available_tokens` and `usage_pct` are
/// derived on demand and `available_tokens` is allowed to go negative: an
/// over-budget session is a valid state that downstream tooling reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextBudget {
    pub max_tokens: i64,
    pub used_tokens: i64,
    pub reserved_tokens: i64,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            used_tokens: 0,
            reserved_tokens: DEFAULT_RESERVED_TOKENS,
        }
    }
}

impl ContextBudget {
    /// `max - used - reserved`, possibly negative.
    pub fn available_tokens(&self) -> i64 {
        self.max_tokens - self.used_tokens - self.reserved_tokens
    }

    /// Percentage of `max_tokens` already used.
    pub fn usage_pct(&self) -> f64 {
        self.used_tokens as f64 / self.max_tokens as f64 * 100.0
    }
}
