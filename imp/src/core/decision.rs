//! Audit record for a completed session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::completion::{CompletionAttempt, Outcome};

/// Latest completion run for a ticket. Overwritten by later runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub ticket_id: String,
    pub timestamp: DateTime<Utc>,
    pub files_changed: Vec<String>,
    /// Raw `git diff --stat` text.
    pub diff_summary: String,
    pub attempt_history: Vec<CompletionAttempt>,
    pub outcome: Outcome,
}

/// Extract file paths from `git diff --stat` output.
///
/// File lines look like ` src/lib.rs | 10 +++---`; the trailing summary line
/// has no `|` and is skipped.
pub fn parse_diff_stat(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('|'))
        .map(|(path, _)| path.trim())
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_files_and_skips_summary() {
        let stat = " src/lib.rs      | 10 +++++-----\n README.md       |  2 +-\n 2 files changed, 6 insertions(+), 6 deletions(-)\n";
        assert_eq!(parse_diff_stat(stat), vec!["src/lib.rs", "README.md"]);
    }

    #[test]
    fn ignores_blank_and_separator_only_lines() {
        assert!(parse_diff_stat("").is_empty());
        assert!(parse_diff_stat("\n   \n | 3 +++\n").is_empty());
    }

    #[test]
    fn outcome_serializes_as_label() {
        let entry = DecisionEntry {
            ticket_id: "T-1".to_string(),
            timestamp: Utc::now(),
            files_changed: Vec::new(),
            diff_summary: String::new(),
            attempt_history: Vec::new(),
            outcome: Outcome::Escalated,
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["outcome"], "escalated");
    }
}
