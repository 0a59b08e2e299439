//! Ticket-keyed attempt counters for callers that wrap several pipeline runs
//! in their own fix-and-retry loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Summary handed to a human once a ticket has exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReport {
    pub ticket_id: String,
    pub attempts: u32,
    /// Failure reasons in the order they were recorded.
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct TicketAttempts {
    count: u32,
    failures: Vec<String>,
}

/// In-memory circuit breaker over repeated attempts per ticket.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    max_retries: u32,
    attempts: HashMap<String, TicketAttempts>,
}

impl AttemptTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: HashMap::new(),
        }
    }

    pub fn record_attempt(&mut self, ticket_id: &str, failure_reason: impl Into<String>) {
        let entry = self.attempts.entry(ticket_id.to_string()).or_default();
        entry.count += 1;
        entry.failures.push(failure_reason.into());
    }

    pub fn get_attempt_count(&self, ticket_id: &str) -> u32 {
        self.attempts.get(ticket_id).map_or(0, |a| a.count)
    }

    /// True once the ticket has used up `max_retries` attempts.
    pub fn should_escalate(&self, ticket_id: &str) -> bool {
        self.get_attempt_count(ticket_id) >= self.max_retries
    }

    pub fn reset_attempts(&mut self, ticket_id: &str) {
        self.attempts.remove(ticket_id);
    }

    pub fn escalation_report(&self, ticket_id: &str) -> EscalationReport {
        let (attempts, failures) = self
            .attempts
            .get(ticket_id)
            .map_or((0, Vec::new()), |a| (a.count, a.failures.clone()));
        EscalationReport {
            ticket_id: ticket_id.to_string(),
            attempts,
            failures,
        }
    }
}
