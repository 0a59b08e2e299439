//! Deterministic, pure logic for sessions and completion runs.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod breaker;
pub mod budget;
pub mod completion;
pub mod decision;
pub mod session;
