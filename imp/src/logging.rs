//! Diagnostic tracing for imp.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: operator diagnostics via `RUST_LOG`, output to
//!   stderr. Not persisted.
//!
//! - **Decision log (`io/decisions`)**: the audit record in `.imp/decisions/`.
//!   Always written by `imp done`, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn` if unset. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=imp=debug imp done T-1
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
