//! I/O adapters for imp commands: filesystem, git, subprocess gates, PM.

pub mod config;
pub mod context;
pub mod decisions;
pub mod files;
pub mod gates;
pub mod git;
pub mod paths;
pub mod pm;
pub mod process;
pub mod session_store;
pub mod worktree;
