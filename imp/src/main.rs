//! Ticket-scoped executor CLI.
//!
//! Sessions live in `.imp/sessions/`, worktrees in `.trees/<ticket>`, and the
//! decision trail in `.imp/decisions/`. All paths are relative to the current
//! directory, which must be the repository root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use imp::clean::clean_sessions;
use imp::core::completion::Outcome;
use imp::done::{DoneOutcome, complete_with_config};
use imp::exit_codes;
use imp::io::config::load_config;
use imp::io::decisions::DecisionLogger;
use imp::io::paths::ImpPaths;
use imp::list::{list_sessions, render_human, render_json};
use imp::start::{StartOutcome, StartRequest, start_session};

#[derive(Parser)]
#[command(name = "imp", version, about = "Ticket-scoped executor with isolated git worktrees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the ticket's worktree and branch and record an active session.
    Start {
        ticket_id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Branch to cut the worktree from (default: `base_branch` from config).
        #[arg(long)]
        base_branch: Option<String>,
    },
    /// Run check, review and commit for the ticket's session.
    Done { ticket_id: String },
    /// List stored sessions.
    List {
        /// Print a JSON array instead of one line per session.
        #[arg(long)]
        json: bool,
    },
    /// Remove worktrees and records of finished sessions.
    Clean {
        /// Also remove active sessions.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the latest decision entry for a ticket as JSON.
    Decision { ticket_id: String },
}

fn main() {
    imp::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Start {
            ticket_id,
            title,
            description,
            base_branch,
        } => cmd_start(&root, ticket_id, title, description, base_branch),
        Command::Done { ticket_id } => cmd_done(&root, &ticket_id),
        Command::List { json } => cmd_list(&root, json),
        Command::Clean { force } => cmd_clean(&root, force),
        Command::Decision { ticket_id } => cmd_decision(&root, &ticket_id),
    }
}

fn cmd_start(
    root: &Path,
    ticket_id: String,
    title: String,
    description: String,
    base_branch: Option<String>,
) -> Result<i32> {
    let config = load_config(&ImpPaths::new(root).config_path)?;
    let request = StartRequest {
        ticket_id,
        title,
        description,
        base_branch: base_branch.unwrap_or(config.base_branch),
    };
    match start_session(root, &request)? {
        StartOutcome::Started { worktree_dir, .. } => {
            println!("{}", display_relative(root, &worktree_dir).display());
            Ok(exit_codes::OK)
        }
        StartOutcome::AlreadyActive(session) => {
            eprintln!(
                "session {} is already active on {}",
                session.ticket_id, session.branch
            );
            Ok(exit_codes::FAILED)
        }
    }
}

fn cmd_done(root: &Path, ticket_id: &str) -> Result<i32> {
    let config = load_config(&ImpPaths::new(root).config_path)?;
    let outcome = complete_with_config(root, ticket_id, &config)?;
    match &outcome {
        DoneOutcome::NotFound => eprintln!("no session found for {ticket_id}"),
        DoneOutcome::Completed { result, .. } => {
            let last = result.attempts.last();
            match result.outcome() {
                Outcome::Done => {
                    let hash = result.commit_hash.as_deref().unwrap_or_default();
                    println!("{ticket_id}: done ({hash})");
                }
                Outcome::Failed => {
                    println!("{ticket_id}: review found issues");
                    if let Some(attempt) = last {
                        println!("{}", attempt.review_output.trim_end());
                    }
                }
                Outcome::Escalated => {
                    println!(
                        "{ticket_id}: escalated after {} failed check(s)",
                        result.attempts.len()
                    );
                    if let Some(attempt) = last {
                        eprintln!("{}", attempt.check_output.trim_end());
                    }
                }
            }
        }
    }
    Ok(outcome.exit_code())
}

fn cmd_list(root: &Path, json: bool) -> Result<i32> {
    let entries = list_sessions(root)?;
    if json {
        print!("{}", render_json(&entries)?);
    } else {
        print!("{}", render_human(&entries));
    }
    Ok(exit_codes::OK)
}

fn cmd_clean(root: &Path, force: bool) -> Result<i32> {
    let result = clean_sessions(root, force)?;
    for ticket_id in &result.removed_sessions {
        println!("removed {ticket_id}");
    }
    for branch in &result.pruned_branches {
        println!("deleted branch {branch}");
    }
    for ticket_id in &result.skipped_sessions {
        println!("skipped {ticket_id} (active)");
    }
    Ok(exit_codes::OK)
}

fn cmd_decision(root: &Path, ticket_id: &str) -> Result<i32> {
    match DecisionLogger::new(root).load(ticket_id)? {
        Some(entry) => {
            let json = serde_json::to_string_pretty(&entry).context("serialize decision")?;
            println!("{json}");
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no decision recorded for {ticket_id}");
            Ok(exit_codes::FAILED)
        }
    }
}

fn display_relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
