//! Executor configuration stored under `.imp/config.toml`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::files::write_atomic;
use crate::io::gates::{CommandGate, OutputCapture};

/// Executor configuration (TOML).
///
/// Hand-edited; missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImpConfig {
    /// Check attempts per `imp done` before the session escalates.
    pub max_retries: u32,

    /// Branch new worktrees are cut from when `--base-branch` is not given.
    pub base_branch: String,

    /// Wall-clock limit for a single check or review run.
    pub gate_timeout_secs: u64,

    /// Captured gate output beyond this many bytes per stream is dropped.
    pub gate_output_limit_bytes: usize,

    pub check: GateConfig,
    pub review: GateConfig,
    pub pm: PmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PmConfig {
    /// Invoked as `<command...> <ticket_id> <text>`. Empty disables PM updates.
    pub command: Vec<String>,
}

impl Default for ImpConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_branch: "main".to_string(),
            gate_timeout_secs: 30 * 60,
            gate_output_limit_bytes: 1_000_000,
            check: GateConfig {
                command: vec!["just".to_string(), "check".to_string()],
            },
            review: GateConfig {
                command: vec!["just".to_string(), "review".to_string()],
            },
            pm: PmConfig::default(),
        }
    }
}

impl ImpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(anyhow!("max_retries must be > 0"));
        }
        if self.base_branch.trim().is_empty() {
            return Err(anyhow!("base_branch must not be empty"));
        }
        if self.gate_timeout_secs == 0 {
            return Err(anyhow!("gate_timeout_secs must be > 0"));
        }
        if self.gate_output_limit_bytes == 0 {
            return Err(anyhow!("gate_output_limit_bytes must be > 0"));
        }
        if !is_valid_command(&self.check.command) {
            return Err(anyhow!("check.command must be a non-empty array"));
        }
        if !is_valid_command(&self.review.command) {
            return Err(anyhow!("review.command must be a non-empty array"));
        }
        if !self.pm.command.is_empty() && !is_valid_command(&self.pm.command) {
            return Err(anyhow!("pm.command must be empty or start with a program"));
        }
        Ok(())
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_secs)
    }

    /// Validation gate; reports stdout and stderr.
    pub fn check_gate(&self) -> CommandGate {
        CommandGate::new("check", self.check.command.clone(), OutputCapture::Combined)
            .with_limits(self.gate_timeout(), self.gate_output_limit_bytes)
    }

    /// Review gate; reports stdout only.
    pub fn review_gate(&self) -> CommandGate {
        CommandGate::new("review", self.review.command.clone(), OutputCapture::StdoutOnly)
            .with_limits(self.gate_timeout(), self.gate_output_limit_bytes)
    }
}

fn is_valid_command(command: &[String]) -> bool {
    command.first().is_some_and(|program| !program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ImpConfig::default()`.
pub fn load_config(path: &Path) -> Result<ImpConfig> {
    if !path.exists() {
        let cfg = ImpConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ImpConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk.
pub fn write_config(path: &Path, cfg: &ImpConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ImpConfig::default());
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.pm.command.is_empty());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".imp").join("config.toml");
        let mut cfg = ImpConfig::default();
        cfg.pm.command = vec!["pm-cli".to_string(), "comment".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_retries = 5\n\n[check]\ncommand = [\"make\", \"ci\"]\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.check.command, vec!["make", "ci"]);
        assert_eq!(cfg.review, ImpConfig::default().review);
    }

    #[test]
    fn rejects_zero_retries_and_empty_commands() {
        let mut cfg = ImpConfig {
            max_retries: 0,
            ..ImpConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg.max_retries = 1;
        cfg.check.command = vec![" ".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gates_carry_limits() {
        let cfg = ImpConfig {
            gate_timeout_secs: 7,
            gate_output_limit_bytes: 99,
            ..ImpConfig::default()
        };
        let check = cfg.check_gate();
        assert_eq!(check.timeout, Duration::from_secs(7));
        assert_eq!(check.output_limit_bytes, 99);
        assert_eq!(check.capture, OutputCapture::Combined);
        assert_eq!(cfg.review_gate().capture, OutputCapture::StdoutOnly);
    }
}
