//! Child-process execution for external gate and adapter commands.
//!
//! Commands run with stdin closed, a wall-clock timeout, and bounded capture of
//! stdout/stderr. Both pipes are drained on reader threads so a chatty child
//! cannot deadlock on a full pipe.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Variables that pin a parent's Python virtualenv; worktree toolchains must
/// resolve their own.
pub const SANITIZED_ENV_VARS: [&str; 2] = ["VIRTUAL_ENV", "VIRTUAL_ENV_PROMPT"];

/// One output stream, cut at the capture limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    pub bytes: Vec<u8>,
    /// Bytes read past the limit and discarded.
    pub dropped: u64,
}

impl CapturedStream {
    /// Keep the first `limit` bytes of `reader`, then drain and count the rest.
    fn drain<R: Read>(mut reader: R, limit: usize) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.by_ref().take(limit as u64).read_to_end(&mut bytes)?;
        let dropped = io::copy(&mut reader, &mut io::sink())?;
        Ok(Self { bytes, dropped })
    }

    /// Lossy UTF-8 text with a trailing `[<label> truncated N bytes]` notice when cut.
    pub fn text(&self, label: &str) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.dropped > 0 {
            text.push_str(&format!("\n[{label} truncated {} bytes]\n", self.dropped));
        }
        text
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exited zero within the timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.text("stdout")
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.text("stderr")
    }

    /// stdout followed by stderr.
    pub fn combined_text(&self) -> String {
        self.stdout_text() + &self.stderr_text()
    }
}

/// Build a command for `argv` in `workdir` with the parent's virtualenv markers removed.
pub fn sanitized_command(argv: &[String], workdir: &Path) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("command must not be empty"))?;
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(workdir);
    for var in SANITIZED_ENV_VARS {
        cmd.env_remove(var);
    }
    Ok(cmd)
}

/// Run `cmd` to completion or until `timeout`, keeping at most
/// `output_limit_bytes` of each stream.
///
/// Errors only when the process cannot be spawned or waited on.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {:?}", cmd.get_program()))?;

    let stdout = spawn_reader(child.stdout.take(), output_limit_bytes)?;
    let stderr = spawn_reader(child.stderr.take(), output_limit_bytes)?;
    let (status, timed_out) = wait_or_kill(&mut child, timeout)?;

    let output = CommandOutput {
        status,
        stdout: collect(stdout).context("capture stdout")?,
        stderr: collect(stderr).context("capture stderr")?,
        timed_out,
    };
    if output.stdout.dropped > 0 || output.stderr.dropped > 0 {
        warn!(
            stdout_dropped = output.stdout.dropped,
            stderr_dropped = output.stderr.dropped,
            "output exceeded capture limit"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(output)
}

fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<(ExitStatus, bool)> {
    if let Some(status) = child.wait_timeout(timeout).context("wait for command")? {
        return Ok((status, false));
    }
    warn!("deadline passed, killing command");
    child.kill().context("kill command")?;
    let status = child.wait().context("reap killed command")?;
    Ok((status, true))
}

type Reader = JoinHandle<io::Result<CapturedStream>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>, limit: usize) -> Result<Reader> {
    let pipe = pipe.context("child pipe not captured")?;
    Ok(thread::spawn(move || CapturedStream::drain(pipe, limit)))
}

fn collect(reader: Reader) -> Result<CapturedStream> {
    reader
        .join()
        .map_err(|_| anyhow!("pipe reader panicked"))?
        .context("read pipe")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, workdir: &Path) -> Command {
        let argv = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        sanitized_command(&argv, workdir).expect("command")
    }

    #[test]
    fn captures_both_streams() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_command_with_timeout(
            sh("echo out; echo err >&2; exit 3", temp.path()),
            Duration::from_secs(10),
            1000,
        )
        .expect("run");
        assert!(!out.success());
        assert_eq!(out.status.code(), Some(3));
        assert_eq!(out.combined_text(), "out\nerr\n");
        assert_eq!(out.stderr_text(), "err\n");
    }

    #[test]
    fn keeps_prefix_and_counts_dropped_bytes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_command_with_timeout(
            sh("printf 'abcdefghij'", temp.path()),
            Duration::from_secs(10),
            4,
        )
        .expect("run");
        assert!(out.success());
        assert_eq!(out.stdout.bytes, b"abcd");
        assert_eq!(out.stdout.dropped, 6);
        assert_eq!(out.stdout_text(), "abcd\n[stdout truncated 6 bytes]\n");
    }

    #[test]
    fn drain_without_overflow_drops_nothing() {
        let stream = CapturedStream::drain(&b"hello"[..], 10).expect("drain");
        assert_eq!(stream.bytes, b"hello");
        assert_eq!(stream.dropped, 0);
        assert_eq!(stream.text("stdout"), "hello");
    }

    #[test]
    fn kills_on_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_command_with_timeout(
            sh("exec sleep 5", temp.path()),
            Duration::from_millis(100),
            100,
        )
        .expect("run");
        assert!(out.timed_out);
        assert!(!out.success());
    }

    #[test]
    fn stdin_is_closed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_command_with_timeout(
            sh("cat; echo done", temp.path()),
            Duration::from_secs(10),
            100,
        )
        .expect("run");
        assert!(out.success());
        assert_eq!(out.stdout_text(), "done\n");
    }

    #[test]
    fn strips_virtualenv_markers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cmd = sh("true", temp.path());
        let removed: Vec<_> = cmd
            .get_envs()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key.to_string_lossy().to_string())
            .collect();
        assert_eq!(removed, vec!["VIRTUAL_ENV", "VIRTUAL_ENV_PROMPT"]);
    }

    #[test]
    fn empty_argv_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(sanitized_command(&[], temp.path()).is_err());
    }

    #[test]
    fn missing_program_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let argv = vec!["definitely-not-a-real-binary-imp".to_string()];
        let cmd = sanitized_command(&argv, temp.path()).expect("command");
        assert!(run_command_with_timeout(cmd, Duration::from_secs(1), 10).is_err());
    }
}
