// judge/command.rs
//! Judge by running a shell command against the candidate.
//!
//! The candidate and its bindings are written to scratch files, `{file}` and
//! `{json}` in the command template are replaced by their paths, and the
//! command runs under `sh -c`. Exit status 0 means interesting.

use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::{Judge, JudgeError};
use crate::state::ReductionState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Captured output from a single command run.
#[derive(Debug)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stderr: String,
    pub stdout: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[derive(Debug)]
pub struct CommandJudge {
    template: String,
    scratch_dir: PathBuf,
    ext: String,
    timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl CommandJudge {
    /// Candidates are written to `<scratch_dir>/candidate.<ext>` and
    /// `<scratch_dir>/candidate.json`.
    pub fn new(
        template: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
        ext: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            scratch_dir: scratch_dir.into(),
            ext: ext.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_template(&self) -> &str {
        &self.template
    }
}

// ---------------------------------------------------------------------------
// Judging
// ---------------------------------------------------------------------------

impl Judge for CommandJudge {
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        let (file, json) = write_candidate(&self.scratch_dir, &self.ext, state)?;
        let command = expand_placeholders(
            &self.template,
            &[("{file}", path_arg(&file)), ("{json}", path_arg(&json))],
        );
        let outcome = run_command(&command, &self.scratch_dir, self.timeout)?;
        tracing::debug!(
            exit_code = ?outcome.exit_code,
            signal = ?outcome.signal,
            timed_out = outcome.timed_out,
            elapsed = ?outcome.duration,
            "judge command finished"
        );
        Ok(outcome.success())
    }
}

/// Write the candidate shader and bindings for an external tool.
pub(crate) fn write_candidate(
    dir: &Path,
    ext: &str,
    state: &ReductionState,
) -> Result<(PathBuf, PathBuf), JudgeError> {
    std::fs::create_dir_all(dir).map_err(|e| JudgeError::io(dir, e))?;
    let file = dir.join(format!("candidate.{ext}"));
    let json = dir.join("candidate.json");
    std::fs::write(&file, state.source()).map_err(|e| JudgeError::io(&file, e))?;
    let bindings = state
        .bindings
        .to_json()
        .map_err(|e| JudgeError::Other(format!("failed to encode bindings: {e}")))?;
    std::fs::write(&json, bindings).map_err(|e| JudgeError::io(&json, e))?;
    Ok((file, json))
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Replace each `(placeholder, value)` pair in a command template.
pub(crate) fn expand_placeholders(template: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |command, (placeholder, value)| {
            command.replace(placeholder, value)
        })
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Spawn a shell command, capture output, enforce an optional timeout.
///
/// The child is placed in its own process group so we can kill the entire
/// group on timeout, grandchildren included.
pub(crate) fn run_command(
    command: &str,
    working_dir: &Path,
    deadline: Option<Duration>,
) -> Result<CommandOutcome, JudgeError> {
    let start = Instant::now();

    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0) // own PGID
        .spawn()
        .map_err(|source| JudgeError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let Some(timeout) = deadline else {
        return build_outcome(child.wait_with_output(), false, start);
    };

    let child_pid = child.id();
    let (tx, rx) = mpsc::channel::<()>();

    // Kills the process group unless told the child exited in time.
    let watcher = std::thread::spawn(move || {
        if rx.recv_timeout(timeout).is_err() {
            kill_process_group(child_pid);
            true
        } else {
            false
        }
    });

    let output = child.wait_with_output();
    let _ = tx.send(());
    let timed_out = watcher.join().unwrap_or(false);

    build_outcome(output, timed_out, start)
}

fn build_outcome(
    output: std::io::Result<std::process::Output>,
    timed_out: bool,
    start: Instant,
) -> Result<CommandOutcome, JudgeError> {
    let out = output.map_err(|e| JudgeError::Other(format!("failed to collect output: {e}")))?;
    Ok(CommandOutcome {
        exit_code: out.status.code(),
        signal: out.status.signal(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        timed_out,
        duration: start.elapsed(),
    })
}

/// Send SIGKILL to an entire process group.
fn kill_process_group(pid: u32) {
    // SAFETY: killpg sends a signal to every process in the group.
    // We use the child PID as the PGID because we called .process_group(0).
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;

    fn state() -> ReductionState {
        ReductionState::new(
            shade_frontend::parse("void main() { discard; }").unwrap(),
            Bindings::default(),
        )
    }

    #[test]
    fn placeholders_expand() {
        let command = expand_placeholders(
            "glslangValidator {file} && check {json} {file}",
            &[("{file}", "a.frag".to_string()), ("{json}", "a.json".to_string())],
        );
        assert_eq!(command, "glslangValidator a.frag && check a.json a.frag");
    }

    #[test]
    fn exit_status_decides() {
        let dir = tempfile::tempdir().unwrap();
        let mut grep = CommandJudge::new("grep -q discard {file}", dir.path(), "frag");
        assert!(grep.accepts(&state()).unwrap());
        let mut absent = CommandJudge::new("grep -q gl_FragColor {file}", dir.path(), "frag");
        assert!(!absent.accepts(&state()).unwrap());
    }

    #[test]
    fn bindings_are_written_next_to_the_shader() {
        let dir = tempfile::tempdir().unwrap();
        let mut judge = CommandJudge::new("test -f {json}", dir.path(), "comp");
        assert!(judge.accepts(&state()).unwrap());
        assert!(dir.path().join("candidate.comp").exists());
    }

    #[test]
    fn timeout_kills_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let mut judge = CommandJudge::new("sleep 5", dir.path(), "frag")
            .with_timeout(Some(Duration::from_millis(100)));
        let start = Instant::now();
        assert!(!judge.accepts(&state()).unwrap());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_command("echo out; echo err >&2; exit 3", dir.path(), None).unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
        assert!(!outcome.success());
    }
}
