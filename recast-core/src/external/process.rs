//! Cancellable execution of short-lived helper tools (ffprobe, mkvpropedit).
//!
//! ffmpeg runs through `ffmpeg_executor` instead; this module covers the
//! tools whose output is read in full after they exit.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Poll interval while waiting on a child.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Shared flag set from the interrupt handler and checked while a child
/// process is running.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exit status and captured streams of a finished tool.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `cmd` to completion, killing it if `cancel` is set first.
///
/// A non-zero exit becomes `ExternalToolFailure` carrying stderr (or stdout
/// when stderr is empty).
pub fn run_command(
    mut cmd: Command,
    tool: &str,
    cancel: &CancellationToken,
) -> CoreResult<CapturedOutput> {
    log::debug!("Running {}: {:?}", tool, cmd);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| command_start_error(tool, e))?;

    let stdout_reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = out.read_to_string(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = err.read_to_string(&mut buf);
            buf
        })
    });

    let status = loop {
        if cancel.is_cancelled() {
            log::warn!("Interrupted, stopping {}", tool);
            let _ = child.kill();
            let _ = child.wait();
            return Err(CoreError::Cancelled(tool.to_string()));
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(WAIT_POLL),
            Err(e) => return Err(CoreError::Io(e)),
        }
    };

    let stdout = stdout_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    for line in stderr.lines() {
        log::debug!("{}: {}", tool, line);
    }

    if !status.success() {
        let diagnostic = if stderr.trim().is_empty() { &stdout } else { &stderr };
        log::error!("{} exited with {}", tool, status);
        return Err(command_failed_error(tool, status, diagnostic.trim()));
    }

    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn captures_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        let out = run_command(cmd, "sh", &CancellationToken::new()).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.status.success());
    }

    #[test]
    fn failure_carries_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        let err = run_command(cmd, "sh", &CancellationToken::new()).unwrap_err();
        match err {
            CoreError::ExternalToolFailure { tool, output, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cancelled_token_kills_child() {
        let token = CancellationToken::new();
        token.cancel();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);
        assert!(matches!(
            run_command(cmd, "sh", &token),
            Err(CoreError::Cancelled(_))
        ));
    }

    #[test]
    fn missing_binary_fails_to_start() {
        let cmd = Command::new("recast-definitely-missing-tool");
        assert!(matches!(
            run_command(cmd, "missing", &CancellationToken::new()),
            Err(CoreError::CommandStart(_, _))
        ));
    }
}
