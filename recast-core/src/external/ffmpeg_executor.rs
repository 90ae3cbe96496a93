// ============================================================================
// recast-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// ffmpeg is spawned through ffmpeg-sidecar so its log output arrives as
// parsed events. The traits below let tests substitute scripted processes.
//
// KEY COMPONENTS:
// - FfmpegProcess: an active ffmpeg process
// - FfmpegSpawner: creates processes from an argument vector
// - SidecarSpawner / SidecarProcess: the ffmpeg-sidecar implementation
// - run_ffmpeg: event loop with cancellation and captured diagnostics

// ---- Internal crate imports ----
use super::process::CancellationToken;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

// ---- External crate imports ----
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

// ---- Standard library imports ----
use std::collections::VecDeque;
use std::ffi::OsString;
use std::process::ExitStatus;

/// Lines of ffmpeg output kept for error reports.
const DIAGNOSTIC_TAIL_LINES: usize = 40;

// ============================================================================
// TRAITS
// ============================================================================

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Feeds every event to `handler` until the process closes its output
    /// or the handler returns an error.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;

    /// Asks ffmpeg to stop gracefully.
    fn quit(&mut self) -> CoreResult<()>;
}

/// Trait representing something that can spawn an `FfmpegProcess`.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    /// Spawns ffmpeg with `args` (program name excluded) and extra
    /// environment variables.
    fn spawn(&self, args: &[OsString], env: &[(String, String)]) -> CoreResult<Self::Process>;
}

// ============================================================================
// FFMPEG-SIDECAR IMPLEMENTATION
// ============================================================================

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild`.
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            CoreError::ExternalToolFailure {
                tool: "ffmpeg".to_string(),
                status: "not started".to_string(),
                output: e.to_string(),
            }
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(CoreError::Io)
    }

    fn quit(&mut self) -> CoreResult<()> {
        if let Err(e) = self.0.quit() {
            log::debug!("ffmpeg did not accept quit, killing: {}", e);
            self.0.kill().map_err(CoreError::Io)?;
        }
        Ok(())
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, args: &[OsString], env: &[(String, String)]) -> CoreResult<Self::Process> {
        let mut cmd = FfmpegCommand::new();
        cmd.args(args);
        for (key, value) in env {
            cmd.as_inner_mut().env(key, value);
        }
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

// ============================================================================
// EVENT LOOP
// ============================================================================

/// Runs ffmpeg to completion.
///
/// `on_event` sees every event. Log lines are also retained so that a
/// failing exit status can be reported with ffmpeg's own diagnostics. When
/// `cancel` is set, ffmpeg is asked to quit and `CoreError::Cancelled` is
/// returned.
pub fn run_ffmpeg<S, F>(
    spawner: &S,
    args: &[OsString],
    env: &[(String, String)],
    cancel: &CancellationToken,
    mut on_event: F,
) -> CoreResult<()>
where
    S: FfmpegSpawner,
    F: FnMut(&FfmpegEvent),
{
    let mut process = spawner.spawn(args, env)?;
    let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);

    let result = process.handle_events(|event| {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled("ffmpeg".to_string()));
        }

        on_event(&event);

        let line = match &event {
            FfmpegEvent::Log(_, line) => Some(line.clone()),
            FfmpegEvent::Error(line) => Some(line.clone()),
            _ => None,
        };
        if let Some(line) = line {
            if tail.len() == DIAGNOSTIC_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        Ok(())
    });

    if let Err(err) = result {
        if matches!(err, CoreError::Cancelled(_)) {
            log::warn!("Interrupted, stopping ffmpeg");
            process.quit()?;
            let _ = process.wait();
        }
        return Err(err);
    }

    // The child may have been interrupted after its last event.
    if cancel.is_cancelled() {
        let _ = process.wait();
        return Err(CoreError::Cancelled("ffmpeg".to_string()));
    }

    let status = process.wait()?;
    if !status.success() {
        let output = tail.into_iter().collect::<Vec<_>>().join("\n");
        return Err(command_failed_error("ffmpeg", status, output));
    }
    Ok(())
}
