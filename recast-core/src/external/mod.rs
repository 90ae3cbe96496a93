// ============================================================================
// recast-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffprobe, ffmpeg and mkvpropedit
//
// Everything that starts a child process lives here. The planning modules
// never run tools themselves; they receive catalogs, inventories and
// samplers built on the traits below.
//
// KEY COMPONENTS:
// - Traits for external tool interactions (FfmpegSpawner, FfprobeExecutor,
//   MetadataEditor)
// - Concrete implementations using ffmpeg-sidecar and std::process
// - Dependency checking and the encoder inventory query
// - CancellationToken shared with the interrupt handler

// ---- Internal crate imports ----
use crate::config::EncoderInventory;
use crate::error::{CoreError, CoreResult, command_failed_error};

// ---- Standard library imports ----
use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Traits and implementations for executing ffprobe commands
pub mod ffprobe_executor;

/// Matroska post-processing through mkvpropedit
pub mod mkvpropedit;

/// Cancellable helper-process execution
pub mod process;

/// Scripted stand-ins for the tool traits
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner, run_ffmpeg};
pub use ffprobe_executor::{CommandFfprobeExecutor, FfprobeExecutor};
pub use mkvpropedit::{MetadataEditor, Mkvpropedit};
pub use process::{CancellationToken, CapturedOutput, run_command};

// Progress updates handed to `Pipeline::with_progress`.
pub use ffmpeg_sidecar::event::FfmpegProgress;

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Tools and the arguments used to confirm that each one runs.
pub const REQUIRED_TOOLS: [(&str, &[&str]); 3] = [
    ("ffprobe", &["-loglevel", "quiet", "-version"]),
    ("ffmpeg", &["-loglevel", "quiet", "-version"]),
    ("mkvpropedit", &["--version"]),
];

/// Checks if a required external command is available and executable.
///
/// # Returns
///
/// * `Ok(())` - The command started and exited successfully
/// * `Err(CoreError::DependencyNotFound)` - The command is not on the PATH
/// * `Err(CoreError::CommandStart)` - The command exists but fails to start
/// * `Err(CoreError::ExternalToolFailure)` - The command exited unsuccessfully
pub fn check_dependency(cmd_name: &str, version_args: &[&str]) -> CoreResult<()> {
    log::debug!("Verifying \"{}\" availability...", cmd_name);

    let result = Command::new(cmd_name)
        .args(version_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(status) if status.success() => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Ok(status) => Err(command_failed_error(
            cmd_name,
            status,
            "verifying tool availability failed",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Verifies every tool in `REQUIRED_TOOLS`.
pub fn verify_dependencies() -> CoreResult<()> {
    for (tool, args) in REQUIRED_TOOLS {
        check_dependency(tool, args)?;
    }
    Ok(())
}

// ============================================================================
// ENCODER INVENTORY
// ============================================================================

/// Lists the encoders compiled into the local ffmpeg.
pub fn query_encoder_inventory(cancel: &CancellationToken) -> CoreResult<EncoderInventory> {
    log::info!("Finding encoders...");
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-loglevel", "quiet", "-encoders"]);
    let output = run_command(cmd, "ffmpeg", cancel)?;
    let inventory = EncoderInventory::parse(&output.stdout);
    log::debug!("{} encoders available", inventory.len());
    Ok(inventory)
}
