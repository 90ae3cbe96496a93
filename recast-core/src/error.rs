// ============================================================================
// recast-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the recast-core library
//
// Every fallible operation in the library returns `CoreResult<T>`. Errors are
// split into planning errors (bad media, bad options) and external tool
// errors (ffprobe, ffmpeg, mkvpropedit failing or not starting).
//
// KEY COMPONENTS:
// - CoreError: The error enum used throughout the crate
// - CoreResult: Result alias
// - Constructor helpers for command failures

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced while planning or running a transcode.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input duration is below the two second minimum.
    #[error("media duration too short: {0}")]
    MediaTooShort(f64),

    /// A required stream (usually video) is missing from the input.
    #[error("{0}")]
    StreamNotFound(String),

    /// The requested video encoder is unavailable or failed its probe.
    #[error("video encoder not available: {0}")]
    UnsupportedEncoder(String),

    /// The preset name is not valid for the selected encoder.
    #[error("invalid preset for encoder {encoder}: {preset}")]
    InvalidPreset { preset: String, encoder: String },

    /// A user supplied option was malformed or contradicts another option.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The crop sampling process exited abnormally.
    #[error("crop detection failed: {0}")]
    DetectionFailed(String),

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} failed ({status}): {output}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        output: String,
    },

    /// An external tool could not be started at all.
    #[error("failed to start {0}: {1}")]
    CommandStart(String, #[source] io::Error),

    /// A required executable is not on the PATH.
    #[error("required tool not found: {0}")]
    DependencyNotFound(String),

    /// ffprobe produced output that could not be understood.
    #[error("media information not found: {0}")]
    ProbeParse(String),

    /// The output file is already present.
    #[error("output file already exists: {0}")]
    OutputExists(String),

    /// The running child process was interrupted.
    #[error("interrupted while running {0}")]
    Cancelled(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used across the crate.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Errors that come from option handling rather than from a particular
    /// input file.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidArgument(_) | CoreError::InvalidPreset { .. }
        )
    }
}

/// Builds a `CommandStart` error for `tool`.
pub fn command_start_error(tool: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(tool.into(), err)
}

/// Builds an `ExternalToolFailure` from an exit status and captured output.
pub fn command_failed_error(
    tool: impl Into<String>,
    status: ExitStatus,
    output: impl Into<String>,
) -> CoreError {
    CoreError::ExternalToolFailure {
        tool: tool.into(),
        status: status.to_string(),
        output: output.into(),
    }
}
