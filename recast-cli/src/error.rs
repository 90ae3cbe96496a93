// ============================================================================
// recast-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reuses `CoreError` and only decides how a failure ends the
// process: usage errors exit with 2, everything else with 1.
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - CliErrorContext: prefixes errors with what the CLI was doing
// - exit codes for usage and run failures

// ---- Internal crate imports ----
use recast_core::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::fmt;

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

// ============================================================================
// EXIT CODES
// ============================================================================

/// Every input processed without error.
pub const EXIT_SUCCESS: i32 = 0;

/// At least one input failed, a tool was missing, or the run was interrupted.
pub const EXIT_FAILURE: i32 = 1;

/// The command line could not be turned into a configuration.
pub const EXIT_USAGE: i32 = 2;

/// Maps an error that ended the run to the process exit code.
pub fn exit_code(error: &CoreError) -> i32 {
    if error.is_usage_error() {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

// ============================================================================
// ERROR CONVERSION UTILITIES
// ============================================================================

/// Extension trait for adding context to errors in the CLI.
///
/// Usage errors keep their variant so they still map to a usage exit.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

fn with_context(error: CoreError, context: impl fmt::Display) -> CoreError {
    match error {
        CoreError::InvalidArgument(message) => {
            CoreError::InvalidArgument(format!("{context}: {message}"))
        }
        CoreError::Io(e) => CoreError::Io(std::io::Error::new(e.kind(), format!("{context}: {e}"))),
        other => other,
    }
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| with_context(e.into(), context))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| with_context(e.into(), f()))
    }
}
