// recast-cli/src/lib.rs
//
// Library portion of the Recast CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::Cli;
pub use commands::transcode::run_transcode;
pub use error::{CliErrorContext, CliResult, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, exit_code};
