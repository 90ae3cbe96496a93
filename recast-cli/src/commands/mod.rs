//! Command implementations for the CLI.

/// Processes every input according to the run mode: transcode, dry run,
/// scan or crop detection.
pub mod transcode;
