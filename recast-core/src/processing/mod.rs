//! Per-input processing.
//!
//! The pipeline takes each input through probing, crop resolution, plan
//! assembly and, unless it is a dry run, the transcode and its Matroska
//! post-processing. Tool access goes through the traits in `external`, so
//! the whole flow runs against scripted tools in tests.

/// Orchestration of one run
pub mod pipeline;

/// Stream report for `--scan`
pub mod scan;

pub use pipeline::{FileOutcome, Pipeline, ResolvedEncoders, RunSummary, resolve_encoders};
pub use scan::scan_report;
