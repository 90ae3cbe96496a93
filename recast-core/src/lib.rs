//! Core library for planning and running single-pass ffmpeg transcodes of
//! Blu-ray and DVD rips.
//!
//! Given an input file's stream catalog and a validated configuration, the
//! library derives a crop rectangle, a video filter chain with encoder
//! parameters, per-track audio and subtitle decisions, and assembles them
//! into one ffmpeg invocation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use recast_core::external::{
//!     CancellationToken, CommandFfprobeExecutor, Mkvpropedit, SidecarSpawner,
//!     query_encoder_inventory, verify_dependencies,
//! };
//! use recast_core::{Pipeline, TranscodeConfigBuilder, resolve_encoders};
//! use std::path::PathBuf;
//!
//! let config = TranscodeConfigBuilder::new().hevc(true).dry_run(true).build().unwrap();
//! let inputs = vec![PathBuf::from("/rips/Movie.mkv")];
//! let cancel = CancellationToken::new();
//!
//! verify_dependencies().unwrap();
//! let inventory = query_encoder_inventory(&cancel).unwrap();
//! let spawner = SidecarSpawner;
//! let encoders = resolve_encoders(&config, &inventory, &spawner, &inputs[0], &cancel).unwrap();
//!
//! let ffprobe = CommandFfprobeExecutor::new(cancel.clone());
//! let editor = Mkvpropedit::new(cancel.clone());
//! let pipeline = Pipeline::new(&spawner, &ffprobe, &editor, &config, Some(encoders), cancel);
//! let summary = pipeline.run(&inputs, |input, result| {
//!     println!("{}: {}", input.display(), result.is_ok());
//! });
//! assert!(summary.is_success());
//! ```

pub mod config;
pub mod crop;
pub mod error;
pub mod external;
pub mod media;
pub mod plan;
pub mod processing;
pub mod utils;

// Re-exports for public API
pub use config::{TranscodeConfig, TranscodeConfigBuilder};
pub use crop::{CropSampler, Rectangle, detect_crop};
pub use error::{CoreError, CoreResult};
pub use media::{StreamCatalog, StreamDescriptor};
pub use plan::{InvocationPlan, PlanInputs, assemble_plan};
pub use processing::{FileOutcome, Pipeline, ResolvedEncoders, RunSummary, resolve_encoders};
pub use utils::{escape_command, format_duration};
