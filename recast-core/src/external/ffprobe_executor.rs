//! ffprobe integration for stream catalogs and HDR side data.
//!
//! Both queries run ffprobe with JSON output and hand the document to the
//! typed parsers in `media`.

use super::process::{CancellationToken, run_command};
use crate::error::CoreResult;
use crate::media::{HdrMetadata, StreamCatalog};

use std::path::Path;
use std::process::Command;

/// Trait for the metadata queries the pipeline needs from ffprobe.
pub trait FfprobeExecutor {
    /// Streams and format of `input_path`.
    fn probe(&self, input_path: &Path) -> CoreResult<StreamCatalog>;

    /// Mastering display and content light level of the first video frame of
    /// `path`, when both are present.
    fn first_frame_hdr(&self, path: &Path) -> CoreResult<Option<HdrMetadata>>;
}

/// `FfprobeExecutor` that runs the `ffprobe` binary.
#[derive(Debug, Clone, Default)]
pub struct CommandFfprobeExecutor {
    cancel: CancellationToken,
}

impl CommandFfprobeExecutor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl FfprobeExecutor for CommandFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<StreamCatalog> {
        log::debug!("Scanning media: {}", input_path.display());
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-loglevel",
            "quiet",
            "-show_streams",
            "-show_format",
            "-print_format",
            "json",
        ])
        .arg(input_path);

        let output = run_command(cmd, "ffprobe", &self.cancel)?;
        StreamCatalog::from_json(&output.stdout)
    }

    fn first_frame_hdr(&self, path: &Path) -> CoreResult<Option<HdrMetadata>> {
        log::debug!("Reading HDR side data: {}", path.display());
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-loglevel",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_frames",
            "-read_intervals",
            "%+#1",
            "-show_entries",
            "frame=side_data_list",
            "-print_format",
            "json",
        ])
        .arg(path);

        let output = run_command(cmd, "ffprobe", &self.cancel)?;
        HdrMetadata::from_frames_json(&output.stdout)
    }
}
