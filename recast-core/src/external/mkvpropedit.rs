//! Matroska header edits applied after a successful encode.

use super::process::{CancellationToken, run_command};
use crate::error::CoreResult;
use crate::media::HdrMetadata;

use std::path::Path;
use std::process::Command;

/// Post-processing of a finished Matroska output.
pub trait MetadataEditor {
    /// Writes per-track statistics tags (bitrate, frame count, duration).
    fn add_track_statistics(&self, output: &Path) -> CoreResult<()>;

    /// Writes HDR mastering display and light level properties to the video
    /// track.
    fn apply_hdr(&self, output: &Path, hdr: &HdrMetadata) -> CoreResult<()>;
}

/// `MetadataEditor` backed by the `mkvpropedit` binary.
#[derive(Debug, Clone, Default)]
pub struct Mkvpropedit {
    cancel: CancellationToken,
}

impl Mkvpropedit {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl MetadataEditor for Mkvpropedit {
    fn add_track_statistics(&self, output: &Path) -> CoreResult<()> {
        log::info!("Adding track statistics...");
        let mut cmd = Command::new("mkvpropedit");
        cmd.arg(output).arg("--add-track-statistics-tags");
        run_command(cmd, "mkvpropedit", &self.cancel)?;
        Ok(())
    }

    fn apply_hdr(&self, output: &Path, hdr: &HdrMetadata) -> CoreResult<()> {
        log::info!("Adding HDR metadata...");
        let mut cmd = Command::new("mkvpropedit");
        cmd.arg(output)
            .args(["--edit", "track:v1"])
            .args(hdr.property_assignments());
        run_command(cmd, "mkvpropedit", &self.cancel)?;
        Ok(())
    }
}
