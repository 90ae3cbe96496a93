// ============================================================================
// recast-core/src/plan/mod.rs
// ============================================================================
//
// PLAN DERIVATION: Stream metadata + configuration -> ffmpeg invocation
//
// Every builder here is a pure function of the stream catalog, the resolved
// configuration and the resolved encoders. Nothing in this module runs an
// external tool.
//
// KEY COMPONENTS:
// - video: filter chain, decode acceleration, tier, rate control, encode args
// - audio: per-track passthrough or transcode decisions
// - subtitle: forced, burned and sidecar subtitle handling
// - timing: seek position and output duration
// - assemble: the complete ffmpeg argument vector

pub mod assemble;
pub mod audio;
pub mod filters;
pub mod subtitle;
pub mod timing;
pub mod video;

pub use assemble::{InvocationPlan, PlanInputs, assemble_plan, output_path};
pub use audio::build_audio_plan;
pub use subtitle::{build_subtitle_plan, select_burn_subtitle};
pub use timing::{TimingPlan, build_timing};
pub use video::{VideoPlan, build_video_plan};

use std::fmt;

/// Whether a track is passed through or re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    Copy,
    Transcode,
}

/// Output disposition of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDisposition {
    Default,
    DefaultForced,
    None,
}

impl OutputDisposition {
    /// ffmpeg `-disposition` value.
    pub fn as_arg(self) -> &'static str {
        match self {
            OutputDisposition::Default => "default",
            OutputDisposition::DefaultForced => "default+forced",
            OutputDisposition::None => "0",
        }
    }
}

/// Decision for one output audio or subtitle track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlan {
    /// Stream index in the input file.
    pub source_index: u32,
    pub action: TrackAction,
    /// Encoder for transcoded tracks.
    pub encoder: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub channels: Option<u32>,
    pub disposition: OutputDisposition,
    /// Position among output tracks of the same type, from 0.
    pub output_ordinal: usize,
    /// libfdk_aac VBR mode, replacing the bitrate.
    pub vbr_mode: Option<u8>,
    pub resample_rate: Option<u32>,
    /// Keep the source title instead of clearing it.
    pub keep_title: bool,
    /// Source title, when one is kept and reported.
    pub title: Option<String>,
}

impl TrackPlan {
    /// Value for `-c:a:N` / `-c:s:N`.
    pub fn codec_arg(&self) -> &str {
        match self.action {
            TrackAction::Copy => "copy",
            TrackAction::Transcode => self.encoder.as_deref().unwrap_or("copy"),
        }
    }
}

/// One line of the stream mapping report, e.g.
/// ` 1 = ac3 / 640 Kbps / stereo`.
impl fmt::Display for TrackPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:2} = {}", self.source_index, self.codec_arg())?;
        if let Some(bitrate) = self.bitrate_kbps {
            write!(f, " / {bitrate} Kbps")?;
        }
        if let Some(mode) = self.vbr_mode {
            write!(f, " / VBR mode {mode}")?;
        }
        if self.channels.is_some_and(|c| c <= 2) {
            f.write_str(" / stereo")?;
        }
        if self.disposition == OutputDisposition::DefaultForced {
            f.write_str(" / force")?;
        }
        if let Some(title) = &self.title {
            write!(f, " / {title}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_line() {
        let plan = TrackPlan {
            source_index: 2,
            action: TrackAction::Transcode,
            encoder: Some("aac".into()),
            bitrate_kbps: Some(160),
            channels: Some(2),
            disposition: OutputDisposition::None,
            output_ordinal: 1,
            vbr_mode: None,
            resample_rate: None,
            keep_title: true,
            title: Some("Commentary".into()),
        };
        assert_eq!(plan.to_string(), " 2 = aac / 160 Kbps / stereo / Commentary");
        assert_eq!(OutputDisposition::DefaultForced.as_arg(), "default+forced");
    }
}
