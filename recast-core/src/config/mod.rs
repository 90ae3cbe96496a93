//! Configuration structures and constants for the recast-core library.
//!
//! `TranscodeConfig` is the resolved record of every user option. It is
//! produced once by `TranscodeConfigBuilder::build`, which rejects
//! contradictory combinations, and is read-only afterwards. Encoder
//! identifiers are not stored here; see `encoder` for how the family and
//! standard become a concrete encoder.

mod builder;
pub mod encoder;
pub mod parse;

use std::fmt;
use std::path::PathBuf;

pub use builder::TranscodeConfigBuilder;
pub use encoder::{
    AudioEncoders, EncoderFamily, EncoderInventory, Standard, VideoEncoder, encoder_identifier,
    resolve_video_encoder,
};

// Default constants

/// Default bounds that output video is scaled to fit within.
pub const DEFAULT_MAX_WIDTH: u32 = 3840;
pub const DEFAULT_MAX_HEIGHT: u32 = 2160;

/// Bounds used by `--1080p` and imposed on every H.264 encode.
pub const FHD_MAX_WIDTH: u32 = 1920;
pub const FHD_MAX_HEIGHT: u32 = 1080;

/// Bounds used by `--720p`.
pub const HD_MAX_WIDTH: u32 = 1280;
pub const HD_MAX_HEIGHT: u32 = 720;

/// Surround AC-3 at or below this bitrate (Kbps) is passed through when
/// surround passthrough is limited.
pub const DEFAULT_SURROUND_PASSTHROUGH_KBPS: u64 = 640;

/// Stereo AC-3 at or below this bitrate (Kbps) is passed through.
pub const DEFAULT_STEREO_PASSTHROUGH_KBPS: u64 = 256;

/// Audio track used as the main track unless another is selected.
pub const DEFAULT_MAIN_AUDIO_TRACK: u32 = 1;

/// Directory outputs are written to by default.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

// ============================================================================
// GENERAL OPTIONS
// ============================================================================

/// What to do with each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Transcode,
    /// Print stream information only.
    Scan,
    /// Print the detected crop geometry only.
    PrintCrop,
    /// Print mpv commands previewing the detected crop.
    PreviewCrop,
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Mkv,
    Mp4,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mkv => "mkv",
            OutputFormat::Mp4 => "mp4",
        }
    }
}

// ============================================================================
// VIDEO OPTIONS
// ============================================================================

/// How the video encoder is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderChoice {
    /// Probe hardware encoders, falling back to software.
    #[default]
    Auto,
    Family(EncoderFamily),
    /// Copy the video stream without transcoding.
    Copy,
}

/// Which sources are decoded in hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeScope {
    #[default]
    Vc1,
    All,
    None,
}

/// ffmpeg `-hwaccel` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMethod {
    Auto,
    Cuda,
    Qsv,
}

impl DecodeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeMethod::Auto => "auto",
            DecodeMethod::Cuda => "cuda",
            DecodeMethod::Qsv => "qsv",
        }
    }
}

/// Crop source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    #[default]
    None,
    Auto,
    /// Four values as given: `W:H:X:Y`, or `T:B:L:R` when they fit the
    /// frame margins.
    Manual([u32; 4]),
}

/// Bounds output video must fit within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAX_WIDTH,
            height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// Resolution band driving level and bitrate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    P2160,
    P1080,
    P720,
    P480,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::P2160, Tier::P1080, Tier::P720, Tier::P480];

    /// Tier of a final (cropped and scaled) frame size.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if width > 1920 || height > 1080 {
            Tier::P2160
        } else if width > 1280 || height > 720 {
            Tier::P1080
        } else if width > 720 || height > 576 {
            Tier::P720
        } else {
            Tier::P480
        }
    }

    fn slot(self) -> usize {
        match self {
            Tier::P2160 => 0,
            Tier::P1080 => 1,
            Tier::P720 => 2,
            Tier::P480 => 3,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::P2160 => "2160p",
            Tier::P1080 => "1080p",
            Tier::P720 => "720p",
            Tier::P480 => "480p",
        })
    }
}

/// Video bitrate targets in Kbps: one global value or per-tier values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitrateTargets {
    pub global: Option<u32>,
    per_tier: [Option<u32>; 4],
}

impl BitrateTargets {
    pub fn tier(&self, tier: Tier) -> Option<u32> {
        self.per_tier[tier.slot()]
    }

    pub fn set_tier(&mut self, tier: Tier, kbps: u32) {
        self.per_tier[tier.slot()] = Some(kbps);
    }

    pub fn has_tier_targets(&self) -> bool {
        self.per_tier.iter().any(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_none() && !self.has_tier_targets()
    }
}

/// Video filter toggles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOptions {
    pub deinterlace: bool,
    /// `N/D` frame rate for the fps filter.
    pub rate: Option<String>,
    pub detelecine: bool,
    /// Automatic deinterlacing of interlaced sources.
    pub auto_filters: bool,
    pub overlay_params: Option<String>,
    pub yadif_params: Option<String>,
}

/// User rate-control values. Below the bitrate they are multipliers,
/// otherwise absolute Kbps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateControlFactors {
    pub maxrate: Option<f64>,
    pub bufsize: Option<f64>,
}

// ---- Family tuning ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvencMultipass {
    Qres,
    Fullres,
}

impl NvencMultipass {
    pub fn as_str(self) -> &'static str {
        match self {
            NvencMultipass::Qres => "qres",
            NvencMultipass::Fullres => "fullres",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BframeRefMode {
    Each,
    Middle,
}

impl BframeRefMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BframeRefMode::Each => "each",
            BframeRefMode::Middle => "middle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmfQuality {
    Balanced,
    Speed,
    Quality,
}

impl AmfQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            AmfQuality::Balanced => "balanced",
            AmfQuality::Speed => "speed",
            AmfQuality::Quality => "quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoToolboxTuning {
    pub allow_sw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NvencTuning {
    pub spatial_aq: bool,
    pub temporal_aq: bool,
    /// Frames, 1 to 32.
    pub lookahead: Option<u32>,
    pub multipass: Option<NvencMultipass>,
    pub refs: Option<u32>,
    /// 0 to 4.
    pub bframes: Option<u32>,
    pub bframe_refs: Option<BframeRefMode>,
    /// Constant quality, 1 to 51. Replaces the bitrate.
    pub cq: Option<f64>,
    /// Keep decoded frames on the GPU when no CPU filter is needed.
    pub gpu_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QsvTuning {
    pub refs: Option<u32>,
    /// -1 or more.
    pub bframes: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmfTuning {
    pub quality: Option<AmfQuality>,
    pub vbaq: bool,
    pub pre_analysis: bool,
    pub refs: Option<u32>,
    /// 1 or more.
    pub bframes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaapiTuning {
    pub compression: Option<u32>,
}

/// x264 rate-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum X264RateMode {
    #[default]
    Default,
    /// Constant bitrate: maxrate equals bitrate, macroblock-tree on.
    Cbr,
    /// Average variable bitrate (`ratetol=inf`).
    Avbr,
    /// Macroblock-tree rate control.
    Mbtree,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct X264Tuning {
    pub mode: X264RateMode,
    pub quick: bool,
    pub params: Option<String>,
}

impl X264Tuning {
    /// Macroblock-tree is on for CBR, explicit mbtree and custom params.
    pub fn mbtree(&self) -> bool {
        matches!(self.mode, X264RateMode::Cbr | X264RateMode::Mbtree) || self.params.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct X265Tuning {
    pub params: Option<String>,
}

/// Family-specific encoder options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncoderTuning {
    pub videotoolbox: VideoToolboxTuning,
    pub nvenc: NvencTuning,
    pub qsv: QsvTuning,
    pub amf: AmfTuning,
    pub vaapi: VaapiTuning,
    pub x264: X264Tuning,
    pub x265: X265Tuning,
}

impl EncoderTuning {
    /// Families with at least one option set, with the standard implied by
    /// software tuning (x264 is H.264, x265 is HEVC).
    pub fn tuned_families(&self) -> Vec<(EncoderFamily, Option<Standard>)> {
        let mut tuned = Vec::new();
        if self.videotoolbox != VideoToolboxTuning::default() {
            tuned.push((EncoderFamily::VideoToolbox, None));
        }
        if self.nvenc != NvencTuning::default() {
            tuned.push((EncoderFamily::Nvenc, None));
        }
        if self.qsv != QsvTuning::default() {
            tuned.push((EncoderFamily::Qsv, None));
        }
        if self.amf != AmfTuning::default() {
            tuned.push((EncoderFamily::Amf, None));
        }
        if self.vaapi != VaapiTuning::default() {
            tuned.push((EncoderFamily::Vaapi, None));
        }
        if self.x264 != X264Tuning::default() {
            tuned.push((EncoderFamily::Software, Some(Standard::H264)));
        }
        if self.x265 != X265Tuning::default() {
            tuned.push((EncoderFamily::Software, Some(Standard::Hevc)));
        }
        tuned
    }
}

// ============================================================================
// AUDIO OPTIONS
// ============================================================================

/// Channel layout requested for a selected audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioWidth {
    /// Handled as stereo.
    Mono,
    Stereo,
    Surround,
    /// Always passed through.
    Original,
}

impl fmt::Display for AudioWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioWidth::Mono => "mono",
            AudioWidth::Stereo => "stereo",
            AudioWidth::Surround => "surround",
            AudioWidth::Original => "original",
        })
    }
}

/// How a selection picks streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackMatch {
    /// 1-based ordinal among streams of the same type.
    Track(u32),
    /// ISO 639-2 language code.
    Language(String),
    /// Case-insensitive title substring.
    Title(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioSelection {
    pub matcher: TrackMatch,
    pub width: AudioWidth,
}

impl AudioSelection {
    pub fn new(matcher: TrackMatch, width: AudioWidth) -> Self {
        Self { matcher, width }
    }
}

/// Audio format policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioCodecPolicy {
    /// AC-3 surround, AAC stereo.
    #[default]
    Ac3,
    /// E-AC-3 for everything.
    Eac3,
    /// E-AC-3 surround, AAC stereo.
    Eac3Aac,
    /// AAC for everything.
    AacOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// The first selection is the main track.
    pub selections: Vec<AudioSelection>,
    pub policy: AudioCodecPolicy,
    pub surround_bitrate: Option<u32>,
    pub stereo_bitrate: Option<u32>,
    pub mono_bitrate: Option<u32>,
    /// Pass through AC-3-family surround regardless of bitrate.
    pub keep_ac3_surround: bool,
    /// Pass through AC-3-family stereo regardless of bitrate.
    pub keep_ac3_stereo: bool,
    pub pass_dts: bool,
    /// libfdk_aac VBR mode, 1 to 5.
    pub fdk_vbr_mode: Option<u8>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            selections: vec![AudioSelection::new(
                TrackMatch::Track(DEFAULT_MAIN_AUDIO_TRACK),
                AudioWidth::Surround,
            )],
            policy: AudioCodecPolicy::default(),
            surround_bitrate: None,
            stereo_bitrate: None,
            mono_bitrate: None,
            keep_ac3_surround: true,
            keep_ac3_stereo: false,
            pass_dts: false,
            fdk_vbr_mode: None,
        }
    }
}

impl AudioConfig {
    /// Ordinal and width of the main selection.
    pub fn main(&self) -> (u32, AudioWidth) {
        match self.selections.first() {
            Some(AudioSelection {
                matcher: TrackMatch::Track(n),
                width,
            }) => (*n, *width),
            _ => (DEFAULT_MAIN_AUDIO_TRACK, AudioWidth::Surround),
        }
    }

    pub fn additional(&self) -> &[AudioSelection] {
        self.selections.get(1..).unwrap_or(&[])
    }

    pub fn surround_threshold(&self) -> u64 {
        self.surround_bitrate
            .map_or(DEFAULT_SURROUND_PASSTHROUGH_KBPS, u64::from)
    }

    pub fn stereo_threshold(&self) -> u64 {
        self.stereo_bitrate
            .map_or(DEFAULT_STEREO_PASSTHROUGH_KBPS, u64::from)
    }

    /// Explicit mono bitrate, else half of an explicit stereo bitrate.
    pub fn effective_mono_bitrate(&self) -> Option<u32> {
        self.mono_bitrate.or(self.stereo_bitrate.map(|b| b / 2))
    }
}

// ============================================================================
// SUBTITLE OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubtitleMatch {
    Track(u32),
    /// First stream flagged forced.
    Auto,
    Language(String),
    Title(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtitleSelection {
    pub matcher: SubtitleMatch,
    /// Only meaningful for `Track`: output this stream as forced.
    pub forced: bool,
}

impl SubtitleSelection {
    pub fn new(matcher: SubtitleMatch) -> Self {
        Self {
            matcher,
            forced: false,
        }
    }

    pub fn forced_track(ordinal: u32) -> Self {
        Self {
            matcher: SubtitleMatch::Track(ordinal),
            forced: true,
        }
    }
}

/// Image subtitle composited into the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurnSelection {
    #[default]
    None,
    /// 1-based ordinal among subtitle streams.
    Track(u32),
    /// First forced image subtitle.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleConfig {
    pub selections: Vec<SubtitleSelection>,
    pub burn: BurnSelection,
}

impl SubtitleConfig {
    /// Automatic forced-track detection is on when `auto` was selected and no
    /// explicit forced track was.
    pub fn auto_forced(&self) -> bool {
        self.selections
            .iter()
            .any(|s| s.matcher == SubtitleMatch::Auto)
            && !self.selections.iter().any(|s| s.forced)
    }
}

// ============================================================================
// RESOLVED CONFIGURATION
// ============================================================================

/// Every option of a run, resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeConfig {
    pub mode: RunMode,
    pub output_format: OutputFormat,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub debug: bool,
    pub copy_track_names: bool,
    pub max_muxing_queue_size: Option<u32>,

    /// Seek position in seconds.
    pub position: Option<f64>,
    /// Output duration in seconds.
    pub duration: Option<f64>,

    pub encoder: EncoderChoice,
    pub standard: Standard,
    /// `None` means the family/standard default.
    pub ten_bit: Option<bool>,
    pub eight_bit_vc1: bool,
    pub preset: Option<String>,
    pub decode_scope: DecodeScope,
    /// `None` means cuda for NVENC, auto otherwise.
    pub decode_method: Option<DecodeMethod>,
    pub qsv_device: Option<String>,

    pub crop: CropMode,
    pub bounds: ScaleBounds,
    pub filters: FilterOptions,
    pub targets: BitrateTargets,
    pub rate_control: RateControlFactors,
    pub tuning: EncoderTuning,

    pub audio: AudioConfig,
    pub subtitles: SubtitleConfig,
}

impl TranscodeConfig {
    /// Decode method once the encoder is known.
    pub fn effective_decode_method(&self, encoder: &VideoEncoder) -> DecodeMethod {
        self.decode_method.unwrap_or(if encoder.is_family(EncoderFamily::Nvenc) {
            DecodeMethod::Cuda
        } else {
            DecodeMethod::Auto
        })
    }

    /// Whether the encode is 10-bit for a source codec.
    pub fn ten_bit_output(&self, encoder: &VideoEncoder, source_codec: &str) -> bool {
        let wanted = match self.ten_bit {
            Some(explicit) => explicit,
            None => match encoder {
                VideoEncoder::Encode {
                    family,
                    standard: Standard::Hevc,
                } => family.defaults_to_ten_bit_hevc(),
                _ => false,
            },
        };
        wanted && !encoder.is_copy() && !(self.eight_bit_vc1 && source_codec == "vc1")
    }
}
