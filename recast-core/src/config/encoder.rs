// ============================================================================
// recast-core/src/config/encoder.rs
// ============================================================================
//
// ENCODER RESOLUTION: Family x Standard -> concrete ffmpeg encoder
//
// The configuration only records which encoder family and video standard
// were asked for. The concrete identifier is derived here, once the local
// ffmpeg's encoder inventory is known and, for automatic selection, after a
// one-frame probe encode has confirmed the hardware actually works.
//
// KEY COMPONENTS:
// - EncoderFamily / Standard: the two axes of video encoder choice
// - VideoEncoder: the resolved video encoder (or stream copy)
// - EncoderInventory: names parsed from `ffmpeg -encoders`
// - AudioEncoders: the resolved surround/stereo/fallback audio encoders
// - resolve_video_encoder: automatic and explicit selection

// ---- Internal crate imports ----
use super::{AudioCodecPolicy, EncoderChoice, TranscodeConfig};
use crate::error::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// DRM render node used by VAAPI encoders.
pub const VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Hardware families tried, in order, after VideoToolbox.
const AUTO_HARDWARE_ORDER: [EncoderFamily; 4] = [
    EncoderFamily::Nvenc,
    EncoderFamily::Qsv,
    EncoderFamily::Amf,
    EncoderFamily::Vaapi,
];

// ============================================================================
// FAMILY AND STANDARD
// ============================================================================

/// Platform or library providing the video encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderFamily {
    VideoToolbox,
    Nvenc,
    Qsv,
    Amf,
    Vaapi,
    /// x264 / x265
    Software,
}

impl EncoderFamily {
    fn suffix(self) -> &'static str {
        match self {
            EncoderFamily::VideoToolbox => "videotoolbox",
            EncoderFamily::Nvenc => "nvenc",
            EncoderFamily::Qsv => "qsv",
            EncoderFamily::Amf => "amf",
            EncoderFamily::Vaapi => "vaapi",
            EncoderFamily::Software => "",
        }
    }

    /// Whether HEVC output from this family defaults to 10-bit.
    pub fn defaults_to_ten_bit_hevc(self) -> bool {
        matches!(
            self,
            EncoderFamily::Nvenc | EncoderFamily::Qsv | EncoderFamily::Software
        )
    }
}

impl fmt::Display for EncoderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncoderFamily::Software => "software",
            other => other.suffix(),
        };
        f.write_str(name)
    }
}

/// Video coding standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Standard {
    #[default]
    H264,
    Hevc,
}

impl Standard {
    fn prefix(self) -> &'static str {
        match self {
            Standard::H264 => "h264",
            Standard::Hevc => "hevc",
        }
    }
}

/// ffmpeg encoder name for a family and standard.
pub fn encoder_identifier(family: EncoderFamily, standard: Standard) -> String {
    match (family, standard) {
        (EncoderFamily::Software, Standard::H264) => "libx264".to_string(),
        (EncoderFamily::Software, Standard::Hevc) => "libx265".to_string(),
        (family, standard) => format!("{}_{}", standard.prefix(), family.suffix()),
    }
}

// ============================================================================
// RESOLVED VIDEO ENCODER
// ============================================================================

/// The video encoder a plan is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoEncoder {
    Copy,
    Encode {
        family: EncoderFamily,
        standard: Standard,
    },
}

impl VideoEncoder {
    pub fn encode(family: EncoderFamily, standard: Standard) -> Self {
        VideoEncoder::Encode { family, standard }
    }

    /// ffmpeg `-c:v` value.
    pub fn identifier(&self) -> String {
        match self {
            VideoEncoder::Copy => "copy".to_string(),
            VideoEncoder::Encode { family, standard } => encoder_identifier(*family, *standard),
        }
    }

    pub fn family(&self) -> Option<EncoderFamily> {
        match self {
            VideoEncoder::Copy => None,
            VideoEncoder::Encode { family, .. } => Some(*family),
        }
    }

    pub fn standard(&self) -> Option<Standard> {
        match self {
            VideoEncoder::Copy => None,
            VideoEncoder::Encode { standard, .. } => Some(*standard),
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, VideoEncoder::Copy)
    }

    pub fn is_hevc(&self) -> bool {
        self.standard() == Some(Standard::Hevc)
    }

    pub fn is_family(&self, family: EncoderFamily) -> bool {
        self.family() == Some(family)
    }

    pub fn is(&self, family: EncoderFamily, standard: Standard) -> bool {
        self.family() == Some(family) && self.standard() == Some(standard)
    }
}

impl fmt::Display for VideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

// ============================================================================
// ENCODER INVENTORY
// ============================================================================

/// Encoder names compiled into the local ffmpeg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderInventory {
    names: BTreeSet<String>,
}

impl EncoderInventory {
    /// Parses the `ffmpeg -encoders` listing. Each encoder line starts with
    /// a six-character capability field followed by the encoder name; the
    /// header block above the `------` separator is skipped.
    pub fn parse(listing: &str) -> Self {
        let mut names = BTreeSet::new();
        let mut in_body = false;

        for line in listing.lines() {
            let trimmed = line.trim();
            if !in_body {
                if trimmed.starts_with("------") {
                    in_body = true;
                }
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            if let (Some(flags), Some(name)) = (fields.next(), fields.next()) {
                if flags.len() == 6 {
                    names.insert(name.to_string());
                }
            }
        }

        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ============================================================================
// VIDEO ENCODER SELECTION
// ============================================================================

/// Arguments (without the program name) of the one-frame encode used to
/// confirm that `encoder` works on this machine.
pub fn encoder_probe_args(encoder: &str, input: &Path) -> Vec<OsString> {
    let mut args = Vec::new();
    let vaapi = encoder.ends_with("_vaapi");

    push_args(&mut args, &["-loglevel", "quiet"]);
    if vaapi {
        push_args(&mut args, &["-vaapi_device", VAAPI_DEVICE]);
    }
    push_args(&mut args, &["-i"]);
    args.push(input.as_os_str().to_owned());
    push_args(&mut args, &["-frames:v", "1"]);
    if vaapi {
        push_args(&mut args, &["-filter:v", "format=nv12,hwupload"]);
    }
    push_args(&mut args, &["-c:v", encoder, "-b:v", "1000k"]);

    if encoder.ends_with("_nvenc") {
        push_args(&mut args, &["-rc:v", "vbr"]);
    }
    match encoder {
        "h264_qsv" => push_args(&mut args, &["-look_ahead:v", "1"]),
        "hevc_qsv" => push_args(&mut args, &["-load_plugin:v", "hevc_hw"]),
        _ => {}
    }
    if encoder.ends_with("_amf") {
        push_args(&mut args, &["-rc:v", "vbr_latency"]);
    }

    push_args(&mut args, &["-an", "-sn", "-ignore_unknown", "-f", "null", "-"]);
    args
}

fn push_args(args: &mut Vec<OsString>, values: &[&str]) {
    args.extend(values.iter().copied().map(OsString::from));
}

/// Turns the configured encoder choice into a concrete encoder.
///
/// `probe` is only consulted for automatic selection and receives an
/// encoder identifier; it should return whether a test encode succeeded.
pub fn resolve_video_encoder<P>(
    config: &TranscodeConfig,
    inventory: &EncoderInventory,
    mut probe: P,
) -> CoreResult<VideoEncoder>
where
    P: FnMut(&str) -> bool,
{
    let standard = config.standard;

    match config.encoder {
        EncoderChoice::Copy => Ok(VideoEncoder::Copy),
        EncoderChoice::Family(family) => {
            let encoder = VideoEncoder::encode(family, standard);
            let name = encoder.identifier();
            if !config.dry_run && !inventory.contains(&name) {
                return Err(CoreError::UnsupportedEncoder(name));
            }
            Ok(encoder)
        }
        EncoderChoice::Auto => {
            let toolbox = encoder_identifier(EncoderFamily::VideoToolbox, standard);
            if inventory.contains(&toolbox) {
                log::info!("Trying \"{}\" video encoder...", toolbox);
                if probe(&toolbox) {
                    return Ok(VideoEncoder::encode(EncoderFamily::VideoToolbox, standard));
                }
            } else {
                for family in AUTO_HARDWARE_ORDER {
                    let name = encoder_identifier(family, standard);
                    if !inventory.contains(&name) {
                        continue;
                    }
                    log::info!("Trying \"{}\" video encoder...", name);
                    if probe(&name) {
                        return Ok(VideoEncoder::encode(family, standard));
                    }
                }
            }
            Ok(VideoEncoder::encode(EncoderFamily::Software, standard))
        }
    }
}

// ============================================================================
// AUDIO ENCODERS
// ============================================================================

/// Audio encoders used by the audio plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEncoders {
    pub surround: String,
    pub stereo: String,
    /// Replaces `aac_at` for surround output, which it cannot produce.
    pub aac_fallback: String,
}

impl AudioEncoders {
    /// Resolves the codec policy against the available encoders. The best
    /// AAC encoder is `aac_at`, then `libfdk_aac`, then ffmpeg's `aac`.
    pub fn resolve(policy: AudioCodecPolicy, inventory: &EncoderInventory) -> Self {
        let best_aac = ["aac_at", "libfdk_aac"]
            .into_iter()
            .find(|name| inventory.contains(name))
            .unwrap_or("aac")
            .to_string();
        let aac_fallback = if inventory.contains("libfdk_aac") {
            "libfdk_aac"
        } else {
            "aac"
        }
        .to_string();

        let (surround, stereo) = match policy {
            AudioCodecPolicy::Ac3 => ("ac3".to_string(), best_aac),
            AudioCodecPolicy::Eac3 => ("eac3".to_string(), "eac3".to_string()),
            AudioCodecPolicy::Eac3Aac => ("eac3".to_string(), best_aac),
            AudioCodecPolicy::AacOnly => (best_aac.clone(), best_aac),
        };

        Self {
            surround,
            stereo,
            aac_fallback,
        }
    }
}
