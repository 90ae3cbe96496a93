// ============================================================================
// recast-core/src/plan/video.rs
// ============================================================================
//
// VIDEO PLAN: Filters, decode acceleration and encode parameters
//
// Derivation is strictly sequenced: crop and scale geometry first, then the
// resolution tier of the final frame, then bitrate and rate-control buffers
// from the tier, and finally preset validation against the encoder family.
//
// KEY COMPONENTS:
// - VideoPlan: the resolved video side of an invocation
// - Tier limits: level, default bitrate and ceiling per tier and standard
// - Rate control, color tags, hardware decode and family options

// ---- Internal crate imports ----
use super::filters::{
    FilterChain, crop_filter, effective_bounds, frame_rate_filter, overlay_filter, scale_filter,
    scaled_size,
};
use crate::config::encoder::VAAPI_DEVICE;
use crate::config::{
    DecodeMethod, DecodeScope, EncoderFamily, OutputFormat, RateControlFactors, Standard, Tier,
    TranscodeConfig, VideoEncoder, X264RateMode,
};
use crate::crop::Rectangle;
use crate::error::{CoreError, CoreResult};
use crate::media::{StreamDescriptor, TEN_BIT_PIXEL_FORMAT};

// ---- Standard library imports ----
use std::fmt;

// ============================================================================
// TIER LIMITS
// ============================================================================

/// Level, default bitrate and bitrate ceiling (Kbps) of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub level: &'static str,
    pub default_h264: u32,
    pub default_hevc: u32,
    /// Default for x264 constant bitrate mode.
    pub default_cbr: u32,
    pub ceiling_h264: u32,
    pub ceiling_hevc: u32,
}

impl TierLimits {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::P2160 => Self {
                level: "5.1",
                default_h264: 12000,
                default_hevc: 8000,
                default_cbr: 15000,
                ceiling_h264: 135000,
                ceiling_hevc: 25000,
            },
            Tier::P1080 => Self {
                level: "4",
                default_h264: 6000,
                default_hevc: 4000,
                default_cbr: 7500,
                ceiling_h264: 20000,
                ceiling_hevc: 12000,
            },
            Tier::P720 => Self {
                level: "3.1",
                default_h264: 3000,
                default_hevc: 2000,
                default_cbr: 4500,
                ceiling_h264: 14000,
                ceiling_hevc: 10000,
            },
            Tier::P480 => Self {
                level: "3",
                default_h264: 1500,
                default_hevc: 1000,
                default_cbr: 2250,
                ceiling_h264: 10000,
                ceiling_hevc: 6000,
            },
        }
    }

    pub fn default_for(&self, standard: Standard) -> u32 {
        match standard {
            Standard::H264 => self.default_h264,
            Standard::Hevc => self.default_hevc,
        }
    }

    pub fn ceiling_for(&self, standard: Standard) -> u32 {
        match standard {
            Standard::H264 => self.ceiling_h264,
            Standard::Hevc => self.ceiling_hevc,
        }
    }
}

/// Target bitrate for a tier, clamped to the tier ceiling.
pub fn target_bitrate(config: &TranscodeConfig, encoder: &VideoEncoder, tier: Tier) -> u32 {
    let limits = TierLimits::for_tier(tier);
    let standard = encoder.standard().unwrap_or(config.standard);
    let cbr = encoder.is(EncoderFamily::Software, Standard::H264)
        && config.tuning.x264.mode == X264RateMode::Cbr;

    let default = if cbr {
        limits.default_cbr
    } else {
        limits.default_for(standard)
    };
    let bitrate = config
        .targets
        .global
        .or(config.targets.tier(tier))
        .unwrap_or(default);

    bitrate.min(limits.ceiling_for(standard))
}

// ============================================================================
// RATE CONTROL
// ============================================================================

/// Whether the encoder takes maxrate/bufsize.
fn uses_rate_control(encoder: &VideoEncoder) -> bool {
    encoder.is_family(EncoderFamily::Nvenc)
        || encoder.is_family(EncoderFamily::Software)
        || encoder.is(EncoderFamily::Qsv, Standard::Hevc)
}

/// A user rate value below the bitrate is a multiplier, otherwise Kbps. The
/// result is clamped to `[bitrate, upper]`.
fn user_rate(value: f64, bitrate: u32, upper: u32) -> u32 {
    let bitrate_f = f64::from(bitrate);
    let absolute = if value < bitrate_f {
        bitrate_f * value
    } else {
        value
    };
    let truncated = if absolute.is_finite() && absolute > 0.0 {
        absolute.min(f64::from(u32::MAX)) as u32
    } else {
        0
    };
    truncated.min(upper).max(bitrate)
}

/// maxrate and bufsize in Kbps, `None` when not emitted.
///
/// A user maxrate may reach the tier ceiling. A user bufsize is limited by
/// the resulting maxrate.
pub fn rate_control(
    encoder: &VideoEncoder,
    bitrate: u32,
    ceiling: u32,
    factors: &RateControlFactors,
) -> (Option<u32>, Option<u32>) {
    if !uses_rate_control(encoder) {
        return (None, None);
    }

    let maxrate = match factors.maxrate {
        Some(value) => user_rate(value, bitrate, ceiling),
        None => bitrate.saturating_mul(2).min(ceiling).max(bitrate),
    };

    let mut bufsize = if encoder.is(EncoderFamily::Qsv, Standard::Hevc) {
        None
    } else {
        Some(maxrate)
    };
    if let Some(value) = factors.bufsize {
        bufsize = Some(user_rate(value, bitrate, maxrate));
    }

    (Some(maxrate).filter(|m| *m > 0), bufsize.filter(|b| *b > 0))
}

// ============================================================================
// PRESETS
// ============================================================================

const NVENC_PRESETS: [&str; 10] = [
    "fast", "medium", "slow", "p1", "p2", "p3", "p4", "p5", "p6", "p7",
];
const QSV_PRESETS: [&str; 7] = [
    "veryfast", "faster", "fast", "medium", "slow", "slower", "veryslow",
];
const SOFTWARE_PRESETS: [&str; 10] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// Checks `preset` against the presets of the encoder family.
pub fn validate_preset(encoder: &VideoEncoder, preset: &str) -> CoreResult<()> {
    let valid: &[&str] = match encoder.family() {
        Some(EncoderFamily::Nvenc) => &NVENC_PRESETS,
        Some(EncoderFamily::Qsv) => &QSV_PRESETS,
        Some(EncoderFamily::Software) => &SOFTWARE_PRESETS,
        _ => &[],
    };

    if valid.contains(&preset) {
        Ok(())
    } else {
        Err(CoreError::InvalidPreset {
            preset: preset.to_string(),
            encoder: encoder.identifier(),
        })
    }
}

// ============================================================================
// COLOR
// ============================================================================

/// Color tags written to the encoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTags {
    pub primaries: String,
    pub transfer: String,
    pub space: String,
}

/// Source tags with HDR, baseline and BT.709 defaults filled in.
pub fn color_tags(
    video: &StreamDescriptor,
    ten_bit: bool,
    tier: Tier,
    width: u32,
    height: u32,
) -> ColorTags {
    let mut primaries = video.color_primaries.clone();
    let mut transfer = video.color_transfer.as_deref().map(|trc| match trc {
        "bt470m" => "gamma22".to_string(),
        "bt470bg" => "gamma28".to_string(),
        other => other.to_string(),
    });
    let mut space = video.color_space.clone();

    if video.pixel_format() == TEN_BIT_PIXEL_FORMAT && ten_bit {
        primaries.get_or_insert_with(|| "bt2020".to_string());
        transfer.get_or_insert_with(|| "smpte2084".to_string());
        space.get_or_insert_with(|| "bt2020nc".to_string());
    }

    if tier == Tier::P480 {
        let pal_mpeg2 = width == 720 && height == 576 && video.codec_name == "mpeg2video";
        let baseline = if pal_mpeg2 { "bt470bg" } else { "smpte170m" };
        primaries.get_or_insert_with(|| baseline.to_string());
        space.get_or_insert_with(|| "smpte170m".to_string());
    }

    ColorTags {
        primaries: primaries.unwrap_or_else(|| "bt709".to_string()),
        transfer: transfer.unwrap_or_else(|| "bt709".to_string()),
        space: space.unwrap_or_else(|| "bt709".to_string()),
    }
}

// ============================================================================
// HARDWARE DECODE
// ============================================================================

/// QSV decoder for a source codec.
fn qsv_decoder(codec: &str) -> Option<&'static str> {
    match codec {
        "av1" => Some("av1_qsv"),
        "h264" => Some("h264_qsv"),
        "hevc" => Some("hevc_qsv"),
        "mjpeg" => Some("mjpeg_qsv"),
        "mpeg2video" => Some("mpeg2_qsv"),
        "vc1" => Some("vc1_qsv"),
        "vp8" => Some("vp8_qsv"),
        "vp9" => Some("vp9_qsv"),
        _ => None,
    }
}

/// Decode arguments, possibly switching the chain to the CUDA-only path.
/// Returns the arguments and whether frames stay on the GPU.
fn decode_args(
    video: &StreamDescriptor,
    config: &TranscodeConfig,
    encoder: &VideoEncoder,
    chain: &mut FilterChain,
) -> (Vec<String>, bool) {
    let vaapi = encoder.is_family(EncoderFamily::Vaapi);
    let mut args: Vec<String> = if vaapi {
        vec!["-vaapi_device".into(), VAAPI_DEVICE.into()]
    } else {
        Vec::new()
    };

    let hardware_decode = match config.decode_scope {
        DecodeScope::Vc1 => video.codec_name == "vc1",
        DecodeScope::All => true,
        DecodeScope::None => false,
    };
    if !hardware_decode || encoder.is_copy() {
        return (args, false);
    }

    if vaapi {
        let args: Vec<String> = [
            "-hwaccel",
            "vaapi",
            "-hwaccel_device",
            VAAPI_DEVICE,
            "-hwaccel_output_format",
            "vaapi",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        return (args, false);
    }

    let method = match config.effective_decode_method(encoder) {
        DecodeMethod::Qsv if !encoder.is(EncoderFamily::Qsv, Standard::H264) => DecodeMethod::Auto,
        method => method,
    };
    args.extend(["-hwaccel".to_string(), method.as_str().to_string()]);

    let mut gpu_only = false;
    let needs_fps = chain
        .frame_rate
        .as_deref()
        .is_some_and(|f| f.contains("fps="));
    if config.tuning.nvenc.gpu_only
        && method == DecodeMethod::Cuda
        && encoder.is_family(EncoderFamily::Nvenc)
        && chain.overlay.is_none()
        && !needs_fps
        && chain.crop.is_none()
        && chain.scale.is_none()
    {
        args.extend(["-hwaccel_output_format".to_string(), "cuda".to_string()]);
        gpu_only = true;
        if let Some(frame_rate) = chain.frame_rate.as_mut() {
            if let Some(rest) = frame_rate.strip_prefix("yadif") {
                *frame_rate = format!("yadif_cuda{rest}");
            }
        }
    }

    if method == DecodeMethod::Qsv && !chain.has_software_steps() {
        if let Some(device) = &config.qsv_device {
            args.extend(["-qsv_device".to_string(), device.clone()]);
        }
        if let Some(decoder) = qsv_decoder(&video.codec_name) {
            args.extend(["-c:v".to_string(), decoder.to_string()]);
        }
    }

    (args, gpu_only)
}

// ============================================================================
// VIDEO PLAN
// ============================================================================

/// The resolved video side of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPlan {
    pub encoder: VideoEncoder,
    pub source_index: u32,
    pub filters: FilterChain,
    /// Arguments placed before `-i`.
    pub decode_args: Vec<String>,
    /// Mapping, filter and encoder arguments placed after `-i`.
    pub encode_args: Vec<String>,
    /// Final frame size after crop and scale.
    pub width: u32,
    pub height: u32,
    pub tier: Tier,
    pub level: &'static str,
    pub bitrate_kbps: u32,
    pub maxrate_kbps: Option<u32>,
    pub bufsize_kbps: Option<u32>,
    pub ten_bit: bool,
    pub colors: ColorTags,
    pub gpu_only: bool,
    summary: String,
}

/// Stream mapping line, e.g. ` 0 = hevc_nvenc / 4000 Kbps / slow`.
impl fmt::Display for VideoPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

fn push(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

/// Builds the video plan for `video`.
///
/// `crop` is the resolved crop rectangle (automatic or manual), `burn` the
/// subtitle stream to composite, if any.
///
/// # Errors
///
/// `StreamNotFound` when the stream has no dimensions, `InvalidPreset` when
/// the preset does not belong to the encoder family.
pub fn build_video_plan(
    video: &StreamDescriptor,
    config: &TranscodeConfig,
    encoder: &VideoEncoder,
    crop: Option<&Rectangle>,
    burn: Option<&StreamDescriptor>,
) -> CoreResult<VideoPlan> {
    let (source_width, source_height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(CoreError::StreamNotFound(
                "video stream has no dimensions".to_string(),
            ));
        }
    };
    let copy = encoder.is_copy();
    let hevc = encoder.is_hevc();

    // ---- Geometry ----
    let mut chain = FilterChain::default();
    if !copy {
        chain.overlay = burn.map(|sub| overlay_filter(sub.index, config.filters.overlay_params.as_deref()));
        chain.frame_rate = frame_rate_filter(&config.filters, video.is_progressive());
        chain.crop = crop_filter(crop, source_width, source_height);
    }

    let (mut width, mut height) = match (&chain.crop, crop) {
        (Some(_), Some(rect)) => (rect.width, rect.height),
        _ => (source_width, source_height),
    };

    if !copy {
        // Aspect ratio is not consulted; oversized frames always scale.
        let bounds = effective_bounds(config.bounds, hevc);
        if let Some(size) = scaled_size(width, height, bounds) {
            chain.scale = Some(scale_filter(size, chain.overlay.is_some()));
            (width, height) = size;
        }
    }

    // ---- Decode and conversion ----
    let (decode_args, gpu_only) = decode_args(video, config, encoder, &mut chain);
    let ten_bit = config.ten_bit_output(encoder, &video.codec_name);

    if encoder.is_family(EncoderFamily::Vaapi) && !decode_args.iter().any(|a| a == "-hwaccel") {
        chain.conversion = Some("format=nv12,hwupload".to_string());
    } else if gpu_only {
        let format = if ten_bit { "p010le" } else { "yuv420p" };
        chain.conversion = Some(format!("scale_cuda=format={format}"));
    }

    // ---- Tier and rate control ----
    let tier = Tier::for_dimensions(width, height);
    let limits = TierLimits::for_tier(tier);
    let standard = encoder.standard().unwrap_or(config.standard);
    let bitrate = target_bitrate(config, encoder, tier);
    let (maxrate, bufsize) = rate_control(
        encoder,
        bitrate,
        limits.ceiling_for(standard),
        &config.rate_control,
    );

    if let Some(preset) = &config.preset {
        validate_preset(encoder, preset)?;
    }

    let colors = color_tags(video, ten_bit, tier, width, height);

    // ---- Encode arguments ----
    let mut args = Vec::new();
    if !copy && video.codec_name == "mpeg2video" && video.avg_frame_rate.as_deref() == Some("30000/1001") {
        push(&mut args, "-vsync", "cfr");
    }

    let filter = chain.render();
    if chain.overlay.is_some() {
        push(
            &mut args,
            "-filter_complex",
            format!("[0:{}]{}[v]", video.index, filter.unwrap_or_default()),
        );
        push(&mut args, "-map", "[v]");
    } else {
        push(&mut args, "-map", format!("0:{}", video.index));
        if let Some(filter) = filter {
            push(&mut args, "-filter:v", filter);
        }
    }

    push(&mut args, "-c:v", encoder.identifier());
    if ten_bit && !gpu_only {
        let pix_fmt = match encoder.family() {
            Some(EncoderFamily::VideoToolbox | EncoderFamily::Nvenc | EncoderFamily::Qsv) => "p010le",
            _ => "yuv420p10le",
        };
        push(&mut args, "-pix_fmt:v", pix_fmt);
    }

    let cq = config
        .tuning
        .nvenc
        .cq
        .filter(|_| encoder.is_family(EncoderFamily::Nvenc));
    if !copy {
        match cq {
            Some(cq) => push(&mut args, "-cq:v", cq.to_string()),
            None => push(&mut args, "-b:v", format!("{bitrate}k")),
        }
    }
    if let Some(maxrate) = maxrate {
        push(&mut args, "-maxrate:v", format!("{maxrate}k"));
    }
    if let Some(bufsize) = bufsize {
        push(&mut args, "-bufsize:v", format!("{bufsize}k"));
    }
    if let Some(preset) = &config.preset {
        push(&mut args, "-preset:v", preset.clone());
    }

    args.extend(family_args(config, encoder, ten_bit, limits.level));

    if !ten_bit
        && (encoder.is(EncoderFamily::Nvenc, Standard::H264)
            || encoder.is(EncoderFamily::Amf, Standard::H264)
            || encoder.is(EncoderFamily::Software, Standard::H264))
    {
        push(&mut args, "-profile:v", "high");
    }

    if !copy {
        push(&mut args, "-color_primaries:v", colors.primaries.clone());
        push(&mut args, "-color_trc:v", colors.transfer.clone());
        push(&mut args, "-colorspace:v", colors.space.clone());
    }

    push(&mut args, "-metadata:s:v", "title=");
    push(&mut args, "-disposition:v", "default");

    if config.output_format == OutputFormat::Mp4 && hevc {
        push(&mut args, "-tag:v", "hvc1");
    }

    // ---- Summary ----
    let mut summary = format!("{:2} = {}", video.index, encoder);
    if !copy {
        match cq {
            Some(cq) => summary.push_str(&format!(" / {cq} CQ")),
            None => summary.push_str(&format!(" / {bitrate} Kbps")),
        }
        if let Some(preset) = &config.preset {
            summary.push_str(&format!(" / {preset}"));
        }
    }
    if let Some(sub) = burn {
        summary.push_str(&format!(" / {} = {} / burn", sub.index, sub.codec_name));
    }

    Ok(VideoPlan {
        encoder: encoder.clone(),
        source_index: video.index,
        filters: chain,
        decode_args,
        encode_args: args,
        width,
        height,
        tier,
        level: limits.level,
        bitrate_kbps: bitrate,
        maxrate_kbps: maxrate,
        bufsize_kbps: bufsize,
        ten_bit,
        colors,
        gpu_only,
        summary,
    })
}

/// Encoder-family specific options.
fn family_args(
    config: &TranscodeConfig,
    encoder: &VideoEncoder,
    ten_bit: bool,
    level: &str,
) -> Vec<String> {
    let mut args = Vec::new();
    let tuning = &config.tuning;

    match encoder {
        VideoEncoder::Copy => {}
        VideoEncoder::Encode { family, standard } => match family {
            EncoderFamily::VideoToolbox => {
                if tuning.videotoolbox.allow_sw {
                    push(&mut args, "-allow_sw:v", "1");
                }
                if ten_bit {
                    push(&mut args, "-profile:v", "main10");
                }
            }
            EncoderFamily::Nvenc => {
                let nvenc = &tuning.nvenc;
                if nvenc.spatial_aq {
                    push(&mut args, "-spatial-aq:v", "1");
                }
                if nvenc.temporal_aq {
                    push(&mut args, "-temporal-aq:v", "1");
                }
                if let Some(lookahead) = nvenc.lookahead {
                    push(&mut args, "-rc-lookahead:v", lookahead.to_string());
                }
                if let Some(multipass) = nvenc.multipass {
                    push(&mut args, "-multipass:v", multipass.as_str());
                }
                if let Some(refs) = nvenc.refs {
                    push(&mut args, "-refs:v", refs.to_string());
                }
                if let Some(bframes) = nvenc.bframes {
                    push(&mut args, "-bf:v", bframes.to_string());
                }
                if let Some(mode) = nvenc.bframe_refs {
                    push(&mut args, "-b_ref_mode:v", mode.as_str());
                }
            }
            EncoderFamily::Qsv => {
                if *standard == Standard::H264 {
                    push(&mut args, "-look_ahead:v", "1");
                }
                if let Some(refs) = tuning.qsv.refs {
                    push(&mut args, "-refs:v", refs.to_string());
                }
                if let Some(bframes) = tuning.qsv.bframes {
                    push(&mut args, "-bf:v", bframes.to_string());
                }
                if *standard == Standard::Hevc {
                    push(&mut args, "-load_plugin:v", "hevc_hw");
                }
            }
            EncoderFamily::Amf => {
                let amf = &tuning.amf;
                push(&mut args, "-rc:v", "vbr_latency");
                if let Some(quality) = amf.quality {
                    push(&mut args, "-quality:v", quality.as_str());
                }
                if amf.vbaq {
                    push(&mut args, "-enable_vbaq:v", "1");
                }
                if amf.pre_analysis {
                    push(&mut args, "-preanalysis:v", "1");
                }
                if let Some(refs) = amf.refs {
                    push(&mut args, "-refs:v", refs.to_string());
                }
                if let Some(bframes) = amf.bframes {
                    push(&mut args, "-bf:v", bframes.to_string());
                }
            }
            EncoderFamily::Vaapi => {
                if let Some(level) = tuning.vaapi.compression {
                    push(&mut args, "-compression_level:v", level.to_string());
                }
            }
            EncoderFamily::Software => match standard {
                Standard::H264 => {
                    let x264 = &tuning.x264;
                    if x264.mode == X264RateMode::Avbr {
                        push(&mut args, "-x264opts:v", "ratetol=inf");
                    }
                    if !x264.mbtree() {
                        push(&mut args, "-mbtree:v", "0");
                    }
                    match config.preset.as_deref() {
                        None if x264.quick => {
                            push(&mut args, "-refs:v", "1");
                            push(&mut args, "-rc-lookahead:v", "30");
                            push(&mut args, "-partitions:v", "none");
                        }
                        Some("slow" | "slower" | "veryslow" | "placebo") => {
                            push(&mut args, "-level:v", level);
                        }
                        _ => {}
                    }
                    if let Some(params) = &x264.params {
                        push(&mut args, "-x264-params:v", params.clone());
                    }
                }
                Standard::Hevc => {
                    if let Some(params) = &tuning.x265.params {
                        push(&mut args, "-x265-params:v", params.clone());
                    }
                }
            },
        },
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CropMode, TranscodeConfigBuilder};
    use crate::media::StreamCatalog;

    fn video(json_fields: &str) -> StreamDescriptor {
        let json = format!(
            r#"{{"streams": [{{"index": 0, "codec_type": "video", {json_fields}}}],
                "format": {{"duration": "3600"}}}}"#
        );
        StreamCatalog::from_json(&json)
            .unwrap()
            .video()
            .cloned()
            .unwrap()
    }

    fn hd_h264() -> StreamDescriptor {
        video(r#""codec_name": "h264", "width": 1920, "height": 1080, "field_order": "progressive""#)
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn tier_ceilings_hold() {
        for tier in Tier::ALL {
            let config = TranscodeConfigBuilder::new().target(1_000_000).build().unwrap();
            let limits = TierLimits::for_tier(tier);
            let x264 = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
            let x265 = VideoEncoder::encode(EncoderFamily::Software, Standard::Hevc);
            assert_eq!(target_bitrate(&config, &x264, tier), limits.ceiling_h264);
            assert_eq!(target_bitrate(&config, &x265, tier), limits.ceiling_hevc);
        }
    }

    #[test]
    fn tier_defaults_and_overrides() {
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let nvenc = VideoEncoder::encode(EncoderFamily::Nvenc, Standard::Hevc);
        assert_eq!(target_bitrate(&config, &nvenc, Tier::P2160), 8000);

        let config = TranscodeConfigBuilder::new()
            .tier_target(Tier::P720, 2500)
            .build()
            .unwrap();
        let x264 = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        assert_eq!(target_bitrate(&config, &x264, Tier::P720), 2500);
        assert_eq!(target_bitrate(&config, &x264, Tier::P1080), 6000);

        let cbr = TranscodeConfigBuilder::new()
            .x264_mode(X264RateMode::Cbr)
            .build()
            .unwrap();
        assert_eq!(target_bitrate(&cbr, &x264, Tier::P1080), 7500);
    }

    #[test]
    fn rate_control_limits() {
        let x264 = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        let none = RateControlFactors::default();
        assert_eq!(rate_control(&x264, 6000, 20000, &none), (Some(12000), Some(12000)));
        assert_eq!(rate_control(&x264, 15000, 20000, &none), (Some(20000), Some(20000)));

        let factors = RateControlFactors {
            maxrate: Some(1.5),
            bufsize: Some(30000.0),
        };
        assert_eq!(rate_control(&x264, 6000, 20000, &factors), (Some(9000), Some(9000)));

        let hevc_qsv = VideoEncoder::encode(EncoderFamily::Qsv, Standard::Hevc);
        assert_eq!(rate_control(&hevc_qsv, 4000, 12000, &none), (Some(8000), None));

        let vt = VideoEncoder::encode(EncoderFamily::VideoToolbox, Standard::H264);
        assert_eq!(rate_control(&vt, 6000, 20000, &none), (None, None));
    }

    #[test]
    fn user_maxrate_may_exceed_twice_the_bitrate() {
        let x264 = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        let absolute = RateControlFactors {
            maxrate: Some(18000.0),
            bufsize: None,
        };
        assert_eq!(rate_control(&x264, 6000, 20000, &absolute), (Some(18000), Some(18000)));

        let multiplier = RateControlFactors {
            maxrate: Some(3.0),
            bufsize: Some(30000.0),
        };
        assert_eq!(rate_control(&x264, 6000, 20000, &multiplier), (Some(18000), Some(18000)));

        let above_ceiling = RateControlFactors {
            maxrate: Some(50000.0),
            bufsize: Some(2.0),
        };
        assert_eq!(
            rate_control(&x264, 6000, 20000, &above_ceiling),
            (Some(20000), Some(12000))
        );
    }

    #[test]
    fn presets_per_family() {
        let nvenc = VideoEncoder::encode(EncoderFamily::Nvenc, Standard::H264);
        assert!(validate_preset(&nvenc, "p5").is_ok());
        assert!(validate_preset(&nvenc, "veryslow").is_err());
        let amf = VideoEncoder::encode(EncoderFamily::Amf, Standard::H264);
        assert!(matches!(
            validate_preset(&amf, "fast"),
            Err(CoreError::InvalidPreset { encoder, .. }) if encoder == "h264_amf"
        ));
    }

    #[test]
    fn color_defaults() {
        let hdr = video(
            r#""codec_name": "hevc", "width": 3840, "height": 2160, "pix_fmt": "yuv420p10le""#,
        );
        let tags = color_tags(&hdr, true, Tier::P2160, 3840, 2160);
        assert_eq!(tags.primaries, "bt2020");
        assert_eq!(tags.transfer, "smpte2084");
        assert_eq!(tags.space, "bt2020nc");

        let dvd = video(
            r#""codec_name": "mpeg2video", "width": 720, "height": 576, "color_transfer": "bt470bg""#,
        );
        let tags = color_tags(&dvd, false, Tier::P480, 720, 576);
        assert_eq!(tags.primaries, "bt470bg");
        assert_eq!(tags.transfer, "gamma28");
        assert_eq!(tags.space, "smpte170m");

        let tags = color_tags(&hd_h264(), false, Tier::P1080, 1920, 1080);
        assert_eq!(tags.primaries, "bt709");
    }

    #[test]
    fn crop_and_scale_for_h264() {
        let source = video(r#""codec_name": "hevc", "width": 3840, "height": 2160"#);
        let config = TranscodeConfigBuilder::new().crop(CropMode::Auto).build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        let crop = Rectangle::new(3840, 1600, 0, 280);

        let plan = build_video_plan(&source, &config, &encoder, Some(&crop), None).unwrap();
        assert_eq!((plan.width, plan.height), (1920, 800));
        assert_eq!(plan.tier, Tier::P1080);
        assert!(has_pair(
            &plan.encode_args,
            "-filter:v",
            "crop=3840:1600:0:280,scale=1920:800"
        ));
        assert!(has_pair(&plan.encode_args, "-b:v", "6000k"));
        assert!(has_pair(&plan.encode_args, "-profile:v", "high"));
        assert!(has_pair(&plan.encode_args, "-mbtree:v", "0"));
    }

    #[test]
    fn uhd_crop_stays_in_top_tier_for_hevc() {
        let source = video(r#""codec_name": "hevc", "width": 3840, "height": 2160"#);
        let config = TranscodeConfigBuilder::new().hevc(true).build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Nvenc, Standard::Hevc);
        let crop = Rectangle::new(3800, 2160, 20, 0);

        let plan = build_video_plan(&source, &config, &encoder, Some(&crop), None).unwrap();
        assert_eq!(plan.tier, Tier::P2160);
        assert_eq!(plan.bitrate_kbps, 8000);
        assert!(plan.ten_bit);
        assert!(has_pair(&plan.encode_args, "-pix_fmt:v", "p010le"));
        assert!(plan.to_string().contains("8000 Kbps"));
    }

    #[test]
    fn overlay_uses_filter_complex() {
        let source = hd_h264();
        let subtitle = StreamCatalog::from_json(
            r#"{"streams": [{"index": 4, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle"}]}"#,
        )
        .unwrap()
        .subtitle_track(1)
        .cloned()
        .unwrap();
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);

        let plan = build_video_plan(&source, &config, &encoder, None, Some(&subtitle)).unwrap();
        assert!(has_pair(&plan.encode_args, "-filter_complex", "[0:0][0:4]overlay[v]"));
        assert!(has_pair(&plan.encode_args, "-map", "[v]"));
        assert!(plan.to_string().ends_with("4 = hdmv_pgs_subtitle / burn"));
    }

    #[test]
    fn interlaced_vc1_with_nvenc_gpu_only() {
        let source = video(
            r#""codec_name": "vc1", "width": 1920, "height": 1080, "field_order": "tt""#,
        );
        let config = TranscodeConfigBuilder::new().nvenc_gpu_only().build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Nvenc, Standard::H264);

        let plan = build_video_plan(&source, &config, &encoder, None, None).unwrap();
        assert!(plan.gpu_only);
        assert_eq!(
            plan.decode_args,
            vec!["-hwaccel", "cuda", "-hwaccel_output_format", "cuda"]
        );
        assert!(has_pair(
            &plan.encode_args,
            "-filter:v",
            "yadif_cuda,scale_cuda=format=yuv420p"
        ));
    }

    #[test]
    fn vaapi_uploads_frames() {
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Vaapi, Standard::H264);
        let plan = build_video_plan(&hd_h264(), &config, &encoder, None, None).unwrap();
        assert_eq!(plan.decode_args, vec!["-vaapi_device", VAAPI_DEVICE]);
        assert!(has_pair(&plan.encode_args, "-filter:v", "format=nv12,hwupload"));
    }

    #[test]
    fn qsv_decoder_without_filters() {
        let config = TranscodeConfigBuilder::new()
            .decode_scope(DecodeScope::All)
            .qsv_device("/dev/dri/renderD129")
            .build()
            .unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Qsv, Standard::H264);
        let plan = build_video_plan(&hd_h264(), &config, &encoder, None, None).unwrap();
        assert_eq!(
            plan.decode_args,
            vec!["-hwaccel", "qsv", "-qsv_device", "/dev/dri/renderD129", "-c:v", "h264_qsv"]
        );
        assert!(has_pair(&plan.encode_args, "-look_ahead:v", "1"));
    }

    #[test]
    fn copy_maps_stream_only() {
        let config = TranscodeConfigBuilder::new().copy_video().build().unwrap();
        let plan = build_video_plan(&hd_h264(), &config, &VideoEncoder::Copy, None, None).unwrap();
        assert_eq!(
            plan.encode_args,
            vec![
                "-map",
                "0:0",
                "-c:v",
                "copy",
                "-metadata:s:v",
                "title=",
                "-disposition:v",
                "default"
            ]
        );
        assert!(plan.decode_args.is_empty());
    }

    #[test]
    fn cq_replaces_bitrate() {
        let config = TranscodeConfigBuilder::new().nvenc_cq(22.0).build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Nvenc, Standard::H264);
        let plan = build_video_plan(&hd_h264(), &config, &encoder, None, None).unwrap();
        assert!(has_pair(&plan.encode_args, "-cq:v", "22"));
        assert!(!plan.encode_args.iter().any(|a| a == "-b:v"));
        assert!(plan.to_string().ends_with("22 CQ"));
    }

    #[test]
    fn mp4_hevc_gets_hvc1_tag() {
        let config = TranscodeConfigBuilder::new()
            .hevc(true)
            .output_format(OutputFormat::Mp4)
            .build()
            .unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::VideoToolbox, Standard::Hevc);
        let plan = build_video_plan(&hd_h264(), &config, &encoder, None, None).unwrap();
        assert!(has_pair(&plan.encode_args, "-tag:v", "hvc1"));
        assert!(!plan.ten_bit);
    }

    #[test]
    fn invalid_preset_fails_plan() {
        let config = TranscodeConfigBuilder::new().preset("p7").build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        assert!(matches!(
            build_video_plan(&hd_h264(), &config, &encoder, None, None),
            Err(CoreError::InvalidPreset { .. })
        ));
    }
}
