// ============================================================================
// recast-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for TranscodeConfig
//
// Options are collected in any order and resolved in a single `build` pass.
// The pass rejects combinations that contradict each other instead of
// letting the later option silently win, then derives the dependent flags
// (automatic filters, implied encoder family, decode method).
//
// KEY COMPONENTS:
// - TranscodeConfigBuilder: fluent setters with documented defaults
// - build(): contradiction checks and derived values

// ---- Standard library imports ----
use std::collections::HashSet;
use std::hash::Hash;
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::parse::validate_filter_params;
use super::{
    AmfQuality, AudioCodecPolicy, AudioConfig, AudioSelection, AudioWidth, BframeRefMode,
    BitrateTargets, BurnSelection, CropMode, DecodeMethod, DecodeScope, EncoderChoice,
    EncoderFamily, EncoderTuning, FilterOptions, NvencMultipass, OutputFormat, RateControlFactors,
    RunMode, ScaleBounds, Standard, SubtitleConfig, SubtitleSelection, Tier, TrackMatch,
    TranscodeConfig, X264RateMode, DEFAULT_OUTPUT_DIR,
};
use crate::error::{CoreError, CoreResult};

/// Upper bound for the NVENC lookahead depth.
const MAX_NVENC_LOOKAHEAD: u32 = 32;

/// Builder for `TranscodeConfig`.
///
/// # Examples
///
/// ```rust
/// use recast_core::config::{CropMode, EncoderFamily, TranscodeConfigBuilder};
///
/// let config = TranscodeConfigBuilder::new()
///     .hevc(true)
///     .encoder_family(EncoderFamily::Nvenc)
///     .crop(CropMode::Auto)
///     .target(5000)
///     .build()
///     .unwrap();
/// assert!(config.filters.auto_filters);
/// ```
#[derive(Debug, Clone)]
pub struct TranscodeConfigBuilder {
    mode: RunMode,
    output_format: OutputFormat,
    output_dir: PathBuf,
    dry_run: bool,
    debug: bool,
    copy_track_names: bool,
    max_muxing_queue_size: Option<u32>,
    position: Option<f64>,
    duration: Option<f64>,

    encoder: EncoderChoice,
    standard: Option<Standard>,
    ten_bit: Option<bool>,
    eight_bit_vc1: bool,
    preset: Option<String>,
    decode_scope: Option<DecodeScope>,
    decode_method: Option<DecodeMethod>,
    qsv_device: Option<String>,

    crop: CropMode,
    bounds: ScaleBounds,
    filters: FilterOptions,
    disable_filters: bool,
    targets: BitrateTargets,
    rate_control: RateControlFactors,
    tuning: EncoderTuning,

    audio: AudioConfig,
    subtitles: SubtitleConfig,
}

impl Default for TranscodeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeConfigBuilder {
    /// Creates a builder holding every default.
    pub fn new() -> Self {
        Self {
            mode: RunMode::default(),
            output_format: OutputFormat::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            dry_run: false,
            debug: false,
            copy_track_names: false,
            max_muxing_queue_size: None,
            position: None,
            duration: None,

            encoder: EncoderChoice::Auto,
            standard: None,
            ten_bit: None,
            eight_bit_vc1: false,
            preset: None,
            decode_scope: None,
            decode_method: None,
            qsv_device: None,

            crop: CropMode::None,
            bounds: ScaleBounds::default(),
            filters: FilterOptions::default(),
            disable_filters: false,
            targets: BitrateTargets::default(),
            rate_control: RateControlFactors::default(),
            tuning: EncoderTuning::default(),

            audio: AudioConfig::default(),
            subtitles: SubtitleConfig::default(),
        }
    }

    // ---- General ----

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Print the ffmpeg command instead of running it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn copy_track_names(mut self, copy: bool) -> Self {
        self.copy_track_names = copy;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn max_muxing_queue_size(mut self, size: u32) -> Self {
        self.max_muxing_queue_size = Some(size.max(1));
        self
    }

    /// Start position in seconds.
    pub fn position(mut self, seconds: f64) -> Self {
        self.position = Some(seconds);
        self
    }

    /// Output duration in seconds.
    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    // ---- Video encoder ----

    /// Selects HEVC (`true`) or H.264 (`false`) explicitly.
    pub fn hevc(mut self, hevc: bool) -> Self {
        self.standard = Some(if hevc { Standard::Hevc } else { Standard::H264 });
        self
    }

    pub fn encoder_family(mut self, family: EncoderFamily) -> Self {
        self.encoder = EncoderChoice::Family(family);
        self
    }

    /// Copies the video stream instead of encoding it.
    pub fn copy_video(mut self) -> Self {
        self.encoder = EncoderChoice::Copy;
        self
    }

    /// `None` restores the family default.
    pub fn ten_bit(mut self, ten_bit: Option<bool>) -> Self {
        self.ten_bit = ten_bit;
        self
    }

    pub fn eight_bit_vc1(mut self, eight_bit: bool) -> Self {
        self.eight_bit_vc1 = eight_bit;
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn decode_scope(mut self, scope: DecodeScope) -> Self {
        self.decode_scope = Some(scope);
        self
    }

    pub fn decode_method(mut self, method: DecodeMethod) -> Self {
        self.decode_method = Some(method);
        self
    }

    /// Also selects the QSV decode method unless another one was set.
    pub fn qsv_device(mut self, device: impl Into<String>) -> Self {
        self.qsv_device = Some(device.into());
        self
    }

    // ---- Bitrate and rate control ----

    /// Global target in Kbps. Values below 1 are raised to 1.
    pub fn target(mut self, kbps: u32) -> Self {
        self.targets.global = Some(kbps.max(1));
        self
    }

    /// Per-tier target in Kbps. Values below 1 are raised to 1.
    pub fn tier_target(mut self, tier: Tier, kbps: u32) -> Self {
        self.targets.set_tier(tier, kbps.max(1));
        self
    }

    pub fn maxrate(mut self, value: f64) -> Self {
        self.rate_control.maxrate = Some(value);
        self
    }

    pub fn bufsize(mut self, value: f64) -> Self {
        self.rate_control.bufsize = Some(value);
        self
    }

    // ---- Geometry and filters ----

    pub fn crop(mut self, crop: CropMode) -> Self {
        self.crop = crop;
        self
    }

    pub fn bounds(mut self, width: u32, height: u32) -> Self {
        self.bounds = ScaleBounds { width, height };
        self
    }

    pub fn deinterlace(mut self, deinterlace: bool) -> Self {
        self.filters.deinterlace = deinterlace;
        self
    }

    /// Frame rate as `N/D`, see `parse::parse_rate`.
    pub fn rate(mut self, rate: impl Into<String>) -> Self {
        self.filters.rate = Some(rate.into());
        self
    }

    pub fn detelecine(mut self, detelecine: bool) -> Self {
        self.filters.detelecine = detelecine;
        self
    }

    /// Disables automatic deinterlacing of interlaced sources.
    pub fn no_auto_filters(mut self) -> Self {
        self.disable_filters = true;
        self
    }

    pub fn overlay_params(mut self, params: impl Into<String>) -> Self {
        self.filters.overlay_params = Some(params.into());
        self
    }

    pub fn yadif_params(mut self, params: impl Into<String>) -> Self {
        self.filters.yadif_params = Some(params.into());
        self
    }

    // ---- Family tuning ----

    pub fn vt_allow_sw(mut self) -> Self {
        self.tuning.videotoolbox.allow_sw = true;
        self
    }

    /// Spatial AQ, 32 frame lookahead and middle B-frame references.
    pub fn nvenc_recommended(mut self) -> Self {
        self.tuning.nvenc.spatial_aq = true;
        self.tuning.nvenc.lookahead = Some(MAX_NVENC_LOOKAHEAD);
        self.tuning.nvenc.bframe_refs = Some(BframeRefMode::Middle);
        self
    }

    pub fn nvenc_spatial_aq(mut self) -> Self {
        self.tuning.nvenc.spatial_aq = true;
        self
    }

    pub fn nvenc_temporal_aq(mut self) -> Self {
        self.tuning.nvenc.temporal_aq = true;
        self
    }

    /// Zero clears the lookahead; larger values are capped at 32.
    pub fn nvenc_lookahead(mut self, frames: u32) -> Self {
        self.tuning.nvenc.lookahead = (frames > 0).then(|| frames.min(MAX_NVENC_LOOKAHEAD));
        self
    }

    pub fn nvenc_multipass(mut self, multipass: NvencMultipass) -> Self {
        self.tuning.nvenc.multipass = Some(multipass);
        self
    }

    pub fn nvenc_refs(mut self, refs: u32) -> Self {
        self.tuning.nvenc.refs = Some(refs);
        self
    }

    /// Capped at 4.
    pub fn nvenc_bframes(mut self, bframes: u32) -> Self {
        self.tuning.nvenc.bframes = Some(bframes.min(4));
        self
    }

    pub fn nvenc_bframe_refs(mut self, mode: BframeRefMode) -> Self {
        self.tuning.nvenc.bframe_refs = Some(mode);
        self
    }

    /// Constant quality, clamped to 1..=51.
    pub fn nvenc_cq(mut self, quality: f64) -> Self {
        self.tuning.nvenc.cq = Some(quality.clamp(1.0, 51.0));
        self
    }

    /// Also implies decoding everything with CUDA.
    pub fn nvenc_gpu_only(mut self) -> Self {
        self.tuning.nvenc.gpu_only = true;
        self
    }

    pub fn qsv_refs(mut self, refs: u32) -> Self {
        self.tuning.qsv.refs = Some(refs);
        self
    }

    /// Values below -1 are raised to -1.
    pub fn qsv_bframes(mut self, bframes: i32) -> Self {
        self.tuning.qsv.bframes = Some(bframes.max(-1));
        self
    }

    pub fn amf_quality(mut self, quality: AmfQuality) -> Self {
        self.tuning.amf.quality = Some(quality);
        self
    }

    pub fn amf_vbaq(mut self) -> Self {
        self.tuning.amf.vbaq = true;
        self
    }

    pub fn amf_pre_analysis(mut self) -> Self {
        self.tuning.amf.pre_analysis = true;
        self
    }

    pub fn amf_refs(mut self, refs: u32) -> Self {
        self.tuning.amf.refs = Some(refs);
        self
    }

    /// Values below 1 are raised to 1.
    pub fn amf_bframes(mut self, bframes: u32) -> Self {
        self.tuning.amf.bframes = Some(bframes.max(1));
        self
    }

    pub fn vaapi_compression(mut self, level: u32) -> Self {
        self.tuning.vaapi.compression = Some(level);
        self
    }

    pub fn x264_mode(mut self, mode: X264RateMode) -> Self {
        self.tuning.x264.mode = mode;
        self
    }

    /// Faster x264 settings, applied when no preset is given.
    pub fn x264_quick(mut self) -> Self {
        self.tuning.x264.quick = true;
        self
    }

    pub fn x264_params(mut self, params: impl Into<String>) -> Self {
        self.tuning.x264.params = Some(params.into());
        self
    }

    pub fn x265_params(mut self, params: impl Into<String>) -> Self {
        self.tuning.x265.params = Some(params.into());
        self
    }

    // ---- Audio ----

    /// Main audio track ordinal and, optionally, its width.
    pub fn main_audio(mut self, ordinal: u32, width: Option<AudioWidth>) -> Self {
        let width = width.unwrap_or(AudioWidth::Surround);
        let main = AudioSelection::new(TrackMatch::Track(ordinal), width);
        match self.audio.selections.first_mut() {
            Some(first) => *first = main,
            None => self.audio.selections.push(main),
        }
        self
    }

    pub fn add_audio(mut self, selection: AudioSelection) -> Self {
        self.audio.selections.push(selection);
        self
    }

    pub fn audio_policy(mut self, policy: AudioCodecPolicy) -> Self {
        self.audio.policy = policy;
        self
    }

    pub fn surround_bitrate(mut self, kbps: u32) -> Self {
        self.audio.surround_bitrate = Some(kbps);
        self
    }

    pub fn stereo_bitrate(mut self, kbps: u32) -> Self {
        self.audio.stereo_bitrate = Some(kbps);
        self
    }

    pub fn mono_bitrate(mut self, kbps: u32) -> Self {
        self.audio.mono_bitrate = Some(kbps);
        self
    }

    /// Apply the bitrate threshold to AC-3 surround passthrough.
    pub fn limit_ac3_surround(mut self) -> Self {
        self.audio.keep_ac3_surround = false;
        self
    }

    pub fn keep_ac3_stereo(mut self) -> Self {
        self.audio.keep_ac3_stereo = true;
        self
    }

    pub fn pass_dts(mut self) -> Self {
        self.audio.pass_dts = true;
        self
    }

    /// libfdk_aac VBR mode, clamped to 1..=5.
    pub fn fdk_vbr_mode(mut self, mode: u8) -> Self {
        self.audio.fdk_vbr_mode = Some(mode.clamp(1, 5));
        self
    }

    // ---- Subtitles ----

    pub fn add_subtitle(mut self, selection: SubtitleSelection) -> Self {
        self.subtitles.selections.push(selection);
        self
    }

    pub fn burn_subtitle(mut self, burn: BurnSelection) -> Self {
        self.subtitles.burn = burn;
        self
    }

    // ========================================================================
    // BUILD
    // ========================================================================

    /// Validates the collected options and resolves them into a
    /// `TranscodeConfig`.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidArgument` when a structured parameter list is
    /// malformed or two options contradict each other.
    pub fn build(mut self) -> CoreResult<TranscodeConfig> {
        for params in [
            &self.filters.overlay_params,
            &self.filters.yadif_params,
            &self.tuning.x264.params,
            &self.tuning.x265.params,
        ]
        .into_iter()
        .flatten()
        {
            validate_filter_params(params)?;
        }

        if self.encoder == EncoderChoice::Copy {
            self.check_copy_video()?;
        }

        let standard = self.resolve_family_tuning()?;
        self.check_rate_control()?;
        self.check_filters()?;
        self.check_audio()?;
        let (decode_scope, decode_method) = self.resolve_decode()?;

        if self.tuning.x264.mode == X264RateMode::Cbr {
            self.rate_control.maxrate = Some(1.0);
        }

        self.filters.auto_filters = !(self.disable_filters
            || self.filters.deinterlace
            || self.filters.rate.is_some()
            || self.filters.detelecine
            || self.encoder == EncoderChoice::Copy);

        dedup_in_order(&mut self.audio.selections);
        dedup_in_order(&mut self.subtitles.selections);

        log::debug!(
            "Resolved configuration: encoder {:?}, standard {:?}, crop {:?}",
            self.encoder,
            standard,
            self.crop
        );

        Ok(TranscodeConfig {
            mode: self.mode,
            output_format: self.output_format,
            output_dir: self.output_dir,
            dry_run: self.dry_run,
            debug: self.debug,
            copy_track_names: self.copy_track_names,
            max_muxing_queue_size: self.max_muxing_queue_size,
            position: self.position,
            duration: self.duration,
            encoder: self.encoder,
            standard,
            ten_bit: self.ten_bit,
            eight_bit_vc1: self.eight_bit_vc1,
            preset: self.preset,
            decode_scope,
            decode_method,
            qsv_device: self.qsv_device,
            crop: self.crop,
            bounds: self.bounds,
            filters: self.filters,
            targets: self.targets,
            rate_control: self.rate_control,
            tuning: self.tuning,
            audio: self.audio,
            subtitles: self.subtitles,
        })
    }

    fn check_copy_video(&self) -> CoreResult<()> {
        let conflicts = [
            (self.crop != CropMode::None, "cropping"),
            (self.bounds != ScaleBounds::default(), "scaling bounds"),
            (self.filters.deinterlace, "deinterlacing"),
            (self.filters.rate.is_some(), "a frame rate"),
            (self.filters.detelecine, "detelecining"),
            (self.preset.is_some(), "a preset"),
            (!self.targets.is_empty(), "a bitrate target"),
            (
                self.rate_control != RateControlFactors::default(),
                "rate control values",
            ),
            (self.ten_bit.is_some() || self.eight_bit_vc1, "a bit depth"),
            (self.standard == Some(Standard::Hevc), "HEVC"),
            (self.subtitles.burn != BurnSelection::None, "subtitle burn-in"),
            (self.tuning != EncoderTuning::default(), "encoder tuning"),
        ];

        match conflicts.iter().find(|(set, _)| *set) {
            Some((_, what)) => Err(CoreError::InvalidArgument(format!(
                "video copy cannot be combined with {what}"
            ))),
            None => Ok(()),
        }
    }

    /// Family tuning implies its family (and for x264/x265 its standard).
    /// Returns the resolved standard.
    fn resolve_family_tuning(&mut self) -> CoreResult<Standard> {
        let tuned = self.tuning.tuned_families();
        let mut standard = self.standard;

        for (family, implied) in &tuned {
            match self.encoder {
                EncoderChoice::Auto => self.encoder = EncoderChoice::Family(*family),
                EncoderChoice::Family(chosen) if chosen == *family => {}
                EncoderChoice::Family(chosen) => {
                    return Err(CoreError::InvalidArgument(format!(
                        "{family} options cannot be used with the {chosen} encoder"
                    )));
                }
                // Rejected by the copy check.
                EncoderChoice::Copy => {}
            }

            if let Some(implied) = implied {
                match standard {
                    Some(current) if current != *implied => {
                        return Err(CoreError::InvalidArgument(
                            "x264 options require H.264 and x265 options require HEVC".to_string(),
                        ));
                    }
                    _ => standard = Some(*implied),
                }
            }
        }

        Ok(standard.unwrap_or_default())
    }

    fn check_rate_control(&self) -> CoreResult<()> {
        if self.tuning.nvenc.cq.is_some() && !self.targets.is_empty() {
            return Err(CoreError::InvalidArgument(
                "constant quality cannot be combined with a bitrate target".to_string(),
            ));
        }
        if self.targets.global.is_some() && self.targets.has_tier_targets() {
            return Err(CoreError::InvalidArgument(
                "a global bitrate target cannot be combined with per-resolution targets"
                    .to_string(),
            ));
        }

        let x264 = &self.tuning.x264;
        if x264.params.is_some() && (x264.mode != X264RateMode::Default || x264.quick) {
            return Err(CoreError::InvalidArgument(
                "x264 parameters cannot be combined with other x264 modes".to_string(),
            ));
        }
        if x264.mode == X264RateMode::Cbr && self.rate_control != RateControlFactors::default() {
            return Err(CoreError::InvalidArgument(
                "x264 CBR mode sets its own maxrate and bufsize".to_string(),
            ));
        }
        Ok(())
    }

    fn check_filters(&self) -> CoreResult<()> {
        if self.filters.detelecine && (self.filters.deinterlace || self.filters.rate.is_some()) {
            return Err(CoreError::InvalidArgument(
                "detelecine cannot be combined with deinterlace or a frame rate".to_string(),
            ));
        }
        Ok(())
    }

    fn check_audio(&self) -> CoreResult<()> {
        if self.audio.policy == AudioCodecPolicy::AacOnly
            && (self.audio.keep_ac3_stereo || self.audio.pass_dts)
        {
            return Err(CoreError::InvalidArgument(
                "AAC-only audio cannot be combined with AC-3 or DTS passthrough".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_decode(&self) -> CoreResult<(DecodeScope, Option<DecodeMethod>)> {
        let mut scope = self.decode_scope;
        let mut method = self.decode_method;

        if self.tuning.nvenc.gpu_only {
            if scope.is_some_and(|s| s != DecodeScope::All)
                || method.is_some_and(|m| m != DecodeMethod::Cuda)
            {
                return Err(CoreError::InvalidArgument(
                    "GPU-only encoding requires CUDA decoding of all sources".to_string(),
                ));
            }
            scope = Some(DecodeScope::All);
            method = Some(DecodeMethod::Cuda);
        }

        if self.qsv_device.is_some() && method.is_none() {
            method = Some(DecodeMethod::Qsv);
        }

        Ok((scope.unwrap_or_default(), method))
    }
}

fn dedup_in_order<T: Eq + Hash + Clone>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubtitleMatch;

    #[test]
    fn defaults() {
        let config = TranscodeConfigBuilder::new().build().unwrap();
        assert_eq!(config.mode, RunMode::Transcode);
        assert_eq!(config.output_format, OutputFormat::Mkv);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.encoder, EncoderChoice::Auto);
        assert_eq!(config.standard, Standard::H264);
        assert_eq!(config.decode_scope, DecodeScope::Vc1);
        assert_eq!(config.decode_method, None);
        assert_eq!(config.bounds, ScaleBounds::default());
        assert!(config.filters.auto_filters);
        assert!(config.audio.keep_ac3_surround);
        assert_eq!(config.audio.main(), (1, AudioWidth::Surround));
        assert!(config.subtitles.selections.is_empty());
    }

    #[test]
    fn copy_video_rejects_transforms() {
        let err = TranscodeConfigBuilder::new()
            .copy_video()
            .crop(CropMode::Auto)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cropping"));

        assert!(TranscodeConfigBuilder::new().copy_video().preset("slow").build().is_err());
        assert!(TranscodeConfigBuilder::new()
            .copy_video()
            .burn_subtitle(BurnSelection::Auto)
            .build()
            .is_err());

        let config = TranscodeConfigBuilder::new().copy_video().build().unwrap();
        assert_eq!(config.encoder, EncoderChoice::Copy);
        assert!(!config.filters.auto_filters);
    }

    #[test]
    fn tuning_implies_family() {
        let config = TranscodeConfigBuilder::new().nvenc_spatial_aq().build().unwrap();
        assert_eq!(config.encoder, EncoderChoice::Family(EncoderFamily::Nvenc));

        let config = TranscodeConfigBuilder::new().x265_params("aq-mode=3").build().unwrap();
        assert_eq!(config.encoder, EncoderChoice::Family(EncoderFamily::Software));
        assert_eq!(config.standard, Standard::Hevc);
    }

    #[test]
    fn tuning_for_other_family_is_rejected() {
        assert!(TranscodeConfigBuilder::new()
            .encoder_family(EncoderFamily::Qsv)
            .nvenc_refs(3)
            .build()
            .is_err());
        assert!(TranscodeConfigBuilder::new().amf_vbaq().qsv_refs(2).build().is_err());
        assert!(TranscodeConfigBuilder::new()
            .hevc(true)
            .x264_mode(X264RateMode::Avbr)
            .build()
            .is_err());
    }

    #[test]
    fn target_conflicts() {
        assert!(TranscodeConfigBuilder::new().nvenc_cq(20.0).target(4000).build().is_err());
        assert!(TranscodeConfigBuilder::new()
            .target(4000)
            .tier_target(Tier::P1080, 5000)
            .build()
            .is_err());

        let config = TranscodeConfigBuilder::new().target(0).build().unwrap();
        assert_eq!(config.targets.global, Some(1));
    }

    #[test]
    fn x264_cbr_sets_unit_maxrate() {
        let config = TranscodeConfigBuilder::new()
            .x264_mode(X264RateMode::Cbr)
            .build()
            .unwrap();
        assert_eq!(config.rate_control.maxrate, Some(1.0));
        assert!(config.tuning.x264.mbtree());

        assert!(TranscodeConfigBuilder::new()
            .x264_mode(X264RateMode::Cbr)
            .maxrate(2.0)
            .build()
            .is_err());
        assert!(TranscodeConfigBuilder::new()
            .x264_mode(X264RateMode::Avbr)
            .x264_params("ref=4")
            .build()
            .is_err());
    }

    #[test]
    fn explicit_filters_disable_automatic_ones() {
        let config = TranscodeConfigBuilder::new().rate("24/1").build().unwrap();
        assert!(!config.filters.auto_filters);
        let config = TranscodeConfigBuilder::new().no_auto_filters().build().unwrap();
        assert!(!config.filters.auto_filters);
        assert!(TranscodeConfigBuilder::new()
            .detelecine(true)
            .deinterlace(true)
            .build()
            .is_err());
    }

    #[test]
    fn malformed_params_are_rejected() {
        let err = TranscodeConfigBuilder::new()
            .yadif_params("mode=1:bogus")
            .build()
            .unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn margin_crops_with_zero_top_and_bottom_are_accepted() {
        for values in [[0, 0, 240, 240], [0, 0, 0, 0]] {
            let config = TranscodeConfigBuilder::new()
                .crop(CropMode::Manual(values))
                .build()
                .unwrap();
            assert_eq!(config.crop, CropMode::Manual(values));
        }
    }

    #[test]
    fn aac_only_rejects_passthrough_options() {
        assert!(TranscodeConfigBuilder::new()
            .audio_policy(AudioCodecPolicy::AacOnly)
            .pass_dts()
            .build()
            .is_err());
    }

    #[test]
    fn gpu_only_implies_cuda_everywhere() {
        let config = TranscodeConfigBuilder::new().nvenc_gpu_only().build().unwrap();
        assert_eq!(config.decode_scope, DecodeScope::All);
        assert_eq!(config.decode_method, Some(DecodeMethod::Cuda));

        assert!(TranscodeConfigBuilder::new()
            .nvenc_gpu_only()
            .decode_scope(DecodeScope::None)
            .build()
            .is_err());
    }

    #[test]
    fn qsv_device_selects_qsv_decoding() {
        let config = TranscodeConfigBuilder::new().qsv_device("/dev/dri/renderD129").build().unwrap();
        assert_eq!(config.decode_method, Some(DecodeMethod::Qsv));
    }

    #[test]
    fn selections_are_deduplicated() {
        let config = TranscodeConfigBuilder::new()
            .main_audio(2, Some(AudioWidth::Stereo))
            .add_audio(AudioSelection::new(TrackMatch::Language("eng".into()), AudioWidth::Stereo))
            .add_audio(AudioSelection::new(TrackMatch::Language("eng".into()), AudioWidth::Stereo))
            .add_subtitle(SubtitleSelection::new(SubtitleMatch::Auto))
            .add_subtitle(SubtitleSelection::new(SubtitleMatch::Auto))
            .build()
            .unwrap();
        assert_eq!(config.audio.selections.len(), 2);
        assert_eq!(config.audio.main(), (2, AudioWidth::Stereo));
        assert_eq!(config.subtitles.selections.len(), 1);
        assert!(config.subtitles.auto_forced());
    }

    #[test]
    fn clamps_numeric_tuning() {
        let config = TranscodeConfigBuilder::new()
            .nvenc_lookahead(64)
            .nvenc_bframes(9)
            .nvenc_cq(80.0)
            .build()
            .unwrap();
        assert_eq!(config.tuning.nvenc.lookahead, Some(32));
        assert_eq!(config.tuning.nvenc.bframes, Some(4));
        assert_eq!(config.tuning.nvenc.cq, Some(51.0));

        let config = TranscodeConfigBuilder::new().nvenc_lookahead(0).build().unwrap();
        assert_eq!(config.tuning.nvenc.lookahead, None);
    }
}
