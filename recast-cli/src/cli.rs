// recast-cli/src/cli.rs
//
// Defines the command-line argument structures using clap and maps them onto
// the recast-core configuration builder.

use clap::{ArgAction, Args, Parser};
use recast_core::config::parse::{
    TargetSpec, parse_add_audio, parse_add_subtitle, parse_burn, parse_crop, parse_main_audio,
    parse_rate, parse_target, parse_time,
};
use recast_core::config::{
    AmfQuality, AudioCodecPolicy, AudioSelection, AudioWidth, BframeRefMode, BurnSelection,
    CropMode, DecodeMethod, DecodeScope, EncoderFamily, FHD_MAX_HEIGHT, FHD_MAX_WIDTH,
    HD_MAX_HEIGHT, HD_MAX_WIDTH, NvencMultipass, OutputFormat, RunMode, SubtitleSelection,
    X264RateMode,
};
use recast_core::{CoreResult, TranscodeConfig, TranscodeConfigBuilder};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Recast: transcode Blu-ray and DVD rips with ffmpeg",
    long_about = "Plans and runs a single-pass ffmpeg transcode for each input, \
                  choosing a hardware or software video encoder, cropping and \
                  scaling the picture, and selecting audio and subtitle tracks."
)]
pub struct Cli {
    /// Input media files
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub general: GeneralArgs,

    #[command(flatten)]
    pub video: VideoArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    #[command(flatten)]
    pub audio: AudioArgs,

    #[command(flatten)]
    pub subtitles: SubtitleArgs,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Input/output options")]
pub struct GeneralArgs {
    /// Directory where outputs are written
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Start transcoding at a time ([[HH:]MM:]SS or seconds)
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub position: Option<f64>,

    /// Transcode only this much of the input ([[HH:]MM:]SS or seconds)
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub duration: Option<f64>,

    /// Log ffmpeg output and debug messages
    #[arg(long)]
    pub debug: bool,

    /// Print media information and exit
    #[arg(long, group = "run_mode")]
    pub scan: bool,

    /// Print commands previewing the detected crop and exit
    #[arg(long, group = "run_mode")]
    pub preview_crop: bool,

    /// Print only the detected crop geometry and exit
    #[arg(long, group = "run_mode")]
    pub print_crop: bool,

    /// Write MP4 instead of Matroska
    #[arg(long)]
    pub mp4: bool,

    /// Keep the titles of copied and transcoded tracks
    #[arg(long)]
    pub copy_track_names: bool,

    /// Maximum number of packets buffered while muxing
    #[arg(long, value_name = "SIZE")]
    pub max_muxing_queue_size: Option<u32>,

    /// Show the ffmpeg command without running it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Video options")]
pub struct VideoArgs {
    /// Encode HEVC instead of H.264
    #[arg(long)]
    pub hevc: bool,

    /// Use the VideoToolbox encoder
    #[arg(long, group = "video_encoder")]
    pub vt: bool,

    /// Use the Nvidia NVENC encoder
    #[arg(long, group = "video_encoder")]
    pub nvenc: bool,

    /// Use the Intel Quick Sync encoder
    #[arg(long, group = "video_encoder")]
    pub qsv: bool,

    /// Use the AMD AMF encoder
    #[arg(long, group = "video_encoder")]
    pub amf: bool,

    /// Use the VA-API encoder
    #[arg(long, group = "video_encoder")]
    pub vaapi: bool,

    /// Use the x264 software encoder
    #[arg(long, group = "video_encoder")]
    pub x264: bool,

    /// Use the x265 software encoder
    #[arg(long, group = "video_encoder")]
    pub x265: bool,

    /// Copy the video stream without transcoding
    #[arg(long, group = "video_encoder")]
    pub copy_video: bool,

    /// Encode 10-bit video
    #[arg(long = "10-bit", overrides_with = "no_ten_bit")]
    pub ten_bit: bool,

    /// Encode 8-bit video
    #[arg(long = "no-10-bit", overrides_with = "ten_bit")]
    pub no_ten_bit: bool,

    /// Encode 8-bit video from VC-1 sources
    #[arg(long = "8-bit-vc1")]
    pub eight_bit_vc1: bool,

    /// Encoder preset
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Hardware decode scope (vc1, all, none)
    #[arg(long = "decode", value_name = "SCOPE")]
    pub decode_scope: Option<DecodeScope>,

    /// Decode with CUDA
    #[arg(long, overrides_with = "no_cuda", group = "decode_method")]
    pub cuda: bool,

    /// Let ffmpeg pick the hardware decoder
    #[arg(long, overrides_with = "cuda")]
    pub no_cuda: bool,

    /// Decode with Quick Sync
    #[arg(long, group = "decode_method")]
    pub qsv_decoder: bool,

    /// Quick Sync device to decode on
    #[arg(long, value_name = "DEVICE")]
    pub qsv_device: Option<String>,

    /// Video bitrate in Kbps, optionally for one resolution (e.g. 1080p=5000)
    #[arg(long, value_name = "[RES=]KBPS", value_parser = parse_target, action = ArgAction::Append)]
    pub target: Vec<TargetSpec>,

    /// Crop geometry (W:H:X:Y or TOP:BOTTOM:LEFT:RIGHT) or `auto`
    #[arg(long, value_name = "GEOMETRY", value_parser = parse_crop)]
    pub crop: Option<CropMode>,

    /// Fit the output within 1280x720
    #[arg(long = "720p", group = "bounds")]
    pub hd: bool,

    /// Fit the output within 1920x1080
    #[arg(long = "1080p", group = "bounds")]
    pub fhd: bool,

    /// Deinterlace the video
    #[arg(long)]
    pub deinterlace: bool,

    /// Force a frame rate (e.g. 23.976, film, pal, ntsc, 30)
    #[arg(long, value_name = "RATE", value_parser = parse_rate)]
    pub rate: Option<String>,

    /// Remove telecine pulldown
    #[arg(long)]
    pub detelecine: bool,

    /// Never deinterlace interlaced sources automatically
    #[arg(long = "no-filters")]
    pub no_filters: bool,

    /// Overlay filter parameters for burned subtitles
    #[arg(long, value_name = "PARAMS")]
    pub overlay_params: Option<String>,

    /// Yadif filter parameters
    #[arg(long, value_name = "PARAMS")]
    pub yadif_params: Option<String>,

    /// Maximum bitrate as a multiple of the target or in Kbps
    #[arg(long = "rc-maxrate", value_name = "FACTOR|KBPS")]
    pub maxrate: Option<f64>,

    /// Rate-control buffer as a multiple of the target or in Kbps
    #[arg(long = "rc-bufsize", value_name = "FACTOR|KBPS")]
    pub bufsize: Option<f64>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Encoder tuning options")]
pub struct TuningArgs {
    /// Allow VideoToolbox to fall back to software encoding
    #[arg(long)]
    pub vt_allow_sw: bool,

    /// Use the recommended NVENC settings
    #[arg(long)]
    pub nvenc_recommended: bool,

    #[arg(long)]
    pub nvenc_spatial_aq: bool,

    #[arg(long)]
    pub nvenc_temporal_aq: bool,

    #[arg(long, value_name = "FRAMES")]
    pub nvenc_lookahead: Option<u32>,

    /// Multipass resolution (qres, fullres)
    #[arg(long, value_name = "RES")]
    pub nvenc_multipass: Option<NvencMultipass>,

    #[arg(long, value_name = "NUMBER")]
    pub nvenc_refs: Option<u32>,

    #[arg(long, value_name = "NUMBER")]
    pub nvenc_bframes: Option<u32>,

    /// Use B-frames as references (each, middle)
    #[arg(long, value_name = "MODE")]
    pub nvenc_bframe_refs: Option<BframeRefMode>,

    /// Constant quality instead of a bitrate target
    #[arg(long, value_name = "VALUE")]
    pub nvenc_cq: Option<f64>,

    /// Keep decoding and filtering on the GPU
    #[arg(long)]
    pub nvenc_gpu_only: bool,

    #[arg(long, value_name = "NUMBER")]
    pub qsv_refs: Option<u32>,

    #[arg(long, value_name = "NUMBER", allow_negative_numbers = true)]
    pub qsv_bframes: Option<i32>,

    /// AMF quality (balanced, speed, quality)
    #[arg(long, value_name = "NAME")]
    pub amf_quality: Option<AmfQuality>,

    #[arg(long)]
    pub amf_vbaq: bool,

    #[arg(long = "amf-pre-analysis")]
    pub amf_pre_analysis: bool,

    #[arg(long, value_name = "NUMBER")]
    pub amf_refs: Option<u32>,

    #[arg(long, value_name = "NUMBER")]
    pub amf_bframes: Option<u32>,

    #[arg(long, value_name = "LEVEL")]
    pub vaapi_compression: Option<u32>,

    /// Constant bitrate x264 encoding
    #[arg(long, group = "x264_mode")]
    pub x264_cbr: bool,

    /// Average variable bitrate x264 encoding
    #[arg(long, group = "x264_mode")]
    pub x264_avbr: bool,

    /// x264 macroblock-tree rate control
    #[arg(long, group = "x264_mode")]
    pub x264_mbtree: bool,

    /// Faster x264 settings
    #[arg(long)]
    pub x264_quick: bool,

    #[arg(long, value_name = "PARAMS")]
    pub x264_params: Option<String>,

    #[arg(long, value_name = "PARAMS")]
    pub x265_params: Option<String>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Audio options")]
pub struct AudioArgs {
    /// Main audio track and width (e.g. 2 or 2=stereo)
    #[arg(long, value_name = "TRACK[=WIDTH]", value_parser = parse_main_audio)]
    pub main_audio: Option<(u32, Option<AudioWidth>)>,

    /// Add audio tracks by number, language, title or `all`
    #[arg(long, value_name = "SCOPE[=WIDTH]", value_parser = parse_add_audio, action = ArgAction::Append)]
    pub add_audio: Vec<AudioSelection>,

    #[arg(long, value_name = "KBPS")]
    pub surround_bitrate: Option<u32>,

    #[arg(long, value_name = "KBPS")]
    pub stereo_bitrate: Option<u32>,

    #[arg(long, value_name = "KBPS")]
    pub mono_bitrate: Option<u32>,

    /// E-AC-3 for all transcoded audio
    #[arg(long, group = "audio_policy")]
    pub eac3: bool,

    /// E-AC-3 surround and AAC stereo
    #[arg(long = "eac3-aac", group = "audio_policy")]
    pub eac3_aac: bool,

    /// AAC for all transcoded audio
    #[arg(long, group = "audio_policy")]
    pub aac_only: bool,

    /// Pass through AC-3 surround only up to the bitrate threshold
    #[arg(long = "limit-ac3-surround")]
    pub limit_ac3_surround: bool,

    /// Pass through AC-3 stereo up to the bitrate threshold
    #[arg(long)]
    pub keep_ac3_stereo: bool,

    /// Pass through DTS and DTS-ES
    #[arg(long)]
    pub pass_dts: bool,

    /// libfdk_aac VBR mode (1-5)
    #[arg(long = "fdk-vbr", value_name = "MODE")]
    pub fdk_vbr: Option<u8>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Subtitle options")]
pub struct SubtitleArgs {
    /// Add subtitle tracks by number, `auto`, language, title or `all`
    #[arg(long, value_name = "SCOPE", value_parser = parse_add_subtitle, action = ArgAction::Append)]
    pub add_subtitle: Vec<SubtitleSelection>,

    /// Burn an image subtitle into the video by number or `auto`
    #[arg(long, value_name = "TRACK|auto", value_parser = parse_burn)]
    pub burn_subtitle: Option<BurnSelection>,
}

// --- Mapping onto the core builder ---

impl Cli {
    /// Resolves the parsed arguments into a validated configuration.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidArgument` when options contradict each other.
    pub fn to_config(&self) -> CoreResult<TranscodeConfig> {
        let mut builder = TranscodeConfigBuilder::new();
        builder = self.general.apply(builder);
        builder = self.video.apply(builder);
        builder = self.tuning.apply(builder);
        builder = self.audio.apply(builder);
        builder = self.subtitles.apply(builder);
        builder.build()
    }
}

impl GeneralArgs {
    fn run_mode(&self) -> RunMode {
        if self.scan {
            RunMode::Scan
        } else if self.preview_crop {
            RunMode::PreviewCrop
        } else if self.print_crop {
            RunMode::PrintCrop
        } else {
            RunMode::Transcode
        }
    }

    fn apply(&self, mut builder: TranscodeConfigBuilder) -> TranscodeConfigBuilder {
        builder = builder
            .mode(self.run_mode())
            .output_dir(self.output_dir.clone())
            .dry_run(self.dry_run)
            .debug(self.debug)
            .copy_track_names(self.copy_track_names);

        if self.mp4 {
            builder = builder.output_format(OutputFormat::Mp4);
        }
        if let Some(size) = self.max_muxing_queue_size {
            builder = builder.max_muxing_queue_size(size);
        }
        if let Some(position) = self.position {
            builder = builder.position(position);
        }
        if let Some(duration) = self.duration {
            builder = builder.duration(duration);
        }
        builder
    }
}

impl VideoArgs {
    fn family(&self) -> Option<EncoderFamily> {
        [
            (self.vt, EncoderFamily::VideoToolbox),
            (self.nvenc, EncoderFamily::Nvenc),
            (self.qsv, EncoderFamily::Qsv),
            (self.amf, EncoderFamily::Amf),
            (self.vaapi, EncoderFamily::Vaapi),
            (self.x264 || self.x265, EncoderFamily::Software),
        ]
        .into_iter()
        .find_map(|(set, family)| set.then_some(family))
    }

    fn apply(&self, mut builder: TranscodeConfigBuilder) -> TranscodeConfigBuilder {
        if self.copy_video {
            builder = builder.copy_video();
        } else if let Some(family) = self.family() {
            builder = builder.encoder_family(family);
        }

        if self.hevc || self.x265 {
            builder = builder.hevc(true);
        } else if self.x264 {
            builder = builder.hevc(false);
        }

        if self.ten_bit {
            builder = builder.ten_bit(Some(true));
        } else if self.no_ten_bit {
            builder = builder.ten_bit(Some(false));
        }
        if self.eight_bit_vc1 {
            builder = builder.eight_bit_vc1(true);
        }
        if let Some(preset) = &self.preset {
            builder = builder.preset(preset.clone());
        }

        if let Some(scope) = self.decode_scope {
            builder = builder.decode_scope(scope);
        }
        if self.cuda {
            builder = builder.decode_method(DecodeMethod::Cuda);
        } else if self.no_cuda {
            builder = builder.decode_method(DecodeMethod::Auto);
        } else if self.qsv_decoder {
            builder = builder.decode_method(DecodeMethod::Qsv);
        }
        if let Some(device) = &self.qsv_device {
            builder = builder.qsv_device(device.clone());
        }

        for target in &self.target {
            builder = match *target {
                TargetSpec::Global(kbps) => builder.target(kbps),
                TargetSpec::Tier(tier, kbps) => builder.tier_target(tier, kbps),
            };
        }
        if let Some(maxrate) = self.maxrate {
            builder = builder.maxrate(maxrate);
        }
        if let Some(bufsize) = self.bufsize {
            builder = builder.bufsize(bufsize);
        }

        if let Some(crop) = self.crop {
            builder = builder.crop(crop);
        }
        if self.hd {
            builder = builder.bounds(HD_MAX_WIDTH, HD_MAX_HEIGHT);
        } else if self.fhd {
            builder = builder.bounds(FHD_MAX_WIDTH, FHD_MAX_HEIGHT);
        }

        builder = builder
            .deinterlace(self.deinterlace)
            .detelecine(self.detelecine);
        if let Some(rate) = &self.rate {
            builder = builder.rate(rate.clone());
        }
        if self.no_filters {
            builder = builder.no_auto_filters();
        }
        if let Some(params) = &self.overlay_params {
            builder = builder.overlay_params(params.clone());
        }
        if let Some(params) = &self.yadif_params {
            builder = builder.yadif_params(params.clone());
        }
        builder
    }
}

impl TuningArgs {
    fn apply(&self, mut builder: TranscodeConfigBuilder) -> TranscodeConfigBuilder {
        if self.vt_allow_sw {
            builder = builder.vt_allow_sw();
        }

        if self.nvenc_recommended {
            builder = builder.nvenc_recommended();
        }
        if self.nvenc_spatial_aq {
            builder = builder.nvenc_spatial_aq();
        }
        if self.nvenc_temporal_aq {
            builder = builder.nvenc_temporal_aq();
        }
        if let Some(frames) = self.nvenc_lookahead {
            builder = builder.nvenc_lookahead(frames);
        }
        if let Some(multipass) = self.nvenc_multipass {
            builder = builder.nvenc_multipass(multipass);
        }
        if let Some(refs) = self.nvenc_refs {
            builder = builder.nvenc_refs(refs);
        }
        if let Some(bframes) = self.nvenc_bframes {
            builder = builder.nvenc_bframes(bframes);
        }
        if let Some(mode) = self.nvenc_bframe_refs {
            builder = builder.nvenc_bframe_refs(mode);
        }
        if let Some(quality) = self.nvenc_cq {
            builder = builder.nvenc_cq(quality);
        }
        if self.nvenc_gpu_only {
            builder = builder.nvenc_gpu_only();
        }

        if let Some(refs) = self.qsv_refs {
            builder = builder.qsv_refs(refs);
        }
        if let Some(bframes) = self.qsv_bframes {
            builder = builder.qsv_bframes(bframes);
        }

        if let Some(quality) = self.amf_quality {
            builder = builder.amf_quality(quality);
        }
        if self.amf_vbaq {
            builder = builder.amf_vbaq();
        }
        if self.amf_pre_analysis {
            builder = builder.amf_pre_analysis();
        }
        if let Some(refs) = self.amf_refs {
            builder = builder.amf_refs(refs);
        }
        if let Some(bframes) = self.amf_bframes {
            builder = builder.amf_bframes(bframes);
        }

        if let Some(level) = self.vaapi_compression {
            builder = builder.vaapi_compression(level);
        }

        if self.x264_cbr {
            builder = builder.x264_mode(X264RateMode::Cbr);
        } else if self.x264_avbr {
            builder = builder.x264_mode(X264RateMode::Avbr);
        } else if self.x264_mbtree {
            builder = builder.x264_mode(X264RateMode::Mbtree);
        }
        if self.x264_quick {
            builder = builder.x264_quick();
        }
        if let Some(params) = &self.x264_params {
            builder = builder.x264_params(params.clone());
        }
        if let Some(params) = &self.x265_params {
            builder = builder.x265_params(params.clone());
        }
        builder
    }
}

impl AudioArgs {
    fn policy(&self) -> AudioCodecPolicy {
        if self.eac3 {
            AudioCodecPolicy::Eac3
        } else if self.eac3_aac {
            AudioCodecPolicy::Eac3Aac
        } else if self.aac_only {
            AudioCodecPolicy::AacOnly
        } else {
            AudioCodecPolicy::Ac3
        }
    }

    fn apply(&self, mut builder: TranscodeConfigBuilder) -> TranscodeConfigBuilder {
        if let Some((ordinal, width)) = self.main_audio {
            builder = builder.main_audio(ordinal, width);
        }
        for selection in &self.add_audio {
            builder = builder.add_audio(selection.clone());
        }

        builder = builder.audio_policy(self.policy());
        if let Some(kbps) = self.surround_bitrate {
            builder = builder.surround_bitrate(kbps);
        }
        if let Some(kbps) = self.stereo_bitrate {
            builder = builder.stereo_bitrate(kbps);
        }
        if let Some(kbps) = self.mono_bitrate {
            builder = builder.mono_bitrate(kbps);
        }
        if self.limit_ac3_surround {
            builder = builder.limit_ac3_surround();
        }
        if self.keep_ac3_stereo {
            builder = builder.keep_ac3_stereo();
        }
        if self.pass_dts {
            builder = builder.pass_dts();
        }
        if let Some(mode) = self.fdk_vbr {
            builder = builder.fdk_vbr_mode(mode);
        }
        builder
    }
}

impl SubtitleArgs {
    fn apply(&self, mut builder: TranscodeConfigBuilder) -> TranscodeConfigBuilder {
        for selection in &self.add_subtitle {
            builder = builder.add_subtitle(selection.clone());
        }
        if let Some(burn) = self.burn_subtitle {
            builder = builder.burn_subtitle(burn);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_core::config::{EncoderChoice, ScaleBounds, Standard, Tier, TrackMatch};

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("recast").chain(args.iter().copied()))
    }

    #[test]
    fn parse_defaults() {
        let cli = parse(&["Movie.mkv"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("Movie.mkv")]);
        assert_eq!(cli.general.output_dir, PathBuf::from("."));

        let config = cli.to_config().unwrap();
        assert_eq!(config.mode, RunMode::Transcode);
        assert_eq!(config.encoder, EncoderChoice::Auto);
        assert_eq!(config.standard, Standard::H264);
        assert_eq!(config.output_format, OutputFormat::Mkv);
    }

    #[test]
    fn parse_encoder_and_geometry() {
        let cli = parse(&[
            "--x265", "--crop", "auto", "--1080p", "--target", "1080p=5000", "--preset", "slow",
            "a.mkv", "b.mkv",
        ]);
        assert_eq!(cli.inputs.len(), 2);

        let config = cli.to_config().unwrap();
        assert_eq!(config.encoder, EncoderChoice::Family(EncoderFamily::Software));
        assert_eq!(config.standard, Standard::Hevc);
        assert_eq!(config.crop, CropMode::Auto);
        assert_eq!(
            config.bounds,
            ScaleBounds {
                width: FHD_MAX_WIDTH,
                height: FHD_MAX_HEIGHT
            }
        );
        assert_eq!(config.targets.tier(Tier::P1080), Some(5000));
        assert_eq!(config.preset.as_deref(), Some("slow"));
    }

    #[test]
    fn parse_audio_and_subtitles() {
        let cli = parse(&[
            "--main-audio",
            "2=stereo",
            "--add-audio",
            "fre",
            "--add-audio",
            "Commentary",
            "--eac3",
            "--add-subtitle",
            "auto",
            "--burn-subtitle",
            "1",
            "Movie.mkv",
        ]);
        let config = cli.to_config().unwrap();

        assert_eq!(config.audio.main(), (2, AudioWidth::Stereo));
        let additional: Vec<&TrackMatch> =
            config.audio.additional().iter().map(|s| &s.matcher).collect();
        assert_eq!(
            additional,
            vec![
                &TrackMatch::Language("fre".into()),
                &TrackMatch::Title("Commentary".into())
            ]
        );
        assert_eq!(config.audio.policy, AudioCodecPolicy::Eac3);
        assert_eq!(config.subtitles.selections.len(), 1);
        assert_eq!(config.subtitles.burn, BurnSelection::Track(1));
    }

    #[test]
    fn later_bit_depth_flag_wins() {
        let config = parse(&["--10-bit", "--no-10-bit", "Movie.mkv"]).to_config().unwrap();
        assert_eq!(config.ten_bit, Some(false));
    }

    #[test]
    fn scan_selects_run_mode() {
        let config = parse(&["--scan", "Movie.mkv"]).to_config().unwrap();
        assert_eq!(config.mode, RunMode::Scan);
    }

    #[test]
    fn malformed_values_are_rejected_by_clap() {
        let args = ["recast", "--crop", "1:2:3", "Movie.mkv"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = ["recast", "--position", "1:2", "Movie.mkv"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = ["recast", "--nvenc", "--qsv", "Movie.mkv"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn contradictions_fail_in_the_builder() {
        let err = parse(&["--copy-video", "--crop", "auto", "Movie.mkv"])
            .to_config()
            .unwrap_err();
        assert!(err.is_usage_error());

        let err = parse(&["--nvenc", "--qsv-refs", "2", "Movie.mkv"])
            .to_config()
            .unwrap_err();
        assert!(err.is_usage_error());
    }
}
