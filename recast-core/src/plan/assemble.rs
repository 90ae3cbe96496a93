// ============================================================================
// recast-core/src/plan/assemble.rs
// ============================================================================
//
// INVOCATION ASSEMBLY: The complete ffmpeg argument vector for one input
//
// Argument order is fixed: global flags, timing, decode options, the input,
// muxing queue size, video, audio, subtitles, global metadata, container
// flags and finally the output path.

use super::audio::audio_args;
use super::subtitle::{subtitle_args, subtitle_summary};
use super::{
    TimingPlan, TrackPlan, VideoPlan, build_audio_plan, build_subtitle_plan, build_timing,
    build_video_plan, select_burn_subtitle,
};
use crate::config::{AudioEncoders, OutputFormat, TranscodeConfig, VideoEncoder};
use crate::crop::Rectangle;
use crate::error::{CoreError, CoreResult};
use crate::media::StreamCatalog;
use crate::utils::escape_command;

use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Program name used in the printable command line.
const FFMPEG: &str = "ffmpeg";

/// Everything a plan is derived from.
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs<'a> {
    pub input: &'a Path,
    pub catalog: &'a StreamCatalog,
    pub config: &'a TranscodeConfig,
    pub encoder: &'a VideoEncoder,
    pub audio_encoders: &'a AudioEncoders,
    /// Resolved crop rectangle, automatic or manual.
    pub crop: Option<&'a Rectangle>,
}

/// A fully resolved ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Arguments, program name excluded. Paths are kept as given.
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
    pub timing: TimingPlan,
    pub video: VideoPlan,
    pub audio: Vec<TrackPlan>,
    pub subtitles: Vec<TrackPlan>,
    /// Stream mapping report, one line per output stream.
    pub mapping: Vec<String>,
}

impl InvocationPlan {
    /// Shell-escaped command line, suitable for copy and paste.
    pub fn command_line(&self) -> String {
        let mut command: Vec<Cow<'_, str>> = Vec::with_capacity(self.args.len() + 1);
        command.push(FFMPEG.into());
        command.extend(self.args.iter().map(|arg| arg.to_string_lossy()));
        escape_command(&command)
    }
}

/// `<output_dir>/<input stem>.<extension>`.
pub fn output_path(input: &Path, output_dir: &Path, format: OutputFormat) -> CoreResult<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        CoreError::InvalidArgument(format!("input has no file name: {}", input.display()))
    })?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(format.extension());
    Ok(output_dir.join(name))
}

/// Derives the complete invocation for one input.
///
/// # Errors
///
/// `StreamNotFound` without a video stream, `MediaTooShort` for inputs
/// under two seconds and any error of the video plan.
pub fn assemble_plan(inputs: &PlanInputs<'_>) -> CoreResult<InvocationPlan> {
    let PlanInputs {
        input,
        catalog,
        config,
        encoder,
        audio_encoders,
        crop,
    } = *inputs;

    let video_stream = catalog.video().ok_or_else(|| {
        CoreError::StreamNotFound(format!("video track not found: {}", input.display()))
    })?;
    let burn = select_burn_subtitle(catalog, config.subtitles.burn);
    let output = output_path(input, &config.output_dir, config.output_format)?;

    let timing = build_timing(
        catalog.duration_secs(),
        config.position,
        config.duration,
        burn.is_some(),
    )?;
    let video = build_video_plan(video_stream, config, encoder, crop, burn)?;
    let audio = build_audio_plan(catalog, &config.audio, audio_encoders, config.copy_track_names);
    let subtitles = build_subtitle_plan(catalog, &config.subtitles, config.output_format, burn);

    let mut args: Vec<OsString> = vec![
        "-loglevel".into(),
        if config.debug { "verbose" } else { "error" }.into(),
        "-stats".into(),
    ];
    args.extend(timing.args.iter().map(OsString::from));
    args.extend(video.decode_args.iter().map(OsString::from));
    args.push("-i".into());
    args.push(input.into());
    if let Some(size) = config.max_muxing_queue_size {
        args.push("-max_muxing_queue_size".into());
        args.push(size.to_string().into());
    }
    args.extend(video.encode_args.iter().map(OsString::from));
    args.extend(audio_args(&audio).into_iter().map(OsString::from));
    args.extend(subtitle_args(&subtitles).into_iter().map(OsString::from));
    let container = match config.output_format {
        OutputFormat::Mkv => ["-default_mode", "passthrough"],
        OutputFormat::Mp4 => ["-movflags", "disable_chpl"],
    };
    args.extend(["-metadata:g", "title="].into_iter().map(OsString::from));
    args.extend(container.into_iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());

    let env = if config.debug {
        vec![("FFREPORT".to_string(), "level=40".to_string())]
    } else {
        Vec::new()
    };

    let mut mapping = vec![video.to_string()];
    mapping.extend(audio.iter().map(ToString::to_string));
    mapping.extend(subtitles.iter().filter_map(|plan| {
        catalog
            .streams
            .iter()
            .find(|s| s.index == plan.source_index)
            .map(|stream| subtitle_summary(plan, stream))
    }));

    Ok(InvocationPlan {
        input: input.to_path_buf(),
        output,
        args,
        env,
        timing,
        video,
        audio,
        subtitles,
        mapping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AudioCodecPolicy, BurnSelection, EncoderFamily, EncoderInventory, Standard,
        SubtitleMatch, SubtitleSelection, TranscodeConfigBuilder,
    };

    const CATALOG: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920,
             "height": 1080, "field_order": "progressive"},
            {"index": 1, "codec_type": "audio", "codec_name": "ac3", "channels": 6,
             "bit_rate": "640000", "sample_rate": "48000"},
            {"index": 2, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
             "disposition": {"forced": 1}}
        ],
        "format": {"filename": "Movie.mkv", "duration": "5400.0"}
    }"#;

    fn plan_for(config: &TranscodeConfig) -> InvocationPlan {
        let catalog = StreamCatalog::from_json(CATALOG).unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        let audio_encoders = AudioEncoders::resolve(
            AudioCodecPolicy::Ac3,
            &EncoderInventory::from_names(["aac"]),
        );
        assemble_plan(&PlanInputs {
            input: Path::new("/media/Movie.mkv"),
            catalog: &catalog,
            config,
            encoder: &encoder,
            audio_encoders: &audio_encoders,
            crop: None,
        })
        .unwrap()
    }

    #[test]
    fn output_path_uses_stem_and_format() {
        assert_eq!(
            output_path(Path::new("/in/Movie.2001.mkv"), Path::new("out"), OutputFormat::Mp4)
                .unwrap(),
            PathBuf::from("out/Movie.2001.mp4")
        );
    }

    #[test]
    fn argument_order() {
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let plan = plan_for(&config);

        assert_eq!(plan.args[..3], ["-loglevel", "error", "-stats"]);
        assert_eq!(plan.args[3..5], ["-i", "/media/Movie.mkv"]);
        assert_eq!(plan.args[5..9], ["-map", "0:0", "-c:v", "libx264"]);
        assert_eq!(
            plan.args[plan.args.len() - 6..],
            ["-sn", "-metadata:g", "title=", "-default_mode", "passthrough", "./Movie.mkv"]
        );
        assert!(plan.args.windows(2).any(|w| w == ["-map", "0:1"]));
        assert!(plan.env.is_empty());
        assert_eq!(plan.output, PathBuf::from("./Movie.mkv"));
    }

    #[test]
    fn burn_and_debug_options() {
        let config = TranscodeConfigBuilder::new()
            .debug(true)
            .output_format(OutputFormat::Mp4)
            .max_muxing_queue_size(1024)
            .burn_subtitle(BurnSelection::Auto)
            .add_subtitle(SubtitleSelection::new(SubtitleMatch::All))
            .build()
            .unwrap();
        let plan = plan_for(&config);

        assert_eq!(plan.args[..2], ["-loglevel", "verbose"]);
        assert_eq!(plan.args[3..7], ["-ss", "0", "-t", "5400"]);
        assert!(plan.args.windows(2).any(|w| w == ["-max_muxing_queue_size", "1024"]));
        assert!(plan.args.windows(2).any(|w| w == ["-filter_complex", "[0:0][0:2]overlay[v]"]));
        assert!(plan.args.windows(2).any(|w| w == ["-movflags", "disable_chpl"]));
        assert!(plan.args.iter().any(|a| a == "-sn"));
        assert_eq!(plan.env, vec![("FFREPORT".to_string(), "level=40".to_string())]);
        assert_eq!(plan.mapping.len(), 2);
        assert!(plan.mapping[0].ends_with("2 = hdmv_pgs_subtitle / burn"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_reach_ffmpeg_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = Path::new(OsStr::from_bytes(b"/media/Caf\xe9.mkv"));
        let catalog = StreamCatalog::from_json(CATALOG).unwrap();
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let encoder = VideoEncoder::encode(EncoderFamily::Software, Standard::H264);
        let audio_encoders = AudioEncoders::resolve(
            AudioCodecPolicy::Ac3,
            &EncoderInventory::from_names(["aac"]),
        );
        let plan = assemble_plan(&PlanInputs {
            input,
            catalog: &catalog,
            config: &config,
            encoder: &encoder,
            audio_encoders: &audio_encoders,
            crop: None,
        })
        .unwrap();

        assert_eq!(plan.args[4], input.as_os_str());
        assert_eq!(
            plan.args.last().map(|a| a.as_bytes()),
            Some(&b"./Caf\xe9.mkv"[..])
        );
    }

    #[test]
    fn command_line_is_escaped() {
        let config = TranscodeConfigBuilder::new().build().unwrap();
        let plan = plan_for(&config);
        let line = plan.command_line();
        assert!(line.starts_with("ffmpeg -loglevel error -stats -i /media/Movie.mkv"));
        assert!(line.contains("-metadata:s:v title\\="));
    }
}
