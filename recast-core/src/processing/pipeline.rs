// ============================================================================
// recast-core/src/processing/pipeline.rs
// ============================================================================
//
// PIPELINE: Per-input orchestration
//
// Each input is probed once and then, depending on the run mode, reported,
// crop-detected, planned, or planned and transcoded. Matroska outputs are
// post-processed with mkvpropedit. A failure of one input never stops the
// inputs after it, except for an interrupt.
//
// WORKFLOW:
// 1. Refuse to overwrite an existing output (warn only in dry-run)
// 2. Probe the input
// 3. Scan mode: report the streams and stop
// 4. Resolve the crop (detected, manual or none); crop modes stop here
// 5. Assemble the invocation plan; dry-run stops here
// 6. Run ffmpeg, then add statistics tags and HDR metadata

// ---- Internal crate imports ----
use super::scan::scan_report;
use crate::config::encoder::encoder_probe_args;
use crate::config::{
    AudioEncoders, CropMode, EncoderInventory, OutputFormat, RunMode, TranscodeConfig,
    VideoEncoder, resolve_video_encoder,
};
use crate::crop::{FfmpegCropSampler, Rectangle, detect_crop, present_crop};
use crate::error::{CoreError, CoreResult};
use crate::external::{
    CancellationToken, FfmpegSpawner, FfprobeExecutor, MetadataEditor, run_ffmpeg,
};
use crate::media::{StreamCatalog, StreamDescriptor};
use crate::plan::{InvocationPlan, PlanInputs, assemble_plan, output_path};
use crate::utils::seconds_to_time;

// ---- External crate imports ----
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress};

// ---- Standard library imports ----
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ============================================================================
// ENCODER RESOLUTION
// ============================================================================

/// Video and audio encoders shared by every input of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEncoders {
    pub video: VideoEncoder,
    pub audio: AudioEncoders,
}

/// Resolves the encoders once per run. Hardware candidates are confirmed
/// with a one-frame encode of `probe_input`.
pub fn resolve_encoders<S: FfmpegSpawner>(
    config: &TranscodeConfig,
    inventory: &EncoderInventory,
    spawner: &S,
    probe_input: &Path,
    cancel: &CancellationToken,
) -> CoreResult<ResolvedEncoders> {
    let video = resolve_video_encoder(config, inventory, |name| {
        let args = encoder_probe_args(name, probe_input);
        match run_ffmpeg(spawner, &args, &[], cancel, |_| {}) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Probe encode with \"{}\" failed: {}", name, e);
                false
            }
        }
    })?;
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled("encoder probe".to_string()));
    }

    let audio = AudioEncoders::resolve(config.audio.policy, inventory);
    log::debug!(
        "encoders = {} / {} / {}",
        video,
        audio.surround,
        audio.stereo
    );
    Ok(ResolvedEncoders { video, audio })
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// What processing one input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Stream report lines (`--scan`).
    Scanned(Vec<String>),
    /// Crop geometry or preview commands.
    Crop(Vec<String>),
    /// Printable command line of a dry run.
    DryRun(String),
    Transcoded { output: PathBuf, elapsed: Duration },
}

/// Totals of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// The run stopped early because of an interrupt.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Processes inputs with injected tool implementations.
///
/// * `S` spawns ffmpeg for crop sampling and the transcode itself
/// * `P` probes inputs and reads first-frame HDR side data
/// * `M` post-processes Matroska outputs
pub struct Pipeline<'a, S, P, M>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    M: MetadataEditor,
{
    spawner: &'a S,
    ffprobe: &'a P,
    editor: &'a M,
    config: &'a TranscodeConfig,
    encoders: Option<ResolvedEncoders>,
    cancel: CancellationToken,
    progress: Option<&'a dyn Fn(&FfmpegProgress)>,
}

impl<'a, S, P, M> Pipeline<'a, S, P, M>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    M: MetadataEditor,
{
    /// `encoders` may be `None` when the run mode never plans a transcode.
    pub fn new(
        spawner: &'a S,
        ffprobe: &'a P,
        editor: &'a M,
        config: &'a TranscodeConfig,
        encoders: Option<ResolvedEncoders>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            spawner,
            ffprobe,
            editor,
            config,
            encoders,
            cancel,
            progress: None,
        }
    }

    /// Receives ffmpeg progress updates during transcodes.
    pub fn with_progress(mut self, progress: &'a dyn Fn(&FfmpegProgress)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Processes every input in order.
    ///
    /// `on_result` sees each input's result as soon as it is known. Errors
    /// are logged and counted; an interrupt ends the run.
    pub fn run<F>(&self, inputs: &[PathBuf], mut on_result: F) -> RunSummary
    where
        F: FnMut(&Path, &CoreResult<FileOutcome>),
    {
        let mut summary = RunSummary::default();

        for input in inputs {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let result = self.process_file(input);
            on_result(input, &result);

            match &result {
                Ok(_) => summary.succeeded += 1,
                Err(CoreError::Cancelled(what)) => {
                    log::warn!("{}: interrupted while running {}", input.display(), what);
                    summary.failed += 1;
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    log::error!("{}: {}", input.display(), e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Processes one input according to the run mode.
    pub fn process_file(&self, input: &Path) -> CoreResult<FileOutcome> {
        let config = self.config;

        if config.mode == RunMode::Transcode {
            let output = output_path(input, &config.output_dir, config.output_format)?;
            if output.exists() {
                if !config.dry_run {
                    return Err(CoreError::OutputExists(output.display().to_string()));
                }
                log::warn!("Output file already exists: {}", output.display());
            }
        }

        let catalog = self.ffprobe.probe(input)?;

        if config.mode == RunMode::Scan {
            return Ok(FileOutcome::Scanned(scan_report(
                &catalog,
                &input.display().to_string(),
            )));
        }

        let video = catalog.video().ok_or_else(|| {
            CoreError::StreamNotFound(format!("video track not found: {}", input.display()))
        })?;

        if matches!(config.mode, RunMode::PrintCrop | RunMode::PreviewCrop) {
            let crop = self.detect(input, &catalog, video)?;
            return Ok(FileOutcome::Crop(present_crop(
                &crop,
                input,
                config.mode == RunMode::PreviewCrop,
            )));
        }

        let crop = self.resolve_crop(input, &catalog, video)?;

        let encoders = self.encoders.as_ref().ok_or_else(|| {
            CoreError::UnsupportedEncoder("no video encoder resolved".to_string())
        })?;
        let plan = assemble_plan(&PlanInputs {
            input,
            catalog: &catalog,
            config,
            encoder: &encoders.video,
            audio_encoders: &encoders.audio,
            crop: crop.as_ref(),
        })?;

        for line in &plan.mapping {
            log::info!("{}", line);
        }

        if config.dry_run {
            return Ok(FileOutcome::DryRun(plan.command_line()));
        }

        let started = Instant::now();
        self.transcode(&plan)?;
        self.post_process(&plan, video)?;

        let elapsed = started.elapsed();
        log::info!("Elapsed time = {}", seconds_to_time(elapsed.as_secs()));
        Ok(FileOutcome::Transcoded {
            output: plan.output,
            elapsed,
        })
    }

    fn detect(
        &self,
        input: &Path,
        catalog: &StreamCatalog,
        video: &StreamDescriptor,
    ) -> CoreResult<Rectangle> {
        let mut sampler = FfmpegCropSampler::new(self.spawner, input, &self.cancel);
        detect_crop(catalog, video, &mut sampler)
    }

    fn resolve_crop(
        &self,
        input: &Path,
        catalog: &StreamCatalog,
        video: &StreamDescriptor,
    ) -> CoreResult<Option<Rectangle>> {
        match self.config.crop {
            CropMode::None => Ok(None),
            CropMode::Auto => {
                let crop = self.detect(input, catalog, video)?;
                log::info!("crop = {}", crop);
                Ok(Some(crop))
            }
            CropMode::Manual(values) => {
                let (crop, margins) = Rectangle::from_manual(
                    values,
                    video.width.unwrap_or(0),
                    video.height.unwrap_or(0),
                );
                if margins {
                    log::info!("Interpreting crop geometry as TOP:BOTTOM:LEFT:RIGHT values...");
                }
                if crop.width == 0 || crop.height == 0 {
                    return Err(CoreError::InvalidArgument(format!(
                        "invalid crop geometry: empty rectangle {}",
                        crop
                    )));
                }
                log::info!("crop = {}", crop);
                Ok(Some(crop))
            }
        }
    }

    fn transcode(&self, plan: &InvocationPlan) -> CoreResult<()> {
        log::info!("{}", plan.command_line());
        log::info!("Transcoding...");

        run_ffmpeg(self.spawner, &plan.args, &plan.env, &self.cancel, |event| {
            match event {
                FfmpegEvent::Progress(progress) => match self.progress {
                    Some(report) => report(progress),
                    None => log::debug!("time = {} / speed = {}", progress.time, progress.speed),
                },
                FfmpegEvent::Log(_, line) => log::debug!("ffmpeg: {}", line),
                _ => {}
            }
        })
    }

    fn post_process(&self, plan: &InvocationPlan, video: &StreamDescriptor) -> CoreResult<()> {
        if self.config.output_format != OutputFormat::Mkv {
            return Ok(());
        }

        log::info!("Adding track statistics...");
        self.editor.add_track_statistics(&plan.output)?;

        if video.is_ten_bit() && plan.video.ten_bit {
            if let Some(hdr) = self.ffprobe.first_frame_hdr(&plan.input)? {
                log::info!("Adding HDR metadata...");
                self.editor.apply_hdr(&plan.output, &hdr)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderFamily, Standard, TranscodeConfigBuilder};
    use crate::external::mocks::{
        EditorCall, MockFfmpegSpawner, MockFfprobeExecutor, MockMetadataEditor,
    };
    use crate::media::{ContentLightLevel, HdrMetadata, MasteringDisplay};
    use ffmpeg_sidecar::event::LogLevel;

    const MOVIE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840,
             "height": 2160, "pix_fmt": "yuv420p10le", "avg_frame_rate": "24000/1001"},
            {"index": 1, "codec_type": "audio", "codec_name": "ac3", "channels": 6,
             "bit_rate": "640000", "tags": {"language": "eng"}}
        ],
        "format": {"filename": "Movie.mkv", "duration": "60.0"}
    }"#;

    struct Fixture {
        spawner: MockFfmpegSpawner,
        ffprobe: MockFfprobeExecutor,
        editor: MockMetadataEditor,
        output_dir: tempfile::TempDir,
        input: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let ffprobe = MockFfprobeExecutor::new();
            let input = PathBuf::from("/rips/Movie.mkv");
            ffprobe.expect_catalog(&input, StreamCatalog::from_json(MOVIE).unwrap());
            Self {
                spawner: MockFfmpegSpawner::new(),
                ffprobe,
                editor: MockMetadataEditor::new(),
                output_dir: tempfile::tempdir().unwrap(),
                input,
            }
        }

        fn builder(&self) -> TranscodeConfigBuilder {
            TranscodeConfigBuilder::new().output_dir(self.output_dir.path().to_path_buf())
        }

        fn run(&self, config: &TranscodeConfig) -> CoreResult<FileOutcome> {
            let encoders = ResolvedEncoders {
                video: VideoEncoder::encode(EncoderFamily::Software, Standard::Hevc),
                audio: AudioEncoders::resolve(
                    config.audio.policy,
                    &EncoderInventory::from_names(["aac"]),
                ),
            };
            Pipeline::new(
                &self.spawner,
                &self.ffprobe,
                &self.editor,
                config,
                Some(encoders),
                CancellationToken::new(),
            )
            .process_file(&self.input)
        }
    }

    fn hdr() -> HdrMetadata {
        HdrMetadata {
            mastering: MasteringDisplay {
                red_x: 0.68,
                red_y: 0.32,
                green_x: 0.265,
                green_y: 0.69,
                blue_x: 0.15,
                blue_y: 0.06,
                white_point_x: 0.3127,
                white_point_y: 0.329,
                max_luminance: 1000.0,
                min_luminance: 0.005,
            },
            light: ContentLightLevel {
                max_content: 1000,
                max_average: 400,
            },
        }
    }

    #[test]
    fn scan_mode_only_probes() {
        let fixture = Fixture::new();
        let config = fixture.builder().mode(RunMode::Scan).build().unwrap();
        match fixture.run(&config).unwrap() {
            FileOutcome::Scanned(lines) => {
                assert_eq!(lines[0], "Movie.mkv");
                assert!(lines.contains(&"#1 audio:".to_string()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(fixture.spawner.get_received_calls().is_empty());
    }

    #[test]
    fn dry_run_prints_command_without_spawning() {
        let fixture = Fixture::new();
        let config = fixture.builder().dry_run(true).build().unwrap();
        match fixture.run(&config).unwrap() {
            FileOutcome::DryRun(line) => {
                assert!(line.starts_with("ffmpeg -loglevel error -stats -i /rips/Movie.mkv"));
                assert!(line.contains("libx265"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(fixture.spawner.get_received_calls().is_empty());
        assert!(fixture.editor.calls().is_empty());
    }

    #[test]
    fn transcode_adds_statistics_and_hdr() {
        let fixture = Fixture::new();
        fixture.ffprobe.expect_hdr(&fixture.input, hdr());
        fixture.spawner.add_success_expectation("-stats", vec![]);
        let config = fixture.builder().build().unwrap();

        let output = fixture.output_dir.path().join("Movie.mkv");
        match fixture.run(&config).unwrap() {
            FileOutcome::Transcoded { output: written, .. } => assert_eq!(written, output),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let calls = fixture.editor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], EditorCall::Statistics(output.clone()));
        assert!(matches!(&calls[1], EditorCall::Hdr(path, props) if *path == output && !props.is_empty()));
    }

    #[test]
    fn mp4_output_is_not_post_processed() {
        let fixture = Fixture::new();
        fixture.spawner.add_success_expectation("-stats", vec![]);
        let config = fixture
            .builder()
            .output_format(OutputFormat::Mp4)
            .build()
            .unwrap();
        assert!(fixture.run(&config).is_ok());
        assert!(fixture.editor.calls().is_empty());
    }

    #[test]
    fn failing_transcode_skips_post_processing() {
        let fixture = Fixture::new();
        fixture.spawner.add_exit_error_expectation(
            "-stats",
            vec![FfmpegEvent::Log(LogLevel::Error, "Conversion failed!".into())],
            1,
        );
        let config = fixture.builder().build().unwrap();
        match fixture.run(&config) {
            Err(CoreError::ExternalToolFailure { output, .. }) => {
                assert!(output.contains("Conversion failed!"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(fixture.editor.calls().is_empty());
    }

    #[test]
    fn existing_output_is_refused() {
        let fixture = Fixture::new();
        std::fs::write(fixture.output_dir.path().join("Movie.mkv"), b"").unwrap();

        let config = fixture.builder().build().unwrap();
        assert!(matches!(fixture.run(&config), Err(CoreError::OutputExists(_))));

        let config = fixture.builder().dry_run(true).build().unwrap();
        assert!(matches!(fixture.run(&config), Ok(FileOutcome::DryRun(_))));
    }

    #[test]
    fn print_crop_reports_detected_geometry() {
        let fixture = Fixture::new();
        let report = "[Parsed_cropdetect_0 @ 0x1] crop=3840:1600:0:280";
        for _ in 0..10 {
            fixture.spawner.add_success_expectation(
                "cropdetect",
                vec![FfmpegEvent::Log(LogLevel::Info, report.into())],
            );
        }
        let config = fixture.builder().mode(RunMode::PrintCrop).build().unwrap();
        assert_eq!(
            fixture.run(&config).unwrap(),
            FileOutcome::Crop(vec!["3840:1600:0:280".to_string()])
        );
        assert_eq!(fixture.spawner.get_received_calls().len(), 10);
    }

    #[test]
    fn run_isolates_failures() {
        let fixture = Fixture::new();
        let config = fixture.builder().mode(RunMode::Scan).build().unwrap();
        let pipeline = Pipeline::new(
            &fixture.spawner,
            &fixture.ffprobe,
            &fixture.editor,
            &config,
            None,
            CancellationToken::new(),
        );

        let inputs = vec![PathBuf::from("/rips/Missing.mkv"), fixture.input.clone()];
        let mut seen = Vec::new();
        let summary = pipeline.run(&inputs, |input, result| {
            seen.push((input.to_path_buf(), result.is_ok()));
        });

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(seen[0], (PathBuf::from("/rips/Missing.mkv"), false));
        assert_eq!(seen[1], (fixture.input.clone(), true));
    }

    #[test]
    fn cancelled_run_processes_nothing() {
        let fixture = Fixture::new();
        let config = fixture.builder().mode(RunMode::Scan).build().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pipeline = Pipeline::new(
            &fixture.spawner,
            &fixture.ffprobe,
            &fixture.editor,
            &config,
            None,
            cancel,
        );

        let summary = pipeline.run(&[fixture.input.clone()], |_, _| {});
        assert!(summary.cancelled);
        assert_eq!(summary.succeeded + summary.failed, 0);
    }

    #[test]
    fn automatic_encoder_uses_first_working_hardware() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_exit_error_expectation("hevc_nvenc", vec![], 1);
        spawner.add_success_expectation("hevc_qsv", vec![]);
        let config = TranscodeConfigBuilder::new().hevc(true).build().unwrap();
        let inventory = EncoderInventory::from_names(["hevc_nvenc", "hevc_qsv", "aac"]);

        let resolved = resolve_encoders(
            &config,
            &inventory,
            &spawner,
            Path::new("/rips/Movie.mkv"),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(resolved.video, VideoEncoder::encode(EncoderFamily::Qsv, Standard::Hevc));
        assert_eq!(resolved.audio.surround, "ac3");
        assert_eq!(spawner.get_received_calls().len(), 2);
    }
}
