//! `CropSampler` backed by ffmpeg's `cropdetect` filter.

use super::{CropSampler, Rectangle};
use crate::error::{CoreError, CoreResult};
use crate::external::{CancellationToken, FfmpegSpawner, run_ffmpeg};

use ffmpeg_sidecar::event::FfmpegEvent;
use std::ffi::OsString;
use std::path::Path;

/// cropdetect limit and rounding: 24/255 black threshold, 2 pixel rounding.
const CROPDETECT_FILTER: &str = "cropdetect=24.0/255:2";

/// Extracts the last `crop=W:H:X:Y` report of a cropdetect log line.
pub fn parse_crop_line(line: &str) -> Option<Rectangle> {
    let start = line.rfind("crop=")?;
    let values: Vec<u32> = line[start + "crop=".len()..]
        .trim_end()
        .split(':')
        .map(|v| v.parse::<u32>().ok())
        .collect::<Option<_>>()?;

    match values.as_slice() {
        [w, h, x, y] => Some(Rectangle::new(*w, *h, *x, *y)),
        _ => None,
    }
}

/// Arguments (program name excluded) of one cropdetect sample.
pub fn sample_args(input: &Path, position_secs: u64, frames: u32) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-noaccurate_seek".into(),
        "-ss".into(),
        position_secs.to_string().into(),
        "-i".into(),
        input.into(),
        "-frames:v".into(),
        frames.to_string().into(),
        "-filter:v".into(),
        CROPDETECT_FILTER.into(),
        "-an".into(),
        "-sn".into(),
        "-ignore_unknown".into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ]
}

/// Samples `input` by running ffmpeg once per position.
pub struct FfmpegCropSampler<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    input: &'a Path,
    cancel: &'a CancellationToken,
}

impl<'a, S: FfmpegSpawner> FfmpegCropSampler<'a, S> {
    pub fn new(spawner: &'a S, input: &'a Path, cancel: &'a CancellationToken) -> Self {
        Self {
            spawner,
            input,
            cancel,
        }
    }
}

impl<S: FfmpegSpawner> CropSampler for FfmpegCropSampler<'_, S> {
    fn sample(&mut self, position_secs: u64, frames: u32) -> CoreResult<Vec<Rectangle>> {
        let args = sample_args(self.input, position_secs, frames);
        let mut reports = Vec::new();

        let result = run_ffmpeg(self.spawner, &args, &[], self.cancel, |event| {
            if let FfmpegEvent::Log(_, line) = event {
                if let Some(rect) = parse_crop_line(line) {
                    reports.push(rect);
                }
            }
        });

        match result {
            Ok(()) => Ok(reports),
            Err(CoreError::ExternalToolFailure { output, .. }) => {
                Err(CoreError::DetectionFailed(format!(
                    "{} at {}s: {}",
                    self.input.display(),
                    position_secs,
                    output
                )))
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::MockFfmpegSpawner;
    use ffmpeg_sidecar::event::LogLevel;

    fn log(line: &str) -> FfmpegEvent {
        FfmpegEvent::Log(LogLevel::Info, line.to_string())
    }

    #[test]
    fn parses_cropdetect_lines() {
        let line = "[Parsed_cropdetect_0 @ 0x7f] x1:0 x2:1919 y1:140 y2:939 w:1920 h:800 \
                    x:0 y:140 pts:1001 t:0.041708 crop=1920:800:0:140";
        assert_eq!(parse_crop_line(line), Some(Rectangle::new(1920, 800, 0, 140)));
        assert_eq!(parse_crop_line("frame=   15 fps=0.0"), None);
        assert_eq!(parse_crop_line("crop=1920:800:0"), None);
    }

    #[test]
    fn last_report_on_a_line_wins() {
        let line = "crop=1:1:0:0 crop=1280:536:0:92";
        assert_eq!(parse_crop_line(line), Some(Rectangle::new(1280, 536, 0, 92)));
    }

    #[test]
    fn sample_collects_reports() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation(
            "cropdetect",
            vec![
                log("t:0.04 crop=1920:800:0:140"),
                log("t:0.08 crop=1920:804:0:138"),
                log("unrelated"),
            ],
        );
        let cancel = CancellationToken::new();
        let input = Path::new("movie.mkv");
        let mut sampler = FfmpegCropSampler::new(&spawner, input, &cancel);

        let reports = sampler.sample(327, 15).unwrap();
        assert_eq!(reports.len(), 2);

        let call = &spawner.get_received_calls()[0];
        assert_eq!(call[..4], ["-hide_banner", "-noaccurate_seek", "-ss", "327"]);
        assert!(call.windows(2).any(|w| w == ["-frames:v", "15"]));
    }

    #[test]
    fn failed_sample_is_a_detection_failure() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_exit_error_expectation("cropdetect", vec![log("Invalid data")], 1);
        let cancel = CancellationToken::new();
        let mut sampler = FfmpegCropSampler::new(&spawner, Path::new("bad.mkv"), &cancel);

        assert!(matches!(
            sampler.sample(1, 15),
            Err(CoreError::DetectionFailed(msg)) if msg.contains("Invalid data")
        ));
    }
}
