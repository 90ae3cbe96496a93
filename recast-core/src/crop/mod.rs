// ============================================================================
// recast-core/src/crop/mod.rs
// ============================================================================
//
// CROP DETECTION: Active picture area from sampled cropdetect reports
//
// The input is sampled at evenly spaced positions. Each sample yields zero or
// more rectangles which are folded into a per-sample rectangle, and the
// per-sample rectangles are folded into a running aggregate. Full-frame
// samples that follow a letterboxed sample are treated as outliers (black
// intros, credits, fades) and counted instead of merged.
//
// KEY COMPONENTS:
// - Rectangle: crop geometry with the no-crop and all-crop constructors
// - CropSampler: the sampling callback (ffmpeg cropdetect in production)
// - SampleSchedule: sample count and spacing derived from the duration
// - CropAggregator: the folding and collapse rules
// - detect_crop: the entry point

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::media::{StreamCatalog, StreamDescriptor};
use crate::plan::timing::MIN_DURATION_SECS;

// ---- Standard library imports ----
use std::fmt;

// ============================================================================
// SUBMODULES
// ============================================================================

/// ffmpeg cropdetect sampler and log line parsing.
pub mod sampler;

/// Printable crop output and mpv preview commands.
pub mod preview;

pub use preview::present_crop;
pub use sampler::{FfmpegCropSampler, parse_crop_line};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of samples before the interval is stretched.
pub const DEFAULT_STEPS: u64 = 10;

/// Preferred upper bound on the distance between samples.
pub const TARGET_INTERVAL_SECS: u64 = 300;

/// Frames analysed at each sample position.
pub const FRAMES_PER_SAMPLE: u32 = 15;

/// Horizontal tolerance of the near-full-width collapse rule.
const NEAR_FULL_WIDTH_TOLERANCE: u32 = 2;

/// More ignored samples than this always collapse to no-crop.
const MAX_IGNORED_SAMPLES: u32 = 2;

// ============================================================================
// RECTANGLE
// ============================================================================

/// Crop geometry in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl Rectangle {
    pub fn new(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// The full frame at the origin.
    pub fn no_crop(frame_width: u32, frame_height: u32) -> Self {
        Self::new(frame_width, frame_height, 0, 0)
    }

    /// Seed for aggregation: empty size, origin at the far corner. Folding
    /// any real rectangle into it yields that rectangle.
    pub fn all_crop(frame_width: u32, frame_height: u32) -> Self {
        Self::new(0, 0, frame_width, frame_height)
    }

    /// Resolves four user-supplied crop values against the frame size.
    ///
    /// Values that all fit within a quarter of the frame are margins in
    /// `T:B:L:R` order, anything else is `W:H:X:Y`. Returns whether the
    /// margin interpretation was used.
    pub fn from_manual(values: [u32; 4], frame_width: u32, frame_height: u32) -> (Self, bool) {
        let [top, bottom, left, right] = values;
        let max_x = frame_width / 4;
        let max_y = frame_height / 4;

        if left <= max_x && right <= max_x && top <= max_y && bottom <= max_y {
            let rect = Self::new(
                frame_width.saturating_sub(left + right),
                frame_height.saturating_sub(top + bottom),
                left,
                top,
            );
            (rect, true)
        } else {
            (Self::new(values[0], values[1], values[2], values[3]), false)
        }
    }

    /// Widens `self` so that it covers `other`: larger width and height,
    /// smaller x and y.
    pub fn merge(&mut self, other: &Rectangle) {
        self.width = self.width.max(other.width);
        self.height = self.height.max(other.height);
        self.x = self.x.min(other.x);
        self.y = self.y.min(other.y);
    }
}

/// `W:H:X:Y`, the form accepted by ffmpeg's crop filter.
impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

// ============================================================================
// SAMPLING
// ============================================================================

/// Source of cropdetect readings.
///
/// `sample` is called once per scheduled position and returns every
/// rectangle reported while analysing `frames` frames starting there. An
/// abnormal termination of the underlying mechanism must be reported as
/// `CoreError::DetectionFailed`.
pub trait CropSampler {
    fn sample(&mut self, position_secs: u64, frames: u32) -> CoreResult<Vec<Rectangle>>;
}

/// Number of samples and the spacing between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSchedule {
    pub steps: u64,
    pub interval: u64,
}

impl SampleSchedule {
    /// Ten samples spread evenly, stretched so that samples are at most five
    /// minutes apart only by adding more of them.
    pub fn for_duration(duration_secs: f64) -> Self {
        let mut steps = DEFAULT_STEPS;
        let mut interval = (duration_secs / (steps + 1) as f64) as u64;

        if interval == 0 {
            steps = 1;
            interval = 1;
        } else if interval > TARGET_INTERVAL_SECS {
            steps = (duration_secs / TARGET_INTERVAL_SECS as f64 - 1.0) as u64;
            interval = (duration_secs / (steps + 1) as f64) as u64;
        }

        Self { steps, interval }
    }

    /// Sample positions in seconds, in order.
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        (1..=self.steps).map(move |step| self.interval * step)
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Running state of the crop fold.
#[derive(Debug, Clone)]
pub struct CropAggregator {
    frame_width: u32,
    frame_height: u32,
    aggregate: Rectangle,
    last_sample: Rectangle,
    ignore_count: u32,
}

impl CropAggregator {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        let seed = Rectangle::all_crop(frame_width, frame_height);
        Self {
            frame_width,
            frame_height,
            aggregate: seed,
            last_sample: seed,
            ignore_count: 0,
        }
    }

    /// Folds the rectangles reported by one sample into a single rectangle.
    pub fn fold_sample(&self, reports: &[Rectangle]) -> Rectangle {
        let mut sample = Rectangle::all_crop(self.frame_width, self.frame_height);
        for report in reports {
            sample.merge(report);
        }
        sample
    }

    /// Adds one sample's rectangles to the aggregate.
    pub fn push_sample(&mut self, reports: &[Rectangle]) {
        let sample = self.fold_sample(reports);
        let no_crop = Rectangle::no_crop(self.frame_width, self.frame_height);

        if sample == no_crop && self.last_sample != no_crop {
            self.ignore_count += 1;
            log::debug!("Ignoring full-frame crop sample {sample}");
        } else {
            self.aggregate.merge(&sample);
        }

        self.last_sample = sample;
    }

    pub fn ignore_count(&self) -> u32 {
        self.ignore_count
    }

    pub fn aggregate(&self) -> Rectangle {
        self.aggregate
    }

    /// Applies the collapse rules and returns the final rectangle.
    pub fn finish(&self) -> Rectangle {
        let no_crop = Rectangle::no_crop(self.frame_width, self.frame_height);
        let all_crop = Rectangle::all_crop(self.frame_width, self.frame_height);
        let near_full_frame = self.aggregate.width + NEAR_FULL_WIDTH_TOLERANCE
            == self.frame_width
            && self.aggregate.height == self.frame_height;

        if self.aggregate == all_crop
            || self.ignore_count > MAX_IGNORED_SAMPLES
            || (self.ignore_count > 0 && near_full_frame)
        {
            no_crop
        } else {
            self.aggregate
        }
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Infers the active picture rectangle of `video` by sampling across the
/// input's duration.
pub fn detect_crop<S: CropSampler + ?Sized>(
    catalog: &StreamCatalog,
    video: &StreamDescriptor,
    sampler: &mut S,
) -> CoreResult<Rectangle> {
    let duration = catalog.duration_secs();
    if duration < MIN_DURATION_SECS {
        return Err(CoreError::MediaTooShort(duration));
    }

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(CoreError::StreamNotFound(
                "video stream has no dimensions".to_string(),
            ));
        }
    };

    let schedule = SampleSchedule::for_duration(duration);
    log::info!("Detecting crop...");
    log::debug!(
        "duration = {} / steps = {} / interval = {}",
        duration,
        schedule.steps,
        schedule.interval
    );

    let mut aggregator = CropAggregator::new(width, height);
    for position in schedule.positions() {
        log::debug!("crop = {} / position = {}", aggregator.aggregate(), position);
        let reports = sampler.sample(position, FRAMES_PER_SAMPLE)?;
        aggregator.push_sample(&reports);
    }

    log::debug!("ignore count = {}", aggregator.ignore_count());
    Ok(aggregator.finish())
}
