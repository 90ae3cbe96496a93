//! Typed view over the JSON document produced by
//! `ffprobe -show_streams -show_format -print_format json`.
//!
//! The catalog owns one immutable `StreamDescriptor` per probed stream. It has
//! no behavior beyond lookup; every planning step reads from it.

use crate::error::{CoreError, CoreResult};

use serde::Deserialize;
use std::collections::BTreeMap;

/// Pixel format assumed when ffprobe does not report one.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// The 10-bit planar format that marks a source as HDR-capable.
pub const TEN_BIT_PIXEL_FORMAT: &str = "yuv420p10le";

/// Stream categories relevant to planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl From<&str> for CodecType {
    fn from(s: &str) -> Self {
        match s {
            "video" => CodecType::Video,
            "audio" => CodecType::Audio,
            "subtitle" => CodecType::Subtitle,
            _ => CodecType::Other,
        }
    }
}

/// Disposition flags carried by a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disposition {
    pub default: bool,
    pub forced: bool,
}

/// Snapshot of one probed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub index: u32,
    pub codec_type: CodecType,
    pub codec_name: String,
    pub profile: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub disposition: Disposition,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    pub sample_rate: Option<u32>,
    /// Bits per second as reported in the `bit_rate` field.
    pub bit_rate: Option<u64>,
    pub pixel_format: Option<String>,
    pub color_primaries: Option<String>,
    pub color_transfer: Option<String>,
    pub color_space: Option<String>,
    pub field_order: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub sample_aspect_ratio: Option<String>,
}

impl StreamDescriptor {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// ISO 639-2 language tag, empty when absent.
    pub fn language(&self) -> &str {
        self.tag("language").unwrap_or("")
    }

    /// Title tag, empty when absent.
    pub fn title(&self) -> &str {
        self.tag("title").unwrap_or("")
    }

    /// Bitrate in Kbps from `bit_rate`, falling back to the Matroska
    /// statistics tags. `None` means unknown.
    pub fn bitrate_kbps(&self) -> Option<u64> {
        if let Some(bps) = self.bit_rate {
            return Some(bps / 1000);
        }

        self.tag("BPS")
            .or_else(|| self.tag("BPS-eng"))
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|bps| bps / 1000)
    }

    /// Frame count from the Matroska statistics tags.
    pub fn frame_count(&self) -> Option<u64> {
        self.tag("NUMBER_OF_FRAMES")
            .or_else(|| self.tag("NUMBER_OF_FRAMES-eng"))
            .and_then(|value| value.trim().parse::<u64>().ok())
    }

    pub fn pixel_format(&self) -> &str {
        self.pixel_format.as_deref().unwrap_or(DEFAULT_PIXEL_FORMAT)
    }

    pub fn is_ten_bit(&self) -> bool {
        self.pixel_format() == TEN_BIT_PIXEL_FORMAT
    }

    /// Streams without a field order are treated as progressive.
    pub fn is_progressive(&self) -> bool {
        self.field_order.as_deref().unwrap_or("progressive") == "progressive"
    }

    pub fn channel_count(&self) -> u32 {
        self.channels.unwrap_or(0)
    }

    /// Channel layout description, or the raw channel count when ffprobe
    /// reports no layout.
    pub fn channel_description(&self) -> String {
        match self.channel_layout.as_deref() {
            Some(layout) if !layout.is_empty() => layout.to_string(),
            _ => {
                let channels = self.channel_count();
                format!(
                    "{channels} {}",
                    if channels > 1 { "channels" } else { "channel" }
                )
            }
        }
    }

    /// Bitmap subtitle formats that can be composited onto the picture.
    pub fn is_image_subtitle(&self) -> bool {
        self.codec_type == CodecType::Subtitle
            && matches!(
                self.codec_name.as_str(),
                "hdmv_pgs_subtitle" | "dvd_subtitle"
            )
    }

    /// DTS core or DTS-ES audio. Extensions such as DTS-HD MA do not count.
    pub fn is_dts_core(&self) -> bool {
        self.codec_name == "dts"
            && matches!(self.profile.as_deref().unwrap_or("DTS"), "DTS" | "DTS-ES")
    }
}

/// All streams and format information of one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCatalog {
    pub filename: Option<String>,
    /// Container duration in seconds, 0.0 when unknown.
    pub duration: f64,
    pub streams: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    /// Parses an ffprobe JSON document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let raw: RawProbe = serde_json::from_str(json)
            .map_err(|e| CoreError::ProbeParse(format!("ffprobe output: {e}")))?;
        Ok(raw.into_catalog())
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration
    }

    /// First video stream, which is the one transcoded.
    pub fn video(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .find(|s| s.codec_type == CodecType::Video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams
            .iter()
            .filter(|s| s.codec_type == CodecType::Audio)
    }

    pub fn subtitle_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams
            .iter()
            .filter(|s| s.codec_type == CodecType::Subtitle)
    }

    /// Audio stream by 1-based ordinal among audio streams.
    pub fn audio_track(&self, ordinal: u32) -> Option<&StreamDescriptor> {
        nth_ordinal(self.audio_streams(), ordinal)
    }

    /// Subtitle stream by 1-based ordinal among subtitle streams.
    pub fn subtitle_track(&self, ordinal: u32) -> Option<&StreamDescriptor> {
        nth_ordinal(self.subtitle_streams(), ordinal)
    }
}

fn nth_ordinal<'a>(
    mut streams: impl Iterator<Item = &'a StreamDescriptor>,
    ordinal: u32,
) -> Option<&'a StreamDescriptor> {
    if ordinal == 0 {
        return None;
    }
    streams.nth(ordinal as usize - 1)
}

// ============================================================================
// RAW FFPROBE DOCUMENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawProbe {
    #[serde(default)]
    streams: Vec<RawStream>,
    #[serde(default)]
    format: RawFormat,
}

#[derive(Debug, Default, Deserialize)]
struct RawFormat {
    filename: Option<String>,
    duration: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    profile: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    disposition: BTreeMap<String, serde_json::Value>,
    width: Option<Numeric>,
    height: Option<Numeric>,
    channels: Option<Numeric>,
    channel_layout: Option<String>,
    sample_rate: Option<Numeric>,
    bit_rate: Option<Numeric>,
    pix_fmt: Option<String>,
    color_primaries: Option<String>,
    color_transfer: Option<String>,
    color_space: Option<String>,
    field_order: Option<String>,
    avg_frame_rate: Option<String>,
    sample_aspect_ratio: Option<String>,
}

/// ffprobe reports most numbers as strings but some as JSON numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn as_u64(&self) -> Option<u64> {
        self.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)
    }

    fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|n| u32::try_from(n).ok())
    }
}

fn flag(map: &BTreeMap<String, serde_json::Value>, key: &str) -> bool {
    match map.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        Some(serde_json::Value::Bool(b)) => *b,
        _ => false,
    }
}

impl RawProbe {
    fn into_catalog(self) -> StreamCatalog {
        let duration = self
            .format
            .duration
            .as_ref()
            .and_then(Numeric::as_f64)
            .unwrap_or(0.0);

        let streams = self
            .streams
            .into_iter()
            .map(RawStream::into_descriptor)
            .collect();

        StreamCatalog {
            filename: self.format.filename,
            duration,
            streams,
        }
    }
}

impl RawStream {
    fn into_descriptor(self) -> StreamDescriptor {
        let tags = self
            .tags
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();

        StreamDescriptor {
            index: self.index,
            codec_type: self
                .codec_type
                .as_deref()
                .map(CodecType::from)
                .unwrap_or(CodecType::Other),
            codec_name: self.codec_name.unwrap_or_default(),
            profile: self.profile,
            tags,
            disposition: Disposition {
                default: flag(&self.disposition, "default"),
                forced: flag(&self.disposition, "forced"),
            },
            width: self.width.as_ref().and_then(Numeric::as_u32),
            height: self.height.as_ref().and_then(Numeric::as_u32),
            channels: self.channels.as_ref().and_then(Numeric::as_u32),
            channel_layout: self.channel_layout,
            sample_rate: self.sample_rate.as_ref().and_then(Numeric::as_u32),
            bit_rate: self.bit_rate.as_ref().and_then(Numeric::as_u64),
            pixel_format: self.pix_fmt,
            color_primaries: self.color_primaries,
            color_transfer: self.color_transfer,
            color_space: self.color_space,
            field_order: self.field_order,
            avg_frame_rate: self.avg_frame_rate,
            sample_aspect_ratio: self.sample_aspect_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264",
             "width": 1920, "height": 1080, "field_order": "progressive",
             "avg_frame_rate": "24000/1001", "disposition": {"default": 1, "forced": 0}},
            {"index": 1, "codec_type": "audio", "codec_name": "dts", "profile": "DTS-HD MA",
             "channels": 6, "channel_layout": "5.1(side)", "sample_rate": "48000",
             "tags": {"language": "eng", "BPS-eng": "3500000"},
             "disposition": {"default": 1, "forced": 0}},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3",
             "channels": 2, "bit_rate": "192000", "tags": {"language": "fre", "title": "Commentary"}},
            {"index": 3, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
             "tags": {"language": "eng", "NUMBER_OF_FRAMES": "42"},
             "disposition": {"default": 0, "forced": 1}}
        ],
        "format": {"filename": "movie.mkv", "duration": "5400.123000"}
    }"#;

    #[test]
    fn parses_streams_and_format() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.filename.as_deref(), Some("movie.mkv"));
        assert!((catalog.duration_secs() - 5400.123).abs() < 1e-9);
        assert_eq!(catalog.streams.len(), 4);

        let video = catalog.video().unwrap();
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.pixel_format(), DEFAULT_PIXEL_FORMAT);
        assert!(video.is_progressive());
    }

    #[test]
    fn ordinals_count_within_stream_type() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.audio_track(1).unwrap().index, 1);
        assert_eq!(catalog.audio_track(2).unwrap().index, 2);
        assert!(catalog.audio_track(3).is_none());
        assert!(catalog.audio_track(0).is_none());
        assert_eq!(catalog.subtitle_track(1).unwrap().index, 3);
    }

    #[test]
    fn bitrate_falls_back_to_statistics_tags() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.audio_track(1).unwrap().bitrate_kbps(), Some(3500));
        assert_eq!(catalog.audio_track(2).unwrap().bitrate_kbps(), Some(192));
        assert_eq!(catalog.video().unwrap().bitrate_kbps(), None);
    }

    #[test]
    fn dts_profile_detection() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        assert!(!catalog.audio_track(1).unwrap().is_dts_core());
    }

    #[test]
    fn subtitle_flags_and_frames() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        let sub = catalog.subtitle_track(1).unwrap();
        assert!(sub.disposition.forced);
        assert!(!sub.disposition.default);
        assert!(sub.is_image_subtitle());
        assert_eq!(sub.frame_count(), Some(42));
    }

    #[test]
    fn channel_description_without_layout() {
        let catalog = StreamCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.audio_track(1).unwrap().channel_description(), "5.1(side)");
        assert_eq!(catalog.audio_track(2).unwrap().channel_description(), "2 channels");
    }

    #[test]
    fn missing_duration_is_zero() {
        let catalog = StreamCatalog::from_json(r#"{"streams": [], "format": {}}"#).unwrap();
        assert_eq!(catalog.duration_secs(), 0.0);
        assert!(catalog.video().is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            StreamCatalog::from_json("not json"),
            Err(CoreError::ProbeParse(_))
        ));
    }
}
