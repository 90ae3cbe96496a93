//! HDR side data read from the first video frame.
//!
//! Only the two records Matroska can carry as track properties are kept:
//! mastering display metadata and content light level metadata. Both must be
//! present for anything to be written.

use crate::error::{CoreError, CoreResult};

use serde::Deserialize;
use serde_json::Value;

const MASTERING_DISPLAY: &str = "Mastering display metadata";
const CONTENT_LIGHT_LEVEL: &str = "Content light level metadata";

/// Mastering display color volume, already evaluated to decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteringDisplay {
    pub red_x: f64,
    pub red_y: f64,
    pub green_x: f64,
    pub green_y: f64,
    pub blue_x: f64,
    pub blue_y: f64,
    pub white_point_x: f64,
    pub white_point_y: f64,
    pub max_luminance: f64,
    pub min_luminance: f64,
}

/// Content light levels in nits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLightLevel {
    pub max_content: u64,
    pub max_average: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HdrMetadata {
    pub mastering: MasteringDisplay,
    pub light: ContentLightLevel,
}

#[derive(Debug, Deserialize)]
struct FrameDocument {
    #[serde(default)]
    frames: Vec<Frame>,
}

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    side_data_list: Vec<serde_json::Map<String, Value>>,
}

impl HdrMetadata {
    /// Parses `ffprobe -show_frames -show_entries frame=side_data_list` JSON.
    /// Returns `Ok(None)` when either record is missing.
    pub fn from_frames_json(json: &str) -> CoreResult<Option<Self>> {
        let doc: FrameDocument = serde_json::from_str(json)
            .map_err(|e| CoreError::ProbeParse(format!("frame side data: {e}")))?;

        let mut mastering = None;
        let mut light = None;

        for side_data in doc.frames.iter().flat_map(|f| f.side_data_list.iter()) {
            match side_data.get("side_data_type").and_then(Value::as_str) {
                Some(MASTERING_DISPLAY) if mastering.is_none() => {
                    mastering = Some(parse_mastering(side_data)?);
                }
                Some(CONTENT_LIGHT_LEVEL) if light.is_none() => {
                    light = Some(ContentLightLevel {
                        max_content: integer_field(side_data, "max_content")?,
                        max_average: integer_field(side_data, "max_average")?,
                    });
                }
                _ => {}
            }
        }

        Ok(match (mastering, light) {
            (Some(mastering), Some(light)) => Some(Self { mastering, light }),
            _ => None,
        })
    }

    /// `--set` arguments for `mkvpropedit --edit track:v1`.
    pub fn property_assignments(&self) -> Vec<String> {
        let md = &self.mastering;
        let pairs: [(&str, String); 12] = [
            ("max-content-light", self.light.max_content.to_string()),
            ("max-frame-light", self.light.max_average.to_string()),
            ("chromaticity-coordinates-red-x", md.red_x.to_string()),
            ("chromaticity-coordinates-red-y", md.red_y.to_string()),
            ("chromaticity-coordinates-green-x", md.green_x.to_string()),
            ("chromaticity-coordinates-green-y", md.green_y.to_string()),
            ("chromaticity-coordinates-blue-x", md.blue_x.to_string()),
            ("chromaticity-coordinates-blue-y", md.blue_y.to_string()),
            ("white-coordinates-x", md.white_point_x.to_string()),
            ("white-coordinates-y", md.white_point_y.to_string()),
            ("max-luminance", md.max_luminance.to_string()),
            ("min-luminance", md.min_luminance.to_string()),
        ];

        pairs
            .into_iter()
            .flat_map(|(key, value)| ["--set".to_string(), format!("{key}={value}")])
            .collect()
    }
}

fn parse_mastering(map: &serde_json::Map<String, Value>) -> CoreResult<MasteringDisplay> {
    Ok(MasteringDisplay {
        red_x: rational_field(map, "red_x")?,
        red_y: rational_field(map, "red_y")?,
        green_x: rational_field(map, "green_x")?,
        green_y: rational_field(map, "green_y")?,
        blue_x: rational_field(map, "blue_x")?,
        blue_y: rational_field(map, "blue_y")?,
        white_point_x: rational_field(map, "white_point_x")?,
        white_point_y: rational_field(map, "white_point_y")?,
        max_luminance: rational_field(map, "max_luminance")?,
        min_luminance: rational_field(map, "min_luminance")?,
    })
}

/// Evaluates `"num/den"` (or a plain number) to a decimal.
pub fn parse_rational(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => text.trim().parse::<f64>().ok(),
    }
}

fn rational_field(map: &serde_json::Map<String, Value>, key: &str) -> CoreResult<f64> {
    let value = match map.get(key) {
        Some(Value::String(s)) => parse_rational(s),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    value.ok_or_else(|| CoreError::ProbeParse(format!("mastering display field {key}")))
}

fn integer_field(map: &serde_json::Map<String, Value>, key: &str) -> CoreResult<u64> {
    let value = match map.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    value.ok_or_else(|| CoreError::ProbeParse(format!("content light level field {key}")))
}
