//! Video filter chain and output geometry.
//!
//! The chain is always assembled in the same order: overlay, frame-rate
//! filters, crop, scale, hardware conversion. Missing steps leave no empty
//! separators behind.

use crate::config::{FilterOptions, ScaleBounds};
use crate::crop::Rectangle;

/// fieldmatch + decimate inverse telecine.
pub const DETELECINE_FILTER: &str = "fieldmatch=order=tff:combmatch=none,decimate";

/// The individual steps of a video filter chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    pub overlay: Option<String>,
    pub frame_rate: Option<String>,
    pub crop: Option<String>,
    pub scale: Option<String>,
    pub conversion: Option<String>,
}

impl FilterChain {
    /// Steps joined with commas, `None` when there are none.
    pub fn render(&self) -> Option<String> {
        let steps: Vec<&str> = [
            &self.overlay,
            &self.frame_rate,
            &self.crop,
            &self.scale,
            &self.conversion,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();

        (!steps.is_empty()).then(|| steps.join(","))
    }

    /// Whether any step other than hardware conversion is present.
    pub fn has_software_steps(&self) -> bool {
        self.overlay.is_some()
            || self.frame_rate.is_some()
            || self.crop.is_some()
            || self.scale.is_some()
    }
}

/// Overlay of subtitle stream `index` onto the video.
pub fn overlay_filter(index: u32, params: Option<&str>) -> String {
    match params {
        Some(params) => format!("[0:{index}]overlay={params}"),
        None => format!("[0:{index}]overlay"),
    }
}

/// Deinterlace, frame-rate and detelecine step.
///
/// Deinterlacing is forced on for interlaced sources while automatic
/// filters are enabled. Detelecine replaces everything else.
pub fn frame_rate_filter(filters: &FilterOptions, progressive: bool) -> Option<String> {
    if filters.detelecine {
        return Some(DETELECINE_FILTER.to_string());
    }

    let deinterlace = filters.deinterlace || (filters.auto_filters && !progressive);
    let mut steps = Vec::new();

    if deinterlace {
        steps.push(match &filters.yadif_params {
            Some(params) => format!("yadif={params}"),
            None => "yadif".to_string(),
        });
    }
    if let Some(rate) = &filters.rate {
        steps.push(format!("fps={rate}"));
    }

    (!steps.is_empty()).then(|| steps.join(","))
}

/// Crop step, omitted when the rectangle is the full frame.
pub fn crop_filter(crop: Option<&Rectangle>, width: u32, height: u32) -> Option<String> {
    crop.filter(|rect| **rect != Rectangle::no_crop(width, height))
        .map(|rect| format!("crop={rect}"))
}

/// Bounds for a standard: H.264 output never exceeds 1920x1080.
pub fn effective_bounds(bounds: ScaleBounds, hevc: bool) -> ScaleBounds {
    if hevc {
        bounds
    } else {
        ScaleBounds {
            width: bounds.width.min(crate::config::FHD_MAX_WIDTH),
            height: bounds.height.min(crate::config::FHD_MAX_HEIGHT),
        }
    }
}

/// Scaled size when `width`x`height` exceeds `bounds`, else `None`.
///
/// Both dimensions use the same factor, `min(maxW/w, maxH/h)`, and are
/// rounded up and then to the next even number.
pub fn scaled_size(width: u32, height: u32, bounds: ScaleBounds) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || (width <= bounds.width && height <= bounds.height) {
        return None;
    }

    // factor = num / den, chosen exactly to avoid float rounding at the bound.
    let (num, den) = if u64::from(bounds.width) * u64::from(height)
        <= u64::from(bounds.height) * u64::from(width)
    {
        (u64::from(bounds.width), u64::from(width))
    } else {
        (u64::from(bounds.height), u64::from(height))
    };

    let scale = |d: u32| -> u32 {
        let scaled = (u64::from(d) * num).div_ceil(den);
        let even = scaled + scaled % 2;
        u32::try_from(even).unwrap_or(u32::MAX)
    };

    Some((scale(width), scale(height)))
}

/// Scale step for a computed size.
pub fn scale_filter(size: (u32, u32), bicubic: bool) -> String {
    if bicubic {
        format!("scale={}:{}:flags=bicubic", size.0, size.1)
    } else {
        format!("scale={}:{}", size.0, size.1)
    }
}
