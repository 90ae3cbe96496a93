//! Seek position and output duration.

use crate::error::{CoreError, CoreResult};
use crate::utils::format_duration;

/// Inputs shorter than this many seconds are rejected.
pub const MIN_DURATION_SECS: f64 = 2.0;

/// Shortest output duration that can be requested.
const MIN_REQUESTED_SECS: f64 = 0.1;

/// Resolved timing of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingPlan {
    /// Start position in seconds.
    pub position: f64,
    /// Output duration in seconds.
    pub duration: f64,
    /// `-ss`/`-t` arguments placed before `-i`.
    pub args: Vec<String>,
}

/// Resolves the timing for a source of `duration` seconds.
///
/// Burning subtitles always emits explicit `-ss` and `-t` so the overlay
/// stays aligned with the picture.
pub fn build_timing(
    duration: f64,
    position: Option<f64>,
    requested: Option<f64>,
    burning: bool,
) -> CoreResult<TimingPlan> {
    if duration.is_nan() || duration < MIN_DURATION_SECS {
        return Err(CoreError::MediaTooShort(duration));
    }

    let (start, mut remaining) = match position {
        Some(pos) => {
            let start = pos.max(0.0).min(duration - 1.0);
            (start, duration - start)
        }
        None => (0.0, duration),
    };

    if let Some(requested) = requested {
        remaining = remaining.min(requested.max(MIN_REQUESTED_SECS));
    }

    let mut args = Vec::new();
    if position.is_some() || burning {
        args.push("-ss".to_string());
        args.push(start.to_string());
    }
    if requested.is_some() || burning {
        args.push("-t".to_string());
        args.push(remaining.to_string());
    }

    log::info!("duration = {}", format_duration(remaining));

    Ok(TimingPlan {
        position: start,
        duration: remaining,
        args,
    })
}
