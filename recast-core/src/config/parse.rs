//! Parsers for structured option values.
//!
//! Each function turns one textual option value into its typed form and
//! fails with `CoreError::InvalidArgument` when the text is malformed.

use super::{
    AmfQuality, AudioSelection, AudioWidth, BframeRefMode, BurnSelection, CropMode, DecodeScope,
    NvencMultipass, SubtitleMatch, SubtitleSelection, Tier, TrackMatch,
};
use crate::error::{CoreError, CoreResult};

use std::str::FromStr;

fn invalid(what: &str, arg: &str) -> CoreError {
    CoreError::InvalidArgument(format!("invalid {what}: {arg}"))
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Digits with an optional fractional part, e.g. `12` or `12.5`.
fn is_decimal(s: &str) -> bool {
    match s.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(s),
    }
}

/// Parses a time as plain seconds (`90`, `90.5`) or as
/// `[[HH:]MM:]SS[.fraction]` with two-digit fields.
pub fn parse_time(arg: &str) -> CoreResult<f64> {
    if is_decimal(arg) {
        return arg.parse::<f64>().map_err(|_| invalid("time", arg));
    }

    let fields: Vec<&str> = arg.split(':').collect();
    if fields.len() > 3 {
        return Err(invalid("time", arg));
    }

    let (last, leading) = fields.split_last().ok_or_else(|| invalid("time", arg))?;
    let whole = last.split_once('.').map_or(*last, |(w, _)| w);
    if whole.len() != 2 || !is_decimal(last) {
        return Err(invalid("time", arg));
    }
    let mut seconds: f64 = last.parse().map_err(|_| invalid("time", arg))?;

    let mut multiplier = 60.0;
    for field in leading.iter().rev() {
        if field.len() != 2 || !all_digits(field) {
            return Err(invalid("time", arg));
        }
        let value: f64 = field.parse().map_err(|_| invalid("time", arg))?;
        seconds += value * multiplier;
        multiplier *= 60.0;
    }
    Ok(seconds)
}

/// Parses `auto` or four colon-separated integers.
pub fn parse_crop(arg: &str) -> CoreResult<CropMode> {
    if arg == "auto" {
        return Ok(CropMode::Auto);
    }

    let values: Vec<u32> = arg
        .split(':')
        .map(|field| {
            if all_digits(field) {
                field.parse::<u32>().ok()
            } else {
                None
            }
        })
        .collect::<Option<_>>()
        .ok_or_else(|| invalid("crop geometry", arg))?;

    match values.as_slice() {
        [a, b, c, d] => Ok(CropMode::Manual([*a, *b, *c, *d])),
        _ => Err(invalid("crop geometry", arg)),
    }
}

/// Parses a frame rate into the `N/D` form used by the fps filter.
///
/// Accepts the common rationals, the aliases `23.976`/`film`, `pal`,
/// `29.97`/`ntsc` and `59.94`, or an integer clamped to 1..=1000.
pub fn parse_rate(arg: &str) -> CoreResult<String> {
    let rate = match arg {
        "24000/1001" | "30000/1001" | "60000/1001" | "24/1" | "25/1" => arg.to_string(),
        "23.976" | "film" => "24000/1001".to_string(),
        "pal" => "25/1".to_string(),
        "29.97" | "ntsc" => "30000/1001".to_string(),
        "59.94" => "60000/1001".to_string(),
        n if all_digits(n) => {
            let value = n.parse::<u64>().unwrap_or(u64::MAX).clamp(1, 1000);
            format!("{value}/1")
        }
        _ => return Err(invalid("frame rate", arg)),
    };
    Ok(rate)
}

/// A `--target` value: one bitrate for every tier or one for a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSpec {
    Global(u32),
    Tier(Tier, u32),
}

impl FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "2160p" => Ok(Tier::P2160),
            "1080p" => Ok(Tier::P1080),
            "720p" => Ok(Tier::P720),
            "480p" => Ok(Tier::P480),
            _ => Err(invalid("target video bitrate resolution", s)),
        }
    }
}

/// Parses `KBPS` or `TIER=KBPS` (e.g. `1080p=5000`). Bitrates below 1 are
/// raised to 1.
pub fn parse_target(arg: &str) -> CoreResult<TargetSpec> {
    let bitrate = |text: &str| -> CoreResult<u32> {
        if !all_digits(text) {
            return Err(invalid("target video bitrate", arg));
        }
        Ok(text.parse::<u32>().unwrap_or(u32::MAX).max(1))
    };

    match arg.split_once('=') {
        Some((tier, kbps)) => Ok(TargetSpec::Tier(tier.parse()?, bitrate(kbps)?)),
        None => Ok(TargetSpec::Global(bitrate(arg)?)),
    }
}

/// Checks a colon-separated `key=value` list such as the yadif, overlay and
/// x264/x265 parameter overrides.
pub fn validate_filter_params(arg: &str) -> CoreResult<()> {
    let key_char = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    let value_char = |c: char| key_char(c) || matches!(c, '.' | ',' | '(' | ')');

    for param in arg.split(':') {
        let valid = param.split_once('=').is_some_and(|(key, value)| {
            !key.is_empty()
                && !value.is_empty()
                && key.chars().all(key_char)
                && value.chars().all(value_char)
        });
        if !valid {
            return Err(CoreError::InvalidArgument(format!("invalid argument: {arg}")));
        }
    }
    Ok(())
}

impl FromStr for AudioWidth {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "mono" => Ok(AudioWidth::Mono),
            "stereo" => Ok(AudioWidth::Stereo),
            "surround" => Ok(AudioWidth::Surround),
            "original" => Ok(AudioWidth::Original),
            _ => Err(invalid("audio width", s)),
        }
    }
}

fn is_language_code(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_lowercase())
}

/// Parses `N[=WIDTH]` for the main audio track.
pub fn parse_main_audio(arg: &str) -> CoreResult<(u32, Option<AudioWidth>)> {
    let (track, width) = match arg.split_once('=') {
        Some((track, width)) => (track, Some(width)),
        None => (arg, None),
    };

    if !all_digits(track) {
        return Err(invalid("main audio argument", arg));
    }
    let ordinal = track
        .parse::<u32>()
        .map_err(|_| invalid("main audio argument", arg))?;
    let width = width
        .map(str::parse::<AudioWidth>)
        .transpose()
        .map_err(|_| invalid("main audio argument", arg))?;
    Ok((ordinal, width))
}

/// Parses `SCOPE[=WIDTH]` where the scope is a track number, a three-letter
/// language code (`all` for every language) or a title. Width defaults to
/// stereo.
pub fn parse_add_audio(arg: &str) -> CoreResult<AudioSelection> {
    let (scope, width) = match arg.rsplit_once('=') {
        Some((scope, width)) => {
            let width = width
                .parse::<AudioWidth>()
                .map_err(|_| invalid("add audio argument", arg))?;
            (scope, width)
        }
        None => (arg, AudioWidth::Stereo),
    };

    if scope.is_empty() || scope.contains('=') {
        return Err(invalid("add audio argument", arg));
    }

    let matcher = if all_digits(scope) {
        TrackMatch::Track(
            scope
                .parse()
                .map_err(|_| invalid("add audio argument", arg))?,
        )
    } else if scope == "all" {
        TrackMatch::All
    } else if is_language_code(scope) {
        TrackMatch::Language(scope.to_string())
    } else {
        TrackMatch::Title(scope.to_string())
    };
    Ok(AudioSelection::new(matcher, width))
}

/// Parses `N[=forced]`, `auto`, a language code (`all` for every language)
/// or a title.
pub fn parse_add_subtitle(arg: &str) -> CoreResult<SubtitleSelection> {
    if arg.is_empty() {
        return Err(invalid("add subtitle argument", arg));
    }

    if let Some(track) = arg.strip_suffix("=forced") {
        if all_digits(track) {
            let ordinal = track
                .parse()
                .map_err(|_| invalid("add subtitle argument", arg))?;
            return Ok(SubtitleSelection::forced_track(ordinal));
        }
    }

    let matcher = if all_digits(arg) {
        SubtitleMatch::Track(
            arg.parse()
                .map_err(|_| invalid("add subtitle argument", arg))?,
        )
    } else if arg == "auto" {
        SubtitleMatch::Auto
    } else if arg == "all" {
        SubtitleMatch::All
    } else if is_language_code(arg) {
        SubtitleMatch::Language(arg.to_string())
    } else {
        SubtitleMatch::Title(arg.to_string())
    };
    Ok(SubtitleSelection::new(matcher))
}

/// Parses a subtitle ordinal or `auto`.
pub fn parse_burn(arg: &str) -> CoreResult<BurnSelection> {
    match arg {
        "auto" => Ok(BurnSelection::Auto),
        n if all_digits(n) => n
            .parse()
            .map(BurnSelection::Track)
            .map_err(|_| invalid("subtitle track", arg)),
        _ => Err(invalid("subtitle track", arg)),
    }
}

impl FromStr for DecodeScope {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "vc1" => Ok(DecodeScope::Vc1),
            "all" => Ok(DecodeScope::All),
            "none" => Ok(DecodeScope::None),
            _ => Err(invalid("scope for automatic hardware decoder usage", s)),
        }
    }
}

impl FromStr for NvencMultipass {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "qres" => Ok(NvencMultipass::Qres),
            "fullres" => Ok(NvencMultipass::Fullres),
            _ => Err(invalid("multipass resolution argument", s)),
        }
    }
}

impl FromStr for BframeRefMode {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "each" => Ok(BframeRefMode::Each),
            "middle" => Ok(BframeRefMode::Middle),
            _ => Err(invalid("B-frames as references argument", s)),
        }
    }
}

impl FromStr for AmfQuality {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "balanced" => Ok(AmfQuality::Balanced),
            "speed" => Ok(AmfQuality::Speed),
            "quality" => Ok(AmfQuality::Quality),
            _ => Err(invalid("quality argument", s)),
        }
    }
}
