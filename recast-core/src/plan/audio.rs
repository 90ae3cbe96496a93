//! Audio track selection and the copy-or-transcode decision per track.
//!
//! The main track always comes first and is the only default track. Each
//! selected track is either passed through, when its format already
//! satisfies the policy, or transcoded to the surround or stereo encoder.

use super::{OutputDisposition, TrackAction, TrackPlan};
use crate::config::{AudioConfig, AudioEncoders, AudioWidth, TrackMatch};
use crate::media::{StreamCatalog, StreamDescriptor};

use std::collections::HashMap;

/// Sample rate every transcoded track is converted to.
pub const OUTPUT_SAMPLE_RATE: u32 = 48000;

/// Channel count of transcoded surround output.
const SURROUND_CHANNELS: u32 = 6;

/// A stream picked by a selection, with the width it was requested at.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SelectedTrack<'a> {
    stream: &'a StreamDescriptor,
    width: AudioWidth,
    /// Selected by title, so the title is kept and reported.
    titled: bool,
}

/// Encoder, bitrate and channel count decided for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Decision {
    encoder: Option<String>,
    bitrate: Option<u32>,
    channels: Option<u32>,
}

impl Decision {
    fn copy() -> Self {
        Self {
            encoder: None,
            bitrate: None,
            channels: None,
        }
    }
}

/// Builds the audio plan. An empty plan means the output has no audio.
pub fn build_audio_plan(
    catalog: &StreamCatalog,
    config: &AudioConfig,
    encoders: &AudioEncoders,
    copy_track_names: bool,
) -> Vec<TrackPlan> {
    let (main_ordinal, main_width) = config.main();
    let Some(main) = catalog.audio_track(main_ordinal) else {
        log::debug!("Audio track {main_ordinal} not found, output has no audio");
        return Vec::new();
    };

    let selected = select_tracks(catalog, config, main, main_width);

    let mut last_decision: HashMap<u32, Decision> = HashMap::new();
    let mut plans = Vec::new();

    for track in selected {
        let decision = decide(track.stream, track.width, config, encoders);
        let index = track.stream.index;

        if last_decision.get(&index) == Some(&decision) {
            continue;
        }
        last_decision.insert(index, decision.clone());

        let action = if decision.encoder.is_some() {
            TrackAction::Transcode
        } else {
            TrackAction::Copy
        };

        let vbr_mode = config
            .fdk_vbr_mode
            .filter(|_| decision.encoder.as_deref() == Some("libfdk_aac"));
        let bitrate = if vbr_mode.is_some() {
            None
        } else {
            decision.bitrate
        };

        let resample_rate = (action == TrackAction::Transcode
            && track.stream.sample_rate != Some(OUTPUT_SAMPLE_RATE))
        .then_some(OUTPUT_SAMPLE_RATE);

        let output_ordinal = plans.len();
        plans.push(TrackPlan {
            source_index: index,
            action,
            encoder: decision.encoder,
            bitrate_kbps: bitrate,
            channels: decision.channels,
            disposition: if output_ordinal == 0 {
                OutputDisposition::Default
            } else {
                OutputDisposition::None
            },
            output_ordinal,
            vbr_mode,
            resample_rate,
            keep_title: copy_track_names || track.titled,
            title: track
                .titled
                .then(|| track.stream.title().to_string()),
        });
    }

    plans
}

/// Main track followed by the streams of each additional selection.
fn select_tracks<'a>(
    catalog: &'a StreamCatalog,
    config: &AudioConfig,
    main: &'a StreamDescriptor,
    main_width: AudioWidth,
) -> Vec<SelectedTrack<'a>> {
    let mut selected = vec![SelectedTrack {
        stream: main,
        width: main_width,
        titled: false,
    }];

    for selection in config.additional() {
        let width = selection.width;
        let others = catalog.audio_streams().filter(|s| s.index != main.index);

        match &selection.matcher {
            TrackMatch::Track(ordinal) => {
                if let Some(stream) = catalog.audio_track(*ordinal) {
                    selected.push(SelectedTrack {
                        stream,
                        width,
                        titled: false,
                    });
                }
            }
            TrackMatch::Language(language) => {
                selected.extend(others.filter(|s| s.language() == language).map(|stream| {
                    SelectedTrack {
                        stream,
                        width,
                        titled: false,
                    }
                }));
            }
            TrackMatch::All => {
                selected.extend(others.map(|stream| SelectedTrack {
                    stream,
                    width,
                    titled: false,
                }));
            }
            TrackMatch::Title(pattern) => {
                let pattern = pattern.to_lowercase();
                selected.extend(
                    others
                        .filter(|s| s.title().to_lowercase().contains(&pattern))
                        .map(|stream| SelectedTrack {
                            stream,
                            width,
                            titled: true,
                        }),
                );
            }
        }
    }

    let mut unique: Vec<SelectedTrack<'a>> = Vec::with_capacity(selected.len());
    for track in selected {
        let duplicate = unique
            .iter()
            .any(|u| u.stream.index == track.stream.index && u.width == track.width);
        if !duplicate {
            unique.push(track);
        }
    }
    unique
}

/// Whether an AC-3-family policy allows passing `stream` through at
/// `threshold` Kbps. Unknown bitrates pass.
fn ac3_passthrough(
    stream: &StreamDescriptor,
    surround_encoder: &str,
    keep: bool,
    threshold: u64,
) -> bool {
    surround_encoder.ends_with("ac3")
        && (stream.codec_name == surround_encoder || stream.codec_name == "ac3")
        && (keep || stream.bitrate_kbps().is_none_or(|kbps| kbps <= threshold))
}

fn decide(
    stream: &StreamDescriptor,
    width: AudioWidth,
    config: &AudioConfig,
    encoders: &AudioEncoders,
) -> Decision {
    if width == AudioWidth::Original {
        return Decision::copy();
    }

    let channels = stream.channel_count();
    let dts = config.pass_dts && stream.is_dts_core();
    let surround = encoders.surround.as_str();

    if width == AudioWidth::Surround {
        let passthrough = (surround.contains("aac") && stream.codec_name == "aac")
            || ac3_passthrough(
                stream,
                surround,
                config.keep_ac3_surround,
                config.surround_threshold(),
            )
            || dts;

        if passthrough {
            return Decision::copy();
        }

        if channels > 2 {
            let (encoder, out_channels) = if surround.contains("aac") {
                let encoder = if surround == "aac_at" {
                    encoders.aac_fallback.clone()
                } else {
                    surround.to_string()
                };
                (encoder, Some(SURROUND_CHANNELS))
            } else {
                (
                    surround.to_string(),
                    (channels > SURROUND_CHANNELS).then_some(SURROUND_CHANNELS),
                )
            };

            return Decision {
                encoder: Some(encoder),
                bitrate: config.surround_bitrate,
                channels: out_channels,
            };
        }
    }

    let stereo_passthrough = channels <= 2
        && (stream.codec_name == "aac"
            || ac3_passthrough(
                stream,
                surround,
                config.keep_ac3_stereo,
                config.stereo_threshold(),
            )
            || dts);

    if stereo_passthrough {
        return Decision::copy();
    }

    let (bitrate, out_channels) = if channels > 2 {
        (config.stereo_bitrate, Some(2))
    } else if channels == 1 {
        (config.effective_mono_bitrate(), None)
    } else {
        (config.stereo_bitrate, None)
    };

    Decision {
        encoder: Some(encoders.stereo.clone()),
        bitrate,
        channels: out_channels,
    }
}

/// ffmpeg arguments for an audio plan, `-an` when it is empty.
pub fn audio_args(plans: &[TrackPlan]) -> Vec<String> {
    if plans.is_empty() {
        return vec!["-an".to_string()];
    }

    let mut args = Vec::new();
    for plan in plans {
        let n = plan.output_ordinal;
        let codec = plan.codec_arg();

        args.extend(["-map".to_string(), format!("0:{}", plan.source_index)]);
        args.extend([format!("-c:a:{n}"), codec.to_string()]);
        if codec == "aac_at" {
            args.extend([format!("-aac_at_mode:a:{n}"), "cvbr".to_string()]);
        }
        if let Some(bitrate) = plan.bitrate_kbps {
            args.extend([format!("-b:a:{n}"), format!("{bitrate}k")]);
        }
        if let Some(mode) = plan.vbr_mode {
            args.extend([format!("-vbr:a:{n}"), mode.to_string()]);
        }
        if let Some(channels) = plan.channels {
            args.extend([format!("-ac:a:{n}"), channels.to_string()]);
        }
        if let Some(rate) = plan.resample_rate {
            args.extend([format!("-ar:a:{n}"), rate.to_string()]);
        }
        if !plan.keep_title {
            args.extend([format!("-metadata:s:a:{n}"), "title=".to_string()]);
        }
        args.extend([
            format!("-disposition:a:{n}"),
            plan.disposition.as_arg().to_string(),
        ]);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioCodecPolicy, AudioSelection, EncoderInventory};

    const CATALOG: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "truehd", "channels": 8,
             "sample_rate": "48000", "tags": {"language": "eng", "title": "Surround 7.1"}},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3", "channels": 6,
             "bit_rate": "448000", "sample_rate": "48000", "tags": {"language": "eng"}},
            {"index": 3, "codec_type": "audio", "codec_name": "ac3", "channels": 2,
             "bit_rate": "192000", "sample_rate": "48000",
             "tags": {"language": "eng", "title": "Director Commentary"}},
            {"index": 4, "codec_type": "audio", "codec_name": "mp2", "channels": 1,
             "sample_rate": "44100", "tags": {"language": "fre"}}
        ],
        "format": {"duration": "5400"}
    }"#;

    fn catalog() -> StreamCatalog {
        StreamCatalog::from_json(CATALOG).unwrap()
    }

    fn encoders(names: &[&str], policy: AudioCodecPolicy) -> AudioEncoders {
        AudioEncoders::resolve(policy, &EncoderInventory::from_names(names.iter().copied()))
    }

    fn config_with(selections: Vec<AudioSelection>) -> AudioConfig {
        let mut config = AudioConfig::default();
        config.selections.extend(selections);
        config
    }

    #[test]
    fn lossless_surround_is_transcoded_to_ac3() {
        let plans = build_audio_plan(
            &catalog(),
            &AudioConfig::default(),
            &encoders(&["aac"], AudioCodecPolicy::Ac3),
            false,
        );
        assert_eq!(plans.len(), 1);
        let main = &plans[0];
        assert_eq!(main.codec_arg(), "ac3");
        assert_eq!(main.channels, Some(6));
        assert_eq!(main.disposition, OutputDisposition::Default);
        assert_eq!(main.resample_rate, None);
        assert_eq!(
            audio_args(&plans),
            vec![
                "-map", "0:1", "-c:a:0", "ac3", "-ac:a:0", "6", "-metadata:s:a:0", "title=",
                "-disposition:a:0", "default"
            ]
        );
    }

    #[test]
    fn ac3_surround_passes_through() {
        let mut config = AudioConfig::default();
        config.selections[0] = AudioSelection::new(TrackMatch::Track(2), AudioWidth::Surround);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        assert_eq!(plans[0].action, TrackAction::Copy);

        config.keep_ac3_surround = false;
        config.surround_bitrate = Some(384);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        assert_eq!(plans[0].action, TrackAction::Transcode);
        assert_eq!(plans[0].bitrate_kbps, Some(384));
    }

    #[test]
    fn stereo_width_downmixes() {
        let mut config = AudioConfig::default();
        config.selections[0] = AudioSelection::new(TrackMatch::Track(1), AudioWidth::Stereo);
        let plans = build_audio_plan(
            &catalog(),
            &config,
            &encoders(&["aac_at"], AudioCodecPolicy::Ac3),
            false,
        );
        assert_eq!(plans[0].codec_arg(), "aac_at");
        assert_eq!(plans[0].channels, Some(2));
        let args = audio_args(&plans);
        assert!(args.windows(2).any(|w| w == ["-aac_at_mode:a:0", "cvbr"]));
        assert_eq!(plans[0].to_string(), " 1 = aac_at / stereo");
    }

    #[test]
    fn aac_surround_uses_fallback_encoder() {
        let plans = build_audio_plan(
            &catalog(),
            &AudioConfig::default(),
            &encoders(&["aac_at", "libfdk_aac"], AudioCodecPolicy::AacOnly),
            false,
        );
        assert_eq!(plans[0].codec_arg(), "libfdk_aac");
        assert_eq!(plans[0].channels, Some(6));
    }

    #[test]
    fn title_selection_keeps_title() {
        let config = config_with(vec![AudioSelection::new(
            TrackMatch::Title("commentary".into()),
            AudioWidth::Stereo,
        )]);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        assert_eq!(plans.len(), 2);
        let commentary = &plans[1];
        assert_eq!(commentary.source_index, 3);
        assert_eq!(commentary.action, TrackAction::Copy);
        assert_eq!(commentary.disposition, OutputDisposition::None);
        assert!(commentary.keep_title);
        assert_eq!(commentary.title.as_deref(), Some("Director Commentary"));
    }

    #[test]
    fn language_selection_excludes_main() {
        let config = config_with(vec![AudioSelection::new(
            TrackMatch::Language("eng".into()),
            AudioWidth::Stereo,
        )]);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        let indexes: Vec<u32> = plans.iter().map(|p| p.source_index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(plans[1].output_ordinal, 1);
        assert_eq!(plans[1].channels, Some(2));
    }

    #[test]
    fn mono_track_gets_mono_bitrate_and_resampling() {
        let mut config = config_with(vec![AudioSelection::new(
            TrackMatch::Track(4),
            AudioWidth::Stereo,
        )]);
        config.stereo_bitrate = Some(128);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        let mono = &plans[1];
        assert_eq!(mono.codec_arg(), "aac");
        assert_eq!(mono.bitrate_kbps, Some(64));
        assert_eq!(mono.resample_rate, Some(48000));
    }

    #[test]
    fn same_configuration_is_not_repeated() {
        let config = config_with(vec![
            AudioSelection::new(TrackMatch::Track(1), AudioWidth::Stereo),
            AudioSelection::new(TrackMatch::Track(1), AudioWidth::Surround),
        ]);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].channels, Some(6));
        assert_eq!(plans[1].channels, Some(2));
    }

    #[test]
    fn fdk_vbr_replaces_bitrate() {
        let mut config = AudioConfig::default();
        config.selections[0] = AudioSelection::new(TrackMatch::Track(1), AudioWidth::Stereo);
        config.stereo_bitrate = Some(160);
        config.fdk_vbr_mode = Some(4);
        let plans = build_audio_plan(
            &catalog(),
            &config,
            &encoders(&["libfdk_aac"], AudioCodecPolicy::Ac3),
            false,
        );
        assert_eq!(plans[0].bitrate_kbps, None);
        assert_eq!(plans[0].vbr_mode, Some(4));
        assert!(audio_args(&plans).windows(2).any(|w| w == ["-vbr:a:0", "4"]));
    }

    #[test]
    fn missing_main_track_means_no_audio() {
        let mut config = AudioConfig::default();
        config.selections[0] = AudioSelection::new(TrackMatch::Track(9), AudioWidth::Surround);
        let plans = build_audio_plan(&catalog(), &config, &encoders(&[], AudioCodecPolicy::Ac3), false);
        assert!(plans.is_empty());
        assert_eq!(audio_args(&plans), vec!["-an"]);
    }
}
