//! Subtitle selection: the burned stream, the forced stream and the
//! streams carried as separate output tracks.

use super::{OutputDisposition, TrackAction, TrackPlan};
use crate::config::{BurnSelection, OutputFormat, SubtitleConfig, SubtitleMatch};
use crate::media::{StreamCatalog, StreamDescriptor};

/// The image subtitle composited into the video, if any. Automatic
/// selection takes the last forced image subtitle.
pub fn select_burn_subtitle(
    catalog: &StreamCatalog,
    burn: BurnSelection,
) -> Option<&StreamDescriptor> {
    match burn {
        BurnSelection::None => None,
        BurnSelection::Track(ordinal) => catalog
            .subtitle_track(ordinal)
            .filter(|s| s.is_image_subtitle()),
        BurnSelection::Auto => catalog
            .subtitle_streams()
            .filter(|s| s.disposition.forced && s.is_image_subtitle())
            .last(),
    }
}

/// Builds the subtitle plan, leaving out the burned stream.
pub fn build_subtitle_plan(
    catalog: &StreamCatalog,
    config: &SubtitleConfig,
    format: OutputFormat,
    burn: Option<&StreamDescriptor>,
) -> Vec<TrackPlan> {
    let mut forced: Option<&StreamDescriptor> = if config.auto_forced() {
        catalog.subtitle_streams().find(|s| s.disposition.forced)
    } else {
        None
    };

    let mut others: Vec<&StreamDescriptor> = Vec::new();
    for selection in &config.selections {
        match &selection.matcher {
            SubtitleMatch::Track(ordinal) => {
                if let Some(stream) = catalog.subtitle_track(*ordinal) {
                    if selection.forced && forced.is_none() {
                        forced = Some(stream);
                    } else {
                        others.push(stream);
                    }
                }
            }
            SubtitleMatch::Auto => {}
            SubtitleMatch::Language(language) => {
                others.extend(catalog.subtitle_streams().filter(|s| s.language() == language));
            }
            SubtitleMatch::All => others.extend(catalog.subtitle_streams()),
            SubtitleMatch::Title(pattern) => {
                let pattern = pattern.to_lowercase();
                others.extend(
                    catalog
                        .subtitle_streams()
                        .filter(|s| s.title().to_lowercase().contains(&pattern)),
                );
            }
        }
    }

    let mut ordered: Vec<&StreamDescriptor> = Vec::new();
    for stream in forced.into_iter().chain(others) {
        let burned = burn.is_some_and(|b| b.index == stream.index);
        if !burned && !ordered.iter().any(|s| s.index == stream.index) {
            ordered.push(stream);
        }
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(output_ordinal, stream)| {
            let is_forced = forced.is_some_and(|f| f.index == stream.index);
            let convert = format == OutputFormat::Mp4 && stream.codec_name == "subrip";
            let title = stream.title();

            TrackPlan {
                source_index: stream.index,
                action: if convert {
                    TrackAction::Transcode
                } else {
                    TrackAction::Copy
                },
                encoder: convert.then(|| "mov_text".to_string()),
                bitrate_kbps: None,
                channels: None,
                disposition: if is_forced {
                    OutputDisposition::DefaultForced
                } else {
                    OutputDisposition::None
                },
                output_ordinal,
                vbr_mode: None,
                resample_rate: None,
                keep_title: true,
                title: (!title.is_empty()).then(|| title.to_string()),
            }
        })
        .collect()
}

/// ffmpeg arguments for a subtitle plan, `-sn` when it is empty.
pub fn subtitle_args(plans: &[TrackPlan]) -> Vec<String> {
    if plans.is_empty() {
        return vec!["-sn".to_string()];
    }

    let mut args = Vec::new();
    for plan in plans {
        let n = plan.output_ordinal;
        args.extend(["-map".to_string(), format!("0:{}", plan.source_index)]);
        args.extend([format!("-c:s:{n}"), plan.codec_arg().to_string()]);
        args.extend([
            format!("-disposition:s:{n}"),
            plan.disposition.as_arg().to_string(),
        ]);
    }
    args
}

/// Mapping line of a subtitle track, e.g. ` 5 = subrip / force / English`.
pub fn subtitle_summary(plan: &TrackPlan, stream: &StreamDescriptor) -> String {
    let mut line = format!("{:2} = {}", plan.source_index, stream.codec_name);
    if plan.disposition == OutputDisposition::DefaultForced {
        line.push_str(" / force");
    }
    if let Some(title) = &plan.title {
        line.push_str(&format!(" / {title}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubtitleSelection;

    const CATALOG: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "ac3"},
            {"index": 2, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
             "tags": {"language": "eng"}},
            {"index": 3, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
             "disposition": {"forced": 1}, "tags": {"language": "eng", "title": "Forced"}},
            {"index": 4, "codec_type": "subtitle", "codec_name": "subrip",
             "tags": {"language": "spa", "title": "Spanish SDH"}}
        ]
    }"#;

    fn catalog() -> StreamCatalog {
        StreamCatalog::from_json(CATALOG).unwrap()
    }

    fn config(selections: Vec<SubtitleSelection>) -> SubtitleConfig {
        SubtitleConfig {
            selections,
            burn: BurnSelection::None,
        }
    }

    #[test]
    fn no_selection_means_no_subtitles() {
        let plans = build_subtitle_plan(&catalog(), &config(vec![]), OutputFormat::Mkv, None);
        assert!(plans.is_empty());
        assert_eq!(subtitle_args(&plans), vec!["-sn"]);
    }

    #[test]
    fn auto_adds_forced_track_first() {
        let selections = vec![
            SubtitleSelection::new(SubtitleMatch::Language("spa".into())),
            SubtitleSelection::new(SubtitleMatch::Auto),
        ];
        let plans = build_subtitle_plan(&catalog(), &config(selections), OutputFormat::Mkv, None);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].source_index, 3);
        assert_eq!(plans[0].disposition, OutputDisposition::DefaultForced);
        assert_eq!(plans[1].source_index, 4);
        assert_eq!(plans[1].disposition, OutputDisposition::None);
        assert_eq!(
            subtitle_args(&plans),
            vec![
                "-map", "0:3", "-c:s:0", "copy", "-disposition:s:0", "default+forced",
                "-map", "0:4", "-c:s:1", "copy", "-disposition:s:1", "0"
            ]
        );
    }

    #[test]
    fn explicit_forced_track() {
        let selections = vec![
            SubtitleSelection::forced_track(1),
            SubtitleSelection::new(SubtitleMatch::All),
        ];
        let plans = build_subtitle_plan(&catalog(), &config(selections), OutputFormat::Mkv, None);
        let indexes: Vec<u32> = plans.iter().map(|p| p.source_index).collect();
        assert_eq!(indexes, vec![2, 3, 4]);
        assert_eq!(plans[0].disposition, OutputDisposition::DefaultForced);
        assert_eq!(plans[1].disposition, OutputDisposition::None);
    }

    #[test]
    fn subrip_becomes_mov_text_in_mp4() {
        let selections = vec![SubtitleSelection::new(SubtitleMatch::Title("sdh".into()))];
        let plans = build_subtitle_plan(&catalog(), &config(selections), OutputFormat::Mp4, None);
        assert_eq!(plans[0].codec_arg(), "mov_text");
        let stream = catalog().streams[4].clone();
        assert_eq!(subtitle_summary(&plans[0], &stream), " 4 = subrip / Spanish SDH");
    }

    #[test]
    fn burned_stream_is_not_forced_on_another() {
        let catalog = catalog();
        let burn = select_burn_subtitle(&catalog, BurnSelection::Auto);
        assert_eq!(burn.map(|s| s.index), Some(3));

        let selections = vec![
            SubtitleSelection::new(SubtitleMatch::Auto),
            SubtitleSelection::new(SubtitleMatch::Language("eng".into())),
        ];
        let plans = build_subtitle_plan(&catalog, &config(selections), OutputFormat::Mkv, burn);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].source_index, 2);
        assert_eq!(plans[0].disposition, OutputDisposition::None);
        assert_eq!(plans[0].output_ordinal, 0);
    }

    #[test]
    fn auto_burn_takes_the_last_forced_image_track() {
        let catalog = StreamCatalog::from_json(
            r#"{
                "streams": [
                    {"index": 0, "codec_type": "video", "codec_name": "h264"},
                    {"index": 1, "codec_type": "subtitle", "codec_name": "dvd_subtitle",
                     "disposition": {"forced": 1}},
                    {"index": 2, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
                     "disposition": {"forced": 1}},
                    {"index": 3, "codec_type": "subtitle", "codec_name": "subrip",
                     "disposition": {"forced": 1}}
                ]
            }"#,
        )
        .unwrap();
        let burn = select_burn_subtitle(&catalog, BurnSelection::Auto);
        assert_eq!(burn.map(|s| s.index), Some(2));
    }

    #[test]
    fn burn_requires_image_subtitle() {
        let catalog = catalog();
        assert_eq!(
            select_burn_subtitle(&catalog, BurnSelection::Track(1)).map(|s| s.index),
            Some(2)
        );
        assert!(select_burn_subtitle(&catalog, BurnSelection::Track(3)).is_none());
        assert!(select_burn_subtitle(&catalog, BurnSelection::None).is_none());
    }
}
