//! Human-readable stream report printed by `--scan`.

use crate::media::{StreamCatalog, StreamDescriptor};
use crate::utils::format_duration;

/// Report lines for one input: the video stream, the duration and every
/// numbered audio and subtitle track.
pub fn scan_report(catalog: &StreamCatalog, input_name: &str) -> Vec<String> {
    let mut lines = vec![catalog.filename.clone().unwrap_or_else(|| input_name.to_string())];

    if let Some(video) = catalog.video() {
        let size = match (video.width, video.height) {
            (Some(w), Some(h)) => format!("{w} x {h}"),
            _ => "unknown size".to_string(),
        };
        let mut line = format!(
            "      format = {} / {} / {} fps",
            video.codec_name,
            size,
            video.avg_frame_rate.as_deref().unwrap_or("0/0")
        );
        push_bitrate(&mut line, video);
        lines.push(line);
    }

    lines.push(format!("    duration = {}", format_duration(catalog.duration_secs())));

    for (n, stream) in catalog.audio_streams().enumerate() {
        lines.push(format!("#{} audio:", n + 1));
        let mut line = format!("      format = {}", stream.codec_name);
        if stream.codec_name == "dts" {
            if let Some(profile) = stream.profile.as_deref().filter(|p| *p != "DTS") {
                line.push_str(&format!(" ({profile})"));
            }
        }
        line.push_str(&format!(" / {}", stream.channel_description()));
        push_bitrate(&mut line, stream);
        lines.push(line);
        lines.push(format!("    language = {}", stream.language()));
        push_title(&mut lines, stream);
    }

    for (n, stream) in catalog.subtitle_streams().enumerate() {
        lines.push(format!("#{} subtitle:", n + 1));
        let mut line = format!("      format = {}", stream.codec_name);
        if let Some(frames) = stream.frame_count() {
            let unit = if frames == 1 { "frame" } else { "frames" };
            line.push_str(&format!(" / {frames} {unit}"));
        }
        lines.push(line);
        lines.push(format!("    language = {}", stream.language()));
        push_title(&mut lines, stream);

        let flags: Vec<&str> = [
            (stream.disposition.default, "default"),
            (stream.disposition.forced, "forced"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        if !flags.is_empty() {
            lines.push(format!("       flags = {}", flags.join(" / ")));
        }
    }

    lines
}

fn push_bitrate(line: &mut String, stream: &StreamDescriptor) {
    if let Some(kbps) = stream.bitrate_kbps() {
        line.push_str(&format!(" / {kbps} Kbps"));
    }
}

fn push_title(lines: &mut Vec<String>, stream: &StreamDescriptor) {
    let title = stream.title();
    if !title.is_empty() {
        lines.push(format!("       title = {title}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_stream() {
        let catalog = StreamCatalog::from_json(
            r#"{
                "streams": [
                    {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920,
                     "height": 1080, "avg_frame_rate": "24000/1001",
                     "tags": {"BPS-eng": "25000000"}},
                    {"index": 1, "codec_type": "audio", "codec_name": "dts", "profile": "DTS-HD MA",
                     "channels": 6, "channel_layout": "5.1(side)", "bit_rate": "1509000",
                     "tags": {"language": "eng", "title": "Main"}},
                    {"index": 2, "codec_type": "audio", "codec_name": "ac3", "channels": 1,
                     "tags": {"language": "fre"}},
                    {"index": 3, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
                     "disposition": {"default": 1, "forced": 1},
                     "tags": {"language": "eng", "NUMBER_OF_FRAMES": "1"}}
                ],
                "format": {"filename": "Movie.mkv", "duration": "5400.5"}
            }"#,
        )
        .unwrap();

        let lines = scan_report(&catalog, "ignored.mkv");
        assert_eq!(
            lines,
            vec![
                "Movie.mkv",
                "      format = h264 / 1920 x 1080 / 24000/1001 fps / 25000 Kbps",
                "    duration = 01:30:00.5",
                "#1 audio:",
                "      format = dts (DTS-HD MA) / 5.1(side) / 1509 Kbps",
                "    language = eng",
                "       title = Main",
                "#2 audio:",
                "      format = ac3 / 1 channel",
                "    language = fre",
                "#1 subtitle:",
                "      format = hdmv_pgs_subtitle / 1 frame",
                "    language = eng",
                "       flags = default / forced",
            ]
        );
    }
}
