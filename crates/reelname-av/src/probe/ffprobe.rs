//! FFprobe-based media probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_long_name: Option<String>,
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    bits_per_raw_sample: Option<String>,
    color_transfer: Option<String>,
    channels: Option<u32>,
    channel_layout: Option<String>,
    sample_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
    #[serde(alias = "ENCODER")]
    encoder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    side_data_type: Option<String>,
    dv_profile: Option<u8>,
}

/// Probe a media file using ffprobe.
pub fn probe_with_ffprobe(path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_json(path, &json_str)
}

fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let format = output
        .format
        .ok_or_else(|| Error::parse_error("ffprobe", "no format section"))?;

    let duration = format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64);

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        file_size: format.size.and_then(|s| s.parse().ok()).unwrap_or(0),
        container: container_name(&format.format_name, format.format_long_name.as_deref()),
        duration,
        video_tracks: Vec::new(),
        audio_tracks: Vec::new(),
        subtitle_tracks: Vec::new(),
    };

    for stream in output.streams {
        match stream.codec_type.as_str() {
            "video" => {
                let dovi = stream
                    .side_data_list
                    .iter()
                    .find(|sd| sd.side_data_type.as_deref() == Some("DOVI configuration record"));

                let hdr_format = if dovi.is_some() {
                    Some(HdrFormat::DolbyVision)
                } else {
                    match stream.color_transfer.as_deref() {
                        Some("smpte2084") => Some(HdrFormat::Hdr10),
                        Some("arib-std-b67") => Some(HdrFormat::Hlg),
                        _ => None,
                    }
                };

                info.video_tracks.push(VideoTrack {
                    index: info.video_tracks.len() as u32,
                    codec: stream.codec_name.unwrap_or_default(),
                    encoder: stream.tags.encoder,
                    width: stream.width.unwrap_or(0),
                    height: stream.height.unwrap_or(0),
                    frame_rate: stream.r_frame_rate.and_then(|s| parse_frame_rate(&s)),
                    bit_depth: parse_bit_depth(
                        stream.bits_per_raw_sample.as_deref(),
                        stream.pix_fmt.as_deref(),
                    ),
                    hdr_format,
                    dolby_vision_profile: dovi.and_then(|sd| sd.dv_profile),
                });
            }
            "audio" => {
                info.audio_tracks.push(AudioTrack {
                    index: info.audio_tracks.len() as u32,
                    codec: stream.codec_name.unwrap_or_default(),
                    channels: stream.channels.unwrap_or(2),
                    channel_layout: stream.channel_layout,
                    sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                    language: stream.tags.language,
                    title: stream.tags.title,
                    default: stream.disposition.default == 1,
                });
            }
            "subtitle" => {
                info.subtitle_tracks.push(SubtitleTrack {
                    index: info.subtitle_tracks.len() as u32,
                    codec: stream.codec_name.unwrap_or_default(),
                    language: stream.tags.language,
                    title: stream.tags.title,
                    default: stream.disposition.default == 1,
                    forced: stream.disposition.forced == 1,
                });
            }
            _ => {}
        }
    }

    Ok(info)
}

/// ffprobe reports demuxer lists like `matroska,webm`; map the common ones to
/// the names mediainfo uses so both backends agree.
fn container_name(format_name: &str, long_name: Option<&str>) -> String {
    match format_name.split(',').next().unwrap_or_default() {
        "matroska" => "Matroska".to_string(),
        "mov" => "MPEG-4".to_string(),
        "avi" => "AVI".to_string(),
        "mpegts" => "MPEG-TS".to_string(),
        other => long_name.unwrap_or(other).to_string(),
    }
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    rate_str.parse().ok()
}

fn parse_bit_depth(raw_sample: Option<&str>, pix_fmt: Option<&str>) -> Option<u8> {
    if let Some(depth) = raw_sample.and_then(|s| s.parse().ok()) {
        return Some(depth);
    }
    let pix_fmt = pix_fmt?;
    if pix_fmt.contains("12le") || pix_fmt.contains("12be") {
        Some(12)
    } else if pix_fmt.contains("10le") || pix_fmt.contains("10be") {
        Some(10)
    } else {
        Some(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.976023976023978));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn test_parse_bit_depth() {
        assert_eq!(parse_bit_depth(Some("10"), None), Some(10));
        assert_eq!(parse_bit_depth(None, Some("yuv420p10le")), Some(10));
        assert_eq!(parse_bit_depth(None, Some("yuv420p")), Some(8));
        assert_eq!(parse_bit_depth(None, None), None);
    }

    #[test]
    fn test_container_name() {
        assert_eq!(container_name("matroska,webm", None), "Matroska");
        assert_eq!(container_name("mov,mp4,m4a,3gp,3g2,mj2", None), "MPEG-4");
        assert_eq!(container_name("flv", Some("FLV (Flash Video)")), "FLV (Flash Video)");
    }

    #[test]
    fn test_parse_sample_output() {
        let json = r#"{
            "format": {"filename": "a.mkv", "format_name": "matroska,webm", "duration": "60.5", "size": "1000"},
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 2160,
                 "r_frame_rate": "24000/1001", "pix_fmt": "yuv420p10le", "color_transfer": "smpte2084",
                 "tags": {"ENCODER": "Lavc60.3.100 libx265"}},
                {"index": 1, "codec_type": "audio", "codec_name": "eac3", "channels": 6,
                 "channel_layout": "5.1(side)", "sample_rate": "48000",
                 "disposition": {"default": 1}, "tags": {"language": "eng"}}
            ]
        }"#;
        let info = parse_ffprobe_json(Path::new("a.mkv"), json).unwrap();
        assert_eq!(info.container, "Matroska");
        assert_eq!(info.file_size, 1000);

        let video = info.primary_video().unwrap();
        assert_eq!(video.bit_depth, Some(10));
        assert_eq!(video.hdr_format, Some(HdrFormat::Hdr10));
        assert_eq!(video.encoder.as_deref(), Some("Lavc60.3.100 libx265"));

        let audio = info.primary_audio().unwrap();
        assert_eq!(audio.channel_layout.as_deref(), Some("5.1(side)"));
        assert_eq!(audio.language.as_deref(), Some("eng"));
    }

    #[test]
    fn test_parse_dovi_side_data() {
        let json = r#"{
            "format": {"format_name": "matroska,webm"},
            "streams": [
                {"codec_type": "video", "codec_name": "hevc", "width": 1920, "height": 1080,
                 "side_data_list": [{"side_data_type": "DOVI configuration record", "dv_profile": 8}]}
            ]
        }"#;
        let info = parse_ffprobe_json(Path::new("a.mkv"), json).unwrap();
        let video = info.primary_video().unwrap();
        assert_eq!(video.hdr_format, Some(HdrFormat::DolbyVision));
        assert_eq!(video.dolby_vision_profile, Some(8));
    }
}
