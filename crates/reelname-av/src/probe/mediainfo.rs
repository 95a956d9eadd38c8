//! MediaInfo-based media probing.
//!
//! MediaInfo exposes the encoder library name and the speaker layout, which
//! ffprobe only reports for some containers.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct MediaInfoOutput {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<MediaInfoTrack>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaInfoTrack {
    #[serde(rename = "@type")]
    track_type: String,
    #[serde(rename = "Format")]
    format: Option<String>,
    #[serde(rename = "FileSize")]
    file_size: Option<String>,
    #[serde(rename = "Duration")]
    duration: Option<String>,
    #[serde(rename = "Encoded_Library_Name")]
    encoded_library_name: Option<String>,
    #[serde(rename = "Width")]
    width: Option<String>,
    #[serde(rename = "Height")]
    height: Option<String>,
    #[serde(rename = "FrameRate")]
    frame_rate: Option<String>,
    #[serde(rename = "BitDepth")]
    bit_depth: Option<String>,
    #[serde(rename = "HDR_Format")]
    hdr_format: Option<String>,
    #[serde(rename = "HDR_Format_Profile")]
    hdr_format_profile: Option<String>,
    #[serde(rename = "Channels")]
    channels: Option<String>,
    #[serde(rename = "ChannelLayout")]
    channel_layout: Option<String>,
    #[serde(rename = "SamplingRate")]
    sample_rate: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Default")]
    default: Option<String>,
    #[serde(rename = "Forced")]
    forced: Option<String>,
}

/// Probe a media file using mediainfo.
pub fn probe_with_mediainfo(path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = Command::new("mediainfo")
        .args(["--Output=JSON"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("mediainfo")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("mediainfo", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("mediainfo", format!("Invalid UTF-8: {}", e)))?;

    parse_mediainfo_json(path, &json_str)
}

fn parse_mediainfo_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: MediaInfoOutput = serde_json::from_str(json)?;
    // mediainfo reports `"media": null` for files it cannot open as media
    let media = output
        .media
        .ok_or_else(|| Error::parse_error("mediainfo", "no media section"))?;

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        file_size: 0,
        container: String::new(),
        duration: None,
        video_tracks: Vec::new(),
        audio_tracks: Vec::new(),
        subtitle_tracks: Vec::new(),
    };

    for track in media.track {
        match track.track_type.as_str() {
            "General" => {
                info.container = track.format.unwrap_or_default();
                info.file_size = track.file_size.and_then(|s| s.parse().ok()).unwrap_or(0);
                info.duration = track
                    .duration
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64);
            }
            "Video" => {
                let hdr_format = parse_hdr_format(track.hdr_format.as_deref());
                let dolby_vision_profile = match hdr_format {
                    Some(HdrFormat::DolbyVision) => {
                        parse_dolby_vision_profile(track.hdr_format_profile.as_deref())
                    }
                    _ => None,
                };

                info.video_tracks.push(VideoTrack {
                    index: info.video_tracks.len() as u32,
                    codec: track.format.unwrap_or_default(),
                    encoder: track.encoded_library_name,
                    width: track.width.and_then(|s| parse_numeric(&s)).unwrap_or(0),
                    height: track.height.and_then(|s| parse_numeric(&s)).unwrap_or(0),
                    frame_rate: track.frame_rate.and_then(|s| s.parse().ok()),
                    bit_depth: track.bit_depth.and_then(|s| s.parse().ok()),
                    hdr_format,
                    dolby_vision_profile,
                });
            }
            "Audio" => {
                info.audio_tracks.push(AudioTrack {
                    index: info.audio_tracks.len() as u32,
                    codec: track.format.unwrap_or_default(),
                    channels: track.channels.and_then(|s| parse_numeric(&s)).unwrap_or(2),
                    channel_layout: track.channel_layout,
                    sample_rate: track.sample_rate.and_then(|s| parse_numeric(&s)),
                    language: track.language,
                    title: track.title,
                    default: track.default.as_deref() == Some("Yes"),
                });
            }
            "Text" => {
                info.subtitle_tracks.push(SubtitleTrack {
                    index: info.subtitle_tracks.len() as u32,
                    codec: track.format.unwrap_or_default(),
                    language: track.language,
                    title: track.title,
                    default: track.default.as_deref() == Some("Yes"),
                    forced: track.forced.as_deref() == Some("Yes"),
                });
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_numeric<T: std::str::FromStr>(s: &str) -> Option<T> {
    // "48000" and "1920 pixels" both occur depending on the mediainfo build
    s.split_whitespace().next().and_then(|n| n.parse().ok())
}

fn parse_hdr_format(hdr_str: Option<&str>) -> Option<HdrFormat> {
    let s = hdr_str?.to_lowercase();
    if s.contains("dolby vision") {
        Some(HdrFormat::DolbyVision)
    } else if s.contains("hdr10+") || s.contains("smpte st 2094") {
        Some(HdrFormat::Hdr10Plus)
    } else if s.contains("hdr10") || s.contains("smpte st 2086") {
        Some(HdrFormat::Hdr10)
    } else if s.contains("hlg") {
        Some(HdrFormat::Hlg)
    } else {
        None
    }
}

/// Extract the profile number from strings like `dvhe.08.06` or
/// `dvhe.07.06 / SMPTE ST 2086`.
fn parse_dolby_vision_profile(profile: Option<&str>) -> Option<u8> {
    profile?
        .split(['/', ','])
        .map(str::trim)
        .find(|s| s.starts_with("dvhe.") || s.starts_with("dvav.") || s.starts_with("dav1."))
        .and_then(|s| s.split('.').nth(1))
        .and_then(|p| p.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "media": {
            "@ref": "/media/Show.S01E01.mkv",
            "track": [
                {"@type": "General", "Format": "Matroska", "FileSize": "1073741824", "Duration": "2640.512"},
                {"@type": "Video", "Format": "HEVC", "Width": "1920", "Height": "1080",
                 "FrameRate": "23.976", "BitDepth": "10", "Encoded_Library_Name": "x265",
                 "HDR_Format": "Dolby Vision / SMPTE ST 2086", "HDR_Format_Profile": "dvhe.08.06 / "},
                {"@type": "Audio", "Format": "E-AC-3", "Channels": "6", "ChannelLayout": "L R C LFE Ls Rs",
                 "SamplingRate": "48000", "Language": "en", "Default": "Yes"},
                {"@type": "Text", "Format": "UTF-8", "Language": "en", "Forced": "No"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric::<u32>("1920 pixels"), Some(1920));
        assert_eq!(parse_numeric::<u32>("1080"), Some(1080));
        assert_eq!(parse_numeric::<u32>("6 channels"), Some(6));
        assert_eq!(parse_numeric::<u32>(""), None);
    }

    #[test]
    fn test_parse_hdr_format() {
        assert_eq!(
            parse_hdr_format(Some("Dolby Vision, Version 1.0")),
            Some(HdrFormat::DolbyVision)
        );
        assert_eq!(
            parse_hdr_format(Some("SMPTE ST 2086")),
            Some(HdrFormat::Hdr10)
        );
        assert_eq!(parse_hdr_format(Some("HDR10+ Profile B")), Some(HdrFormat::Hdr10Plus));
        assert_eq!(parse_hdr_format(None), None);
    }

    #[test]
    fn test_parse_dolby_vision_profile() {
        assert_eq!(parse_dolby_vision_profile(Some("dvhe.08.06 / ")), Some(8));
        assert_eq!(parse_dolby_vision_profile(Some("dvhe.05.06")), Some(5));
        assert_eq!(parse_dolby_vision_profile(Some("Main 10")), None);
    }

    #[test]
    fn test_parse_sample_output() {
        let info = parse_mediainfo_json(Path::new("/media/Show.S01E01.mkv"), SAMPLE).unwrap();
        assert_eq!(info.container, "Matroska");
        assert_eq!(info.file_size, 1_073_741_824);
        assert_eq!(info.duration.map(|d| d.as_secs()), Some(2640));

        let video = info.primary_video().unwrap();
        assert_eq!(video.codec, "HEVC");
        assert_eq!(video.encoder.as_deref(), Some("x265"));
        assert_eq!((video.width, video.height), (1920, 1080));
        assert_eq!(video.bit_depth, Some(10));
        assert_eq!(video.hdr_format, Some(HdrFormat::DolbyVision));
        assert_eq!(video.dolby_vision_profile, Some(8));

        let audio = info.primary_audio().unwrap();
        assert_eq!(audio.channels, 6);
        assert_eq!(audio.channel_layout.as_deref(), Some("L R C LFE Ls Rs"));
        assert_eq!(audio.sample_rate, Some(48000));
        assert_eq!(info.subtitle_tracks.len(), 1);
    }

    #[test]
    fn test_parse_null_media() {
        let err = parse_mediainfo_json(Path::new("x.bin"), r#"{"media": null}"#).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }
}
