//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Structural facts about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format (e.g., "Matroska", "MPEG-4").
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
    /// Audio tracks in the file.
    pub audio_tracks: Vec<AudioTrack>,
    /// Subtitle tracks in the file.
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index.
    pub index: u32,
    /// Video format (e.g., "HEVC", "AVC").
    pub codec: String,
    /// Encoder library that produced the stream (e.g., "x265").
    pub encoder: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// Bit depth (e.g., 8, 10, 12).
    pub bit_depth: Option<u8>,
    /// HDR format if present.
    pub hdr_format: Option<HdrFormat>,
    /// Dolby Vision profile when the stream carries Dolby Vision.
    pub dolby_vision_profile: Option<u8>,
}

/// HDR format types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HdrFormat {
    /// HDR10 (static metadata).
    Hdr10,
    /// HDR10+ (dynamic metadata).
    Hdr10Plus,
    /// Dolby Vision.
    DolbyVision,
    /// Hybrid Log-Gamma.
    Hlg,
}

/// Information about an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Track index.
    pub index: u32,
    /// Audio codec (e.g., "AAC", "E-AC-3").
    pub codec: String,
    /// Number of channels.
    pub channels: u32,
    /// Channel layout as reported by the tool (e.g., "L R C LFE Ls Rs").
    pub channel_layout: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Language code (e.g., "eng", "spa").
    pub language: Option<String>,
    /// Track title.
    pub title: Option<String>,
    /// Whether this is the default track.
    pub default: bool,
}

/// Information about a subtitle track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Track index.
    pub index: u32,
    /// Subtitle format (e.g., "SRT", "PGS", "ASS").
    pub codec: String,
    /// Language code (e.g., "eng", "spa").
    pub language: Option<String>,
    /// Track title.
    pub title: Option<String>,
    /// Whether this is the default track.
    pub default: bool,
    /// Whether this is a forced track.
    pub forced: bool,
}

impl MediaInfo {
    /// Get the primary (first) video track.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }

    /// Get the primary audio track: the default one, else the first.
    pub fn primary_audio(&self) -> Option<&AudioTrack> {
        self.audio_tracks
            .iter()
            .find(|a| a.default)
            .or_else(|| self.audio_tracks.first())
    }

    /// Distinct audio languages in track order.
    pub fn audio_languages(&self) -> Vec<String> {
        distinct(self.audio_tracks.iter().filter_map(|a| a.language.as_deref()))
    }

    /// Distinct subtitle languages in track order.
    pub fn subtitle_languages(&self) -> Vec<String> {
        distinct(
            self.subtitle_tracks
                .iter()
                .filter_map(|s| s.language.as_deref()),
        )
    }
}

impl VideoTrack {
    /// Standard video format label such as `1080p` or `2160p`.
    ///
    /// Widescreen encodes are cropped vertically, so the width is consulted
    /// as well as the height.
    pub fn standard_format(&self) -> String {
        let (w, h) = (self.width, self.height);
        let label = if w >= 7680 || h >= 4320 {
            "4320p"
        } else if w >= 3840 || h >= 2160 {
            "2160p"
        } else if w >= 1920 || h >= 1080 {
            "1080p"
        } else if w >= 1280 || h >= 720 {
            "720p"
        } else if h >= 576 {
            "576p"
        } else if h >= 480 {
            "480p"
        } else {
            return format!("{h}p");
        };
        label.to_string()
    }

    /// Definition class: `UHD`, `HD` or `SD`.
    pub fn definition_class(&self) -> &'static str {
        if self.width >= 3840 || self.height >= 2160 {
            "UHD"
        } else if self.width >= 1280 || self.height >= 720 {
            "HD"
        } else {
            "SD"
        }
    }
}

impl AudioTrack {
    /// Speaker layout label such as `5.1` or `2.0`.
    pub fn channel_label(&self) -> String {
        match self.channels {
            0 => String::new(),
            3 => "2.1".to_string(),
            n @ 6..=8 => format!("{}.1", n - 1),
            n => format!("{n}.0"),
        }
    }
}

impl std::fmt::Display for HdrFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HdrFormat::Hdr10 => write!(f, "HDR10"),
            HdrFormat::Hdr10Plus => write!(f, "HDR10+"),
            HdrFormat::DolbyVision => write!(f, "Dolby Vision"),
            HdrFormat::Hlg => write!(f, "HLG"),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
