//! Media probing for the rename pipeline.
//!
//! Wraps the reelname-av probe behind the [`MediaProber`] trait (so tests can
//! substitute canned results) and maps a [`MediaInfo`] onto the media-origin
//! fields of a [`Context`].

pub use reelname_av::{
    check_tool, check_tools, AudioTrack, HdrFormat, MediaInfo, ProbeBackend, ToolInfo,
    VideoTrack,
};

use std::collections::BTreeMap;
use std::path::Path;

use crate::context::{Context, Field, Origin};

/// Blocking structural probe of a media file.
///
/// Implementations are called from the blocking thread pool.
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> reelname_av::Result<MediaInfo>;
}

/// Probes with the external tools (`mediainfo`, `ffprobe`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolProber {
    backend: ProbeBackend,
}

impl ToolProber {
    pub fn new(backend: ProbeBackend) -> Self {
        Self { backend }
    }
}

impl MediaProber for ToolProber {
    fn probe(&self, path: &Path) -> reelname_av::Result<MediaInfo> {
        reelname_av::probe_with(path, self.backend)
    }
}

/// Replace the media-origin fields of `ctx` with facts from `info`.
pub fn apply_media_info(info: &MediaInfo, ctx: &mut Context) {
    ctx.clear_origin(Origin::Media);

    if let Some(video) = info.primary_video() {
        if !video.codec.is_empty() {
            ctx.set(Field::VideoFormat, video.codec.as_str());
        }
        ctx.set_opt(Field::VideoCodec, video.encoder.as_deref().map(encoder_name));
        if video.width > 0 && video.height > 0 {
            ctx.set(Field::Resolution, format!("{}x{}", video.width, video.height));
            ctx.set(Field::Width, video.width);
            ctx.set(Field::Height, video.height);
            ctx.set(Field::VideoStandard, video.standard_format());
            ctx.set(Field::Definition, video.definition_class());
        }
        ctx.set_opt(Field::BitDepth, video.bit_depth.map(u32::from));
        ctx.set_opt(Field::FrameRate, video.frame_rate.map(format_fps));
        if let Some(hdr) = video.hdr_format {
            ctx.set(Field::Hdr, hdr.to_string());
            if hdr == HdrFormat::DolbyVision {
                ctx.set(Field::DolbyVision, "Dolby Vision");
            }
        }
    }

    if let Some(audio) = info.primary_audio() {
        if !audio.codec.is_empty() {
            ctx.set(Field::AudioCodec, audio.codec.as_str());
        }
        if audio.channels > 0 {
            ctx.set(Field::Channels, audio.channel_label());
            ctx.set(Field::AudioChannelCount, format!("{}ch", audio.channels));
        }
        ctx.set_opt(Field::SampleRate, audio.sample_rate.map(format_khz));
    }

    if let Some(duration) = info.duration {
        let secs = duration.as_secs();
        ctx.set(Field::Seconds, secs as i64);
        ctx.set(Field::Minutes, (secs / 60) as i64);
        ctx.set(Field::Hours, format!("{}:{:02}", secs / 3600, (secs / 60) % 60));
    }

    if info.file_size > 0 {
        ctx.set(Field::Megabytes, format!("{} MB", info.file_size / 1_000_000));
        ctx.set(
            Field::Gigabytes,
            format!("{:.1} GB", info.file_size as f64 / 1_000_000_000.0),
        );
    }

    ctx.set(Field::AudioLanguages, info.audio_languages());
    ctx.set(Field::TextLanguages, info.subtitle_languages());

    let mut media = BTreeMap::from([
        ("container".to_string(), info.container.clone()),
        ("size".to_string(), info.file_size.to_string()),
        ("video".to_string(), info.video_tracks.len().to_string()),
        ("audio".to_string(), info.audio_tracks.len().to_string()),
        ("text".to_string(), info.subtitle_tracks.len().to_string()),
    ]);
    if let Some(duration) = info.duration {
        media.insert("duration".to_string(), duration.as_secs().to_string());
    }
    if let Some(profile) = info.primary_video().and_then(|v| v.dolby_vision_profile) {
        media.insert("dovi_profile".to_string(), profile.to_string());
    }
    ctx.set(Field::MediaProperties, media);
}

/// `x265 - 3.5+1` style library strings keep only the library name.
fn encoder_name(raw: &str) -> String {
    let name = raw
        .split(" - ")
        .next()
        .unwrap_or(raw)
        .split_whitespace()
        .last()
        .unwrap_or(raw);
    name.strip_prefix("lib").unwrap_or(name).to_string()
}

fn format_fps(fps: f64) -> String {
    let rounded = format!("{:.3}", fps);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} fps")
}

fn format_khz(hz: u32) -> String {
    let khz = format!("{:.1}", f64::from(hz) / 1000.0);
    format!("{} kHz", khz.trim_end_matches(".0"))
}
