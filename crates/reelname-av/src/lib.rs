//! # reelname-av
//!
//! Structural probing of media files.
//!
//! The rename pipeline only needs a handful of facts about a file (resolution,
//! bit depth, codecs, channel layout, duration). This crate extracts them by
//! running external tools and normalising their JSON output into
//! [`MediaInfo`]:
//!
//! - `mediainfo --Output=JSON` (preferred, exposes the encoder library name)
//! - `ffprobe -print_format json` (fallback)
//!
//! ## Features
//!
//! - `tracing` - Log backend fallbacks
//!
//! ## Example
//!
//! ```no_run
//! use reelname_av::probe;
//!
//! let info = probe("/path/to/video.mkv")?;
//! if let Some(video) = info.primary_video() {
//!     println!("{}x{} {}", video.width, video.height, video.codec);
//! }
//! # Ok::<(), reelname_av::Error>(())
//! ```

mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use probe::{AudioTrack, HdrFormat, MediaInfo, SubtitleTrack, VideoTrack};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};

use serde::{Deserialize, Serialize};

/// Probe a media file and return its metadata.
///
/// Tries mediainfo first and falls back to ffprobe.
pub fn probe<P: AsRef<std::path::Path>>(path: P) -> Result<MediaInfo> {
    probe::probe(path.as_ref())
}

/// Probe a media file using a specific backend.
pub fn probe_with<P: AsRef<std::path::Path>>(path: P, backend: ProbeBackend) -> Result<MediaInfo> {
    probe::probe_with(path.as_ref(), backend)
}

/// Backend to use for probing media files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// Try mediainfo, then ffprobe.
    #[default]
    Auto,
    /// Use mediainfo CLI (parses JSON output).
    MediaInfo,
    /// Use ffprobe CLI (parses JSON output).
    Ffprobe,
}

impl std::fmt::Display for ProbeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeBackend::Auto => write!(f, "auto"),
            ProbeBackend::MediaInfo => write!(f, "mediainfo"),
            ProbeBackend::Ffprobe => write!(f, "ffprobe"),
        }
    }
}
