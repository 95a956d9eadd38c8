//! Media file probing.
//!
//! Two CLI backends are supported: `mediainfo` (preferred) and `ffprobe`.
//! Whichever backend answers, a result without a video track is rejected:
//! the rename pipeline treats that as a container it cannot analyse.

mod ffprobe;
mod mediainfo;
mod types;

pub use ffprobe::probe_with_ffprobe;
pub use mediainfo::probe_with_mediainfo;
pub use types::*;

use crate::{Error, ProbeBackend, Result};
use std::path::Path;

/// Probe a media file using the best available backend.
pub fn probe(path: &Path) -> Result<MediaInfo> {
    probe_with(path, ProbeBackend::Auto)
}

/// Probe a media file using a specific backend.
pub fn probe_with(path: &Path, backend: ProbeBackend) -> Result<MediaInfo> {
    let info = match backend {
        ProbeBackend::Auto => match probe_with_mediainfo(path) {
            Ok(info) => info,
            Err(Error::FileNotFound { path }) => return Err(Error::FileNotFound { path }),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %path.display(), error = %_err, "mediainfo failed, trying ffprobe");
                probe_with_ffprobe(path)?
            }
        },
        ProbeBackend::MediaInfo => probe_with_mediainfo(path)?,
        ProbeBackend::Ffprobe => probe_with_ffprobe(path)?,
    };

    if info.video_tracks.is_empty() {
        return Err(Error::NoVideoTrack {
            path: path.to_path_buf(),
        });
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_file() {
        let err = probe(Path::new("/nonexistent/reelname/missing.mkv")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_probe_with_specific_backend_missing_file() {
        let path = Path::new("/nonexistent/reelname/missing.mkv");
        for backend in [ProbeBackend::MediaInfo, ProbeBackend::Ffprobe] {
            assert!(matches!(
                probe_with(path, backend),
                Err(Error::FileNotFound { .. })
            ));
        }
    }
}
