//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use reelname::probe::{MediaInfo, MediaProber};
use reelname::template::{TemplateSet, Templates};
use reelname_av::VideoTrack;
use tempfile::TempDir;

/// Temporary media directory holding empty files.
///
/// `tempfile::tempdir()` names start with a dot, which discovery skips.
pub fn media_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix("reelname-")
        .tempdir()
        .unwrap();
    for name in names {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
    dir
}

pub fn templates(series: &[&str], movie: &[&str]) -> Templates {
    Templates {
        series: TemplateSet::compile(series).unwrap(),
        movie: TemplateSet::compile(movie).unwrap(),
    }
}

fn sample_info(path: &Path) -> MediaInfo {
    MediaInfo {
        file_path: path.to_path_buf(),
        file_size: 0,
        container: "Matroska".into(),
        duration: Some(Duration::from_secs(1500)),
        video_tracks: vec![VideoTrack {
            index: 0,
            codec: "HEVC".into(),
            encoder: Some("x265".into()),
            width: 1920,
            height: 1080,
            frame_rate: Some(23.976),
            bit_depth: Some(10),
            hdr_format: None,
            dolby_vision_profile: None,
        }],
        audio_tracks: vec![],
        subtitle_tracks: vec![],
    }
}

/// Answers every probe immediately with a 1080p HEVC stream.
#[derive(Default)]
pub struct StubProber {
    calls: AtomicU32,
}

impl StubProber {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaProber for StubProber {
    fn probe(&self, path: &Path) -> reelname_av::Result<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_info(path))
    }
}

/// Blocks every probe until [`GatedProber::release`] is called.
#[derive(Default)]
pub struct GatedProber {
    released: Mutex<bool>,
    cv: Condvar,
    calls: AtomicU32,
}

impl GatedProber {
    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.cv.notify_all();
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaProber for GatedProber {
    fn probe(&self, path: &Path) -> reelname_av::Result<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.released.lock().unwrap();
        let _released = self.cv.wait_while(guard, |released| !*released).unwrap();
        Ok(sample_info(path))
    }
}
