//! Path utilities for discovery and destination building.
//!
//! These helpers are shared by the batch loader (hidden entries, extension
//! filters, the common base directory) and the template renderer (turning a
//! rendered string into a single safe path component).

use std::path::{Component, Path, PathBuf};

/// Characters that are stripped from every rendered path component.
pub const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '"', '?', '<', '>', '|'];

/// Check whether a path's final component is dot-prefixed.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelname_common::paths::is_hidden;
///
/// assert!(is_hidden(Path::new("/media/.DS_Store")));
/// assert!(is_hidden(Path::new(".git")));
/// assert!(!is_hidden(Path::new("/media/Show.S01E01.mkv")));
/// ```
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Check whether a path's extension is in `extensions` (case-insensitive).
///
/// An empty list accepts every path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelname_common::paths::has_extension;
///
/// let video = vec!["mkv".to_string(), "mp4".to_string()];
/// assert!(has_extension(Path::new("a.MKV"), &video));
/// assert!(!has_extension(Path::new("a.srt"), &video));
/// assert!(has_extension(Path::new("a.srt"), &[]));
/// ```
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Longest directory shared by every file in `files`.
///
/// The parent directory of each file is used, so a single file yields its own
/// directory rather than itself. Returns `None` for an empty slice.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use reelname_common::paths::common_base;
///
/// let files = vec![
///     PathBuf::from("/media/tv/Show/S01/a.mkv"),
///     PathBuf::from("/media/tv/Show/S02/b.mkv"),
/// ];
/// assert_eq!(common_base(&files), Some(PathBuf::from("/media/tv/Show")));
///
/// let single = vec![PathBuf::from("/media/movies/Movie.2019.mkv")];
/// assert_eq!(common_base(&single), Some(PathBuf::from("/media/movies")));
/// ```
pub fn common_base(files: &[PathBuf]) -> Option<PathBuf> {
    let mut parents = files
        .iter()
        .map(|file| file.parent().unwrap_or_else(|| Path::new("")));

    let first = parents.next()?;
    let mut shared: Vec<Component<'_>> = first.components().collect();

    for parent in parents {
        let matching = shared
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| *a == b)
            .count();
        shared.truncate(matching);
    }

    Some(shared.iter().collect())
}

/// Strip filesystem-illegal characters from a rendered component.
///
/// Control characters are removed as well, and surrounding whitespace is
/// trimmed.
///
/// # Examples
///
/// ```
/// use reelname_common::paths::sanitize_component;
///
/// assert_eq!(sanitize_component("Marvel's Agents of S.H.I.E.L.D."), "Marvel's Agents of S.H.I.E.L.D.");
/// assert_eq!(sanitize_component("What If...?"), "What If...");
/// assert_eq!(sanitize_component("AC/DC: Live"), "ACDC Live");
/// ```
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether a sanitised component must be dropped from a destination path.
///
/// Empty components and the relative markers `.`/`..` would either collapse
/// or escape the base directory.
pub fn is_unusable_component(component: &str) -> bool {
    component.is_empty() || component == "." || component == ".."
}
