//! Walking a root path into the list of files to rename.

use std::path::{Path, PathBuf};

use reelname_common::paths::{has_extension, is_hidden};
use tracing::warn;
use walkdir::WalkDir;

use super::BatchError;

/// Collect the files under `root`, sorted by name within each directory.
///
/// Dot-prefixed entries below the root are skipped along with everything
/// beneath them; a dot-prefixed root yields nothing. `extensions` filters by
/// file extension when non-empty.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_file() && !root.is_dir() {
        return Err(BatchError::InvalidRoot(root.to_path_buf()));
    }
    if is_hidden(root) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if !has_extension(entry.path(), extensions) {
            continue;
        }
        files.push(entry.into_path());
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // tempdir() names start with a dot, which discovery treats as hidden.
    fn tempdir() -> std::io::Result<TempDir> {
        tempfile::Builder::new().prefix("reelname-").tempdir()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_recurses_and_sorts() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.mkv"));
        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("Season 2/c.mkv"));

        let files = discover(dir.path(), &[]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("Season 2/c.mkv"),
                PathBuf::from("a.mkv"),
                PathBuf::from("b.mkv"),
            ]
        );
    }

    #[test]
    fn test_discover_skips_hidden_entries() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Show.S01E01.mkv"));
        touch(&dir.path().join(".DS_Store"));
        touch(&dir.path().join(".cache/Show.S01E02.mkv"));

        let files = discover(dir.path(), &[]).unwrap();
        assert_eq!(files, vec![dir.path().join("Show.S01E01.mkv")]);
    }

    #[test]
    fn test_discover_hidden_root_is_empty() {
        let dir = tempdir().unwrap();
        let hidden = dir.path().join(".partial");
        touch(&hidden.join("a.mkv"));
        assert!(discover(&hidden, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Movie.2019.mkv");
        touch(&file);
        assert_eq!(discover(&file, &[]).unwrap(), vec![file]);
    }

    #[test]
    fn test_discover_extension_filter() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("a.nfo"));

        let files = discover(dir.path(), &["mkv".to_string()]).unwrap();
        assert_eq!(files, vec![dir.path().join("a.mkv")]);
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover(&missing, &[]),
            Err(BatchError::InvalidRoot(p)) if p == missing
        ));
    }
}
