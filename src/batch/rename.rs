//! Rename planning and application.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::file::{MediaFile, ResolveError};

/// A per-file failure while applying renames.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("{} is also the destination of {}", .destination.display(), .other.display())]
    Conflict { destination: PathBuf, other: PathBuf },

    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What applying would do to one file.
#[derive(Debug)]
pub enum PlanStatus {
    /// Will be moved to this destination.
    Move(PathBuf),
    /// Already at its destination.
    Unchanged,
    /// Not renamed (no match, failed probe, unrenderable path).
    Skipped(ResolveError),
    /// Would collide with another file or an existing path.
    Blocked(RenameError),
}

#[derive(Debug)]
pub struct RenamePlan {
    pub file: MediaFile,
    pub status: PlanStatus,
}

impl RenamePlan {
    pub fn source(&self) -> &Path {
        self.file.path()
    }
}

/// Outcome of [`super::Batch::apply_renames`].
#[derive(Debug, Default)]
pub struct RenameReport {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, RenameError)>,
}

impl RenameReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run the consistency checks over resolved destinations.
pub(crate) fn check_plans(resolved: Vec<(MediaFile, Result<PathBuf, ResolveError>)>) -> Vec<RenamePlan> {
    let mut claims: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (index, (file, result)) in resolved.iter().enumerate() {
        if let Ok(destination) = result {
            if destination != file.path() {
                claims.entry(destination.clone()).or_default().push(index);
            }
        }
    }

    resolved
        .iter()
        .enumerate()
        .map(|(index, (file, result))| {
            let status = match result {
                Err(e) => PlanStatus::Skipped(e.clone()),
                Ok(destination) if destination == file.path() => PlanStatus::Unchanged,
                Ok(destination) => {
                    let other = claims
                        .get(destination)
                        .and_then(|owners| owners.iter().find(|&&i| i != index))
                        .map(|&i| resolved[i].0.path().to_path_buf());
                    match other {
                        Some(other) => PlanStatus::Blocked(RenameError::Conflict {
                            destination: destination.clone(),
                            other,
                        }),
                        None if destination.exists() => PlanStatus::Blocked(
                            RenameError::DestinationExists(destination.clone()),
                        ),
                        None => PlanStatus::Move(destination.clone()),
                    }
                }
            };
            RenamePlan {
                file: file.clone(),
                status,
            }
        })
        .collect()
}

/// Move `from` to `to`, creating parent directories. Never overwrites.
///
/// The destination is claimed with a hard link, which fails if it already
/// exists. Where linking is impossible (another device, no link support) the
/// data is copied into a file opened with `create_new` instead.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<(), RenameError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| RenameError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let move_error = |source| RenameError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    match fs::hard_link(from, to) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(RenameError::DestinationExists(to.to_path_buf()));
        }
        Err(e) => {
            debug!(from = %from.display(), to = %to.display(), error = %e, "Hard link failed, copying");
            copy_new(from, to)?;
        }
    }

    fs::remove_file(from).map_err(|source| {
        // Keep a single copy of the file on failure.
        let _ = fs::remove_file(to);
        move_error(source)
    })
}

/// Copy `from` into a newly created `to`.
fn copy_new(from: &Path, to: &Path) -> Result<(), RenameError> {
    let move_error = |source| RenameError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let mut source = fs::File::open(from).map_err(move_error)?;
    let mut target = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                RenameError::DestinationExists(to.to_path_buf())
            } else {
                move_error(e)
            }
        })?;

    let copied = io::copy(&mut source, &mut target)
        .and_then(|_| target.sync_all())
        .and_then(|()| fs::metadata(from))
        .and_then(|meta| fs::set_permissions(to, meta.permissions()));
    if let Err(e) = copied {
        drop(target);
        let _ = fs::remove_file(to);
        return Err(move_error(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_move_file_creates_parents() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.mkv");
        fs::write(&from, b"x").unwrap();
        let to = dir.path().join("Show (2020)/Season 1/a.mkv");

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"x");
    }

    #[test]
    fn test_move_file_never_overwrites() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.mkv");
        let to = dir.path().join("b.mkv");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        let err = move_file(&from, &to).unwrap_err();
        assert!(matches!(err, RenameError::DestinationExists(p) if p == to));
        assert_eq!(fs::read(&to).unwrap(), b"old");
        assert!(from.exists());
    }

    #[test]
    fn test_move_file_refuses_destination_created_late() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.mkv");
        let to = dir.path().join("Show/a.mkv");
        fs::write(&from, b"new").unwrap();

        // Destination appears after planning but before the move.
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, b"other").unwrap();

        assert!(matches!(
            move_file(&from, &to).unwrap_err(),
            RenameError::DestinationExists(_)
        ));
        assert_eq!(fs::read(&to).unwrap(), b"other");
        assert_eq!(fs::read(&from).unwrap(), b"new");
    }

    #[test]
    fn test_copy_new_never_overwrites() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.mkv");
        let to = dir.path().join("b.mkv");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        assert!(matches!(
            copy_new(&from, &to).unwrap_err(),
            RenameError::DestinationExists(_)
        ));
        assert_eq!(fs::read(&to).unwrap(), b"old");

        let fresh = dir.path().join("c.mkv");
        copy_new(&from, &fresh).unwrap();
        assert_eq!(fs::read(&fresh).unwrap(), b"new");
        assert!(from.exists());
    }
}
