//! The working set of files for one rename session.
//!
//! A [`Batch`] owns every [`MediaFile`] discovered under a root, assigns
//! matches in batch order or over a selection, and applies the renames once
//! destinations are resolved.

pub mod discover;
pub mod rename;

pub use discover::discover;
pub use rename::{PlanStatus, RenameError, RenamePlan, RenameReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use reelname_common::paths::common_base;
use reelname_common::MediaKind;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::file::{EventBus, FileEvent, FileServices, FileState, MediaFile};
use crate::probe::MediaProber;
use crate::source::{EpisodeModel, Match, ParentModel};
use crate::template::Templates;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("not a file or directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("no files found under {}", .0.display())]
    Empty(PathBuf),
}

/// Direction for [`Batch::shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

#[derive(Debug)]
pub struct Batch {
    services: Arc<FileServices>,
    files: Vec<MediaFile>,
}

impl Batch {
    /// Discover files under `root` and analyse their names.
    pub fn load(
        root: &Path,
        extensions: &[String],
        templates: Templates,
        prober: Arc<dyn MediaProber>,
    ) -> Result<Self, BatchError> {
        let paths = discover(root, extensions)?;
        let batch = Self::from_paths(paths, templates, prober)
            .ok_or_else(|| BatchError::Empty(root.to_path_buf()))?;
        info!(
            root = %root.display(),
            base = %batch.base_dir().display(),
            files = batch.len(),
            "batch loaded"
        );
        Ok(batch)
    }

    /// Build a batch from explicit paths. `None` when `paths` is empty.
    pub fn from_paths(
        paths: Vec<PathBuf>,
        templates: Templates,
        prober: Arc<dyn MediaProber>,
    ) -> Option<Self> {
        let base_dir = common_base(&paths)?;
        let services = Arc::new(FileServices {
            prober,
            templates,
            base_dir,
            events: EventBus::new(),
        });
        let files = paths
            .into_iter()
            .map(|path| MediaFile::new(path, services.clone()))
            .collect();
        Some(Self { services, files })
    }

    /// Longest directory shared by every file. Destinations are rooted here.
    pub fn base_dir(&self) -> &Path {
        &self.services.base_dir
    }

    pub fn templates(&self) -> &Templates {
        &self.services.templates
    }

    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    pub fn get(&self, index: usize) -> Option<&MediaFile> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.services.events.subscribe()
    }

    /// Indices of files without a match, in batch order.
    pub fn unmatched(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.current_match().is_none())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn all_matched(&self) -> bool {
        self.files.iter().all(|file| file.current_match().is_some())
    }

    /// Indices of files whose media analysis failed.
    pub fn failed(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.state() == FileState::AnalysisFailed)
            .map(|(index, _)| index)
            .collect()
    }

    /// Whether any file is matched with analysis pending or done.
    pub fn has_renameable(&self) -> bool {
        self.files.iter().any(|file| {
            matches!(
                file.state(),
                FileState::Ready | FileState::MatchedPendingMedia
            )
        })
    }

    /// Probe a failed file again. False if `index` is out of range or the
    /// file has not failed.
    pub fn retry_analysis(&self, index: usize) -> bool {
        self.files
            .get(index)
            .is_some_and(|file| file.retry_media_analysis())
    }

    /// Assign matches to unmatched files in batch order. Returns how many
    /// files were matched.
    pub fn append(&self, parent: &ParentModel, episodes: &[EpisodeModel]) -> usize {
        let targets = self.unmatched();
        self.assign(&targets, parent, episodes)
    }

    /// Overwrite the matches of `selection`, pairing in selection order.
    /// Out-of-range indices are ignored.
    pub fn replace(&self, selection: &[usize], parent: &ParentModel, episodes: &[EpisodeModel]) -> usize {
        let targets: Vec<usize> = selection
            .iter()
            .copied()
            .filter(|&index| index < self.files.len())
            .collect();
        self.assign(&targets, parent, episodes)
    }

    pub fn clear_match(&self, index: usize) -> bool {
        match self.files.get(index) {
            Some(file) => {
                file.set_match(None);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<MediaFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Exchange the matches of two files.
    pub fn swap_matches(&self, a: usize, b: usize) -> bool {
        let (Some(first), Some(second)) = (self.files.get(a), self.files.get(b)) else {
            return false;
        };
        if a == b {
            return true;
        }
        let first_match = first.current_match();
        first.set_match(second.current_match());
        second.set_match(first_match);
        true
    }

    /// Move two files past each other. Matches stay with their positions, so
    /// the files exchange matches as well.
    pub fn swap_files(&mut self, a: usize, b: usize) -> bool {
        if !self.swap_matches(a, b) {
            return false;
        }
        self.files.swap(a, b);
        true
    }

    /// Move the file at `index` one position. Returns its new index, or
    /// `None` at either end of the batch.
    pub fn shift(&mut self, index: usize, direction: Shift) -> Option<usize> {
        let target = match direction {
            Shift::Up => index.checked_sub(1)?,
            Shift::Down => index + 1,
        };
        if index >= self.files.len() || target >= self.files.len() {
            return None;
        }
        self.swap_files(index, target).then_some(target)
    }

    /// Resolve every destination and run the consistency checks.
    pub async fn preview(&self) -> Vec<RenamePlan> {
        let resolved = join_all(self.files.iter().map(|file| async move {
            (file.clone(), file.resolve_destination().await)
        }))
        .await;
        rename::check_plans(resolved)
    }

    /// Move every renameable file and drop it from the batch.
    ///
    /// Failures are per file; the rest of the batch is still processed.
    pub async fn apply_renames(&mut self) -> RenameReport {
        let mut report = RenameReport::default();
        let mut applied = Vec::new();

        for plan in self.preview().await {
            let from = plan.source().to_path_buf();
            match plan.status {
                PlanStatus::Move(to) => match rename::move_file(&from, &to) {
                    Ok(()) => {
                        info!(from = %from.display(), to = %to.display(), "renamed");
                        plan.file.mark_applied(&to);
                        applied.push(plan.file.id());
                        report.renamed.push((from, to));
                    }
                    Err(e) => {
                        warn!(file = %from.display(), error = %e, "rename failed");
                        report.failed.push((from, e));
                    }
                },
                PlanStatus::Unchanged => {
                    report.skipped.push((from, "already at destination".to_string()));
                }
                PlanStatus::Skipped(reason) => report.skipped.push((from, reason.to_string())),
                PlanStatus::Blocked(e) => {
                    warn!(file = %from.display(), error = %e, "rename blocked");
                    report.failed.push((from, e));
                }
            }
        }

        self.files.retain(|file| !applied.contains(&file.id()));
        report
    }

    fn assign(&self, targets: &[usize], parent: &ParentModel, episodes: &[EpisodeModel]) -> usize {
        let matches = matches_for(parent, episodes);
        let mut assigned = 0;
        for (&index, m) in targets.iter().zip(matches) {
            self.files[index].set_match(Some(m));
            assigned += 1;
        }
        assigned
    }
}

/// Matches a parent and its chosen episodes expand to. A movie is one match.
pub fn matches_for(parent: &ParentModel, episodes: &[EpisodeModel]) -> Vec<Match> {
    match parent.kind {
        MediaKind::Movie => vec![Match::Movie {
            parent: parent.clone(),
        }],
        MediaKind::Series => episodes
            .iter()
            .map(|episode| Match::Episode {
                parent: parent.clone(),
                episode: episode.clone(),
            })
            .collect(),
    }
}
