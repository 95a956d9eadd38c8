//! Per-file state machine.
//!
//! A [`MediaFile`] owns the context for one source path and moves through
//! `Unmatched → MatchedPendingMedia → Ready → Applied`. Filename analysis runs
//! at construction, media analysis is offloaded to the blocking pool once a
//! match is assigned, and destination rendering waits on the analysis gate.
//!
//! Every match assignment bumps a generation counter. A destination is only
//! stored if the generation it was computed for is still current, so a slow
//! resolution for a replaced match can never overwrite the newer result.

pub mod analysis;
pub mod events;
pub mod gate;

pub use events::{EventBus, FileEvent, FileState};
pub use gate::{AnalysisGate, AnalysisStatus};

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use reelname_common::FileId;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::context::{Context, Origin};
use crate::probe::{apply_media_info, MediaInfo, MediaProber};
use crate::source::Match;
use crate::template::{RenderError, Templates};

/// Why a file has no destination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("file has no match")]
    Unmatched,

    #[error("media analysis failed: {0}")]
    AnalysisFailed(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Collaborators shared by every file of a batch.
pub struct FileServices {
    pub prober: Arc<dyn MediaProber>,
    pub templates: Templates,
    pub base_dir: PathBuf,
    pub events: EventBus,
}

impl std::fmt::Debug for FileServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServices")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct FileData {
    context: Context,
    current: Option<Match>,
    generation: u64,
    destination: Option<PathBuf>,
    analysis_started: bool,
    applied: bool,
    /// Last state announced on the event bus.
    state: FileState,
}

#[derive(Debug)]
struct Inner {
    id: FileId,
    path: PathBuf,
    suffix: OsString,
    services: Arc<FileServices>,
    gate: AnalysisGate,
    data: RwLock<FileData>,
}

/// Handle to one file of a batch. Clones share state.
#[derive(Debug, Clone)]
pub struct MediaFile {
    inner: Arc<Inner>,
}

impl MediaFile {
    /// Create a file and run filename analysis.
    pub fn new(path: impl Into<PathBuf>, services: Arc<FileServices>) -> Self {
        let path = path.into();
        let suffix = path
            .extension()
            .map(|ext| {
                let mut suffix = OsString::from(".");
                suffix.push(ext);
                suffix
            })
            .unwrap_or_default();

        let mut context = Context::new();
        analysis::analyze_filename(&path, &mut context);

        let file = Self {
            inner: Arc::new(Inner {
                id: FileId::new(),
                path,
                suffix,
                services,
                gate: AnalysisGate::new(),
                data: RwLock::new(FileData {
                    context,
                    current: None,
                    generation: 0,
                    destination: None,
                    analysis_started: false,
                    applied: false,
                    state: FileState::FilenameAnalyzed,
                }),
            }),
        };
        file.refresh_state();
        file
    }

    pub fn id(&self) -> FileId {
        self.inner.id
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Original extension including its dot, or empty.
    pub fn suffix(&self) -> &OsStr {
        &self.inner.suffix
    }

    pub fn state(&self) -> FileState {
        let status = self.inner.gate.status();
        derive_state(&self.inner.data.read(), &status)
    }

    pub fn current_match(&self) -> Option<Match> {
        self.inner.data.read().current.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.data.read().generation
    }

    /// Snapshot of the current context.
    pub fn context(&self) -> Context {
        self.inner.data.read().context.clone()
    }

    pub fn media_status(&self) -> AnalysisStatus {
        self.inner.gate.status()
    }

    /// Last destination stored for the current match.
    pub fn destination(&self) -> Option<PathBuf> {
        self.inner.data.read().destination.clone()
    }

    /// Assign or clear the match.
    ///
    /// Assigning the match the file already has is a no-op. Anything else
    /// bumps the generation, drops the stored destination and rewrites the
    /// match-derived fields. Media fields are kept across a clear so a later
    /// assignment reuses the probe.
    pub fn set_match(&self, next: Option<Match>) {
        let (generation, label) = {
            let mut data = self.inner.data.write();
            if data.current == next {
                return;
            }
            data.generation += 1;
            data.destination = None;
            match &next {
                Some(m) => m.fill_context(&mut data.context),
                None => data.context.clear_origin(Origin::Match),
            }
            data.current = next.clone();
            (data.generation, next.as_ref().map(Match::label))
        };

        debug!(
            file = %self.inner.path.display(),
            generation,
            label = label.as_deref().unwrap_or("<none>"),
            "match changed"
        );
        self.emit(FileEvent::MatchChanged {
            id: self.inner.id,
            generation,
            label,
        });
        self.refresh_state();

        if next.is_some() {
            self.analyze_media();
            self.schedule_refresh();
        }
    }

    /// Start media analysis unless it already ran or is running.
    ///
    /// The probe runs on the blocking pool when a runtime is available and
    /// inline otherwise.
    pub fn analyze_media(&self) {
        {
            let mut data = self.inner.data.write();
            if data.analysis_started {
                return;
            }
            data.analysis_started = true;
        }

        let file = self.clone();
        let probe = move || {
            let result = file.inner.services.prober.probe(&file.inner.path);
            file.record_probe(result.map_err(|e| e.to_string()));
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(probe);
            }
            Err(_) => probe(),
        }
    }

    /// Re-run a failed media analysis. Returns `false` if the last analysis
    /// did not fail.
    pub fn retry_media_analysis(&self) -> bool {
        if !self.inner.gate.reset() {
            return false;
        }
        self.inner.data.write().analysis_started = false;
        self.refresh_state();
        self.analyze_media();
        if self.inner.data.read().current.is_some() {
            self.schedule_refresh();
        }
        true
    }

    /// Render the destination from the current context.
    ///
    /// Pure: nothing is stored and the analysis gate is not consulted. Callers
    /// that need a final path use [`MediaFile::resolve_destination`].
    pub fn render_destination(
        &self,
        base_dir: &Path,
        templates: &Templates,
    ) -> Result<PathBuf, ResolveError> {
        let data = self.inner.data.read();
        self.render_locked(&data, base_dir, templates)
    }

    /// Wait for media analysis and store the destination for the newest match.
    pub async fn resolve_destination(&self) -> Result<PathBuf, ResolveError> {
        loop {
            let generation = {
                let data = self.inner.data.read();
                if data.current.is_none() {
                    return Err(ResolveError::Unmatched);
                }
                data.generation
            };

            if let AnalysisStatus::Failed(reason) = self.inner.gate.wait().await {
                return Err(ResolveError::AnalysisFailed(reason));
            }

            let destination = {
                let mut data = self.inner.data.write();
                if data.generation != generation {
                    debug!(
                        file = %self.inner.path.display(),
                        stale = generation,
                        current = data.generation,
                        "discarding stale destination"
                    );
                    continue;
                }
                let services = &self.inner.services;
                let destination =
                    self.render_locked(&data, &services.base_dir, &services.templates)?;
                data.destination = Some(destination.clone());
                destination
            };

            self.emit(FileEvent::DestinationResolved {
                id: self.inner.id,
                generation,
                destination: destination.clone(),
            });
            return Ok(destination);
        }
    }

    pub(crate) fn mark_applied(&self, to: &Path) {
        self.inner.data.write().applied = true;
        self.emit(FileEvent::Renamed {
            id: self.inner.id,
            from: self.inner.path.clone(),
            to: to.to_path_buf(),
        });
        self.refresh_state();
    }

    fn render_locked(
        &self,
        data: &FileData,
        base_dir: &Path,
        templates: &Templates,
    ) -> Result<PathBuf, ResolveError> {
        let current = data.current.as_ref().ok_or(ResolveError::Unmatched)?;
        let view = data.context.render_view();
        let path = templates
            .for_kind(current.kind())
            .render_destination(&view, base_dir, &self.inner.suffix)?;
        Ok(path)
    }

    fn record_probe(&self, result: Result<MediaInfo, String>) {
        match result {
            Ok(info) => {
                apply_media_info(&info, &mut self.inner.data.write().context);
                self.inner.gate.complete();
                debug!(file = %self.inner.path.display(), "media analysis complete");
            }
            Err(error) => {
                warn!(file = %self.inner.path.display(), %error, "media analysis failed");
                self.inner.gate.fail(error.clone());
                self.emit(FileEvent::AnalysisFailed {
                    id: self.inner.id,
                    error,
                });
            }
        }
        self.refresh_state();
    }

    fn schedule_refresh(&self) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let file = self.clone();
        handle.spawn(async move {
            if let Err(e) = file.resolve_destination().await {
                debug!(file = %file.inner.path.display(), error = %e, "background resolve skipped");
            }
        });
    }

    /// Emit a change event if the derived state moved since the last one.
    fn refresh_state(&self) {
        let status = self.inner.gate.status();
        let changed = {
            let mut data = self.inner.data.write();
            let next = derive_state(&data, &status);
            (data.state != next).then(|| {
                data.state = next;
                next
            })
        };
        if let Some(state) = changed {
            self.emit(FileEvent::StateChanged {
                id: self.inner.id,
                state,
            });
        }
    }

    fn emit(&self, event: FileEvent) {
        self.inner.services.events.emit(event);
    }
}

fn derive_state(data: &FileData, status: &AnalysisStatus) -> FileState {
    if data.applied {
        FileState::Applied
    } else if matches!(status, AnalysisStatus::Failed(_)) {
        FileState::AnalysisFailed
    } else if data.current.is_none() {
        FileState::Unmatched
    } else if *status == AnalysisStatus::Pending {
        FileState::MatchedPendingMedia
    } else {
        FileState::Ready
    }
}
