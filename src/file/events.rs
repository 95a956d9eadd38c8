//! File lifecycle notifications.
//!
//! The state machine never talks to a presentation layer directly; it
//! publishes [`FileEvent`]s on a broadcast channel and whoever renders the
//! batch subscribes.

use std::path::PathBuf;

use reelname_common::FileId;
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Derived lifecycle state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Discovered,
    FilenameAnalyzed,
    Unmatched,
    MatchedPendingMedia,
    Ready,
    AnalysisFailed,
    Applied,
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileState::Discovered => "discovered",
            FileState::FilenameAnalyzed => "filename analyzed",
            FileState::Unmatched => "unmatched",
            FileState::MatchedPendingMedia => "pending media",
            FileState::Ready => "ready",
            FileState::AnalysisFailed => "analysis failed",
            FileState::Applied => "applied",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FileEvent {
    StateChanged {
        id: FileId,
        state: FileState,
    },
    /// `label` is `None` when the match was cleared.
    MatchChanged {
        id: FileId,
        generation: u64,
        label: Option<String>,
    },
    DestinationResolved {
        id: FileId,
        generation: u64,
        destination: PathBuf,
    },
    AnalysisFailed {
        id: FileId,
        error: String,
    },
    Renamed {
        id: FileId,
        from: PathBuf,
        to: PathBuf,
    },
}

impl FileEvent {
    pub fn file_id(&self) -> FileId {
        match self {
            FileEvent::StateChanged { id, .. }
            | FileEvent::MatchChanged { id, .. }
            | FileEvent::DestinationResolved { id, .. }
            | FileEvent::AnalysisFailed { id, .. }
            | FileEvent::Renamed { id, .. } => *id,
        }
    }
}

/// Broadcast channel shared by every file of a batch.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FileEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all subscribers.
    pub fn emit(&self, event: FileEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for file event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
