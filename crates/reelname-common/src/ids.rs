//! Typed ID wrappers.
//!
//! Files are identified by a UUID that stays stable while the file moves
//! around the batch (reordering, removal of neighbours), so event consumers can
//! correlate notifications with rows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a file in a rename batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a new random file ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<FileId> for Uuid {
    fn from(id: FileId) -> Self {
        id.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(FileId::new(), FileId::new());
    }

    #[test]
    fn test_uuid_round_trip() {
        let uuid = Uuid::new_v4();
        let id = FileId::from(uuid);
        assert_eq!(Uuid::from(id), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_serializes_transparently() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&FileId::from(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
