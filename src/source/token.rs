//! Durable storage for refreshed bearer tokens.

use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::persist;

/// Where a source keeps its bearer token between sessions.
pub trait TokenStore: Send + Sync {
    /// Token cached from a previous session.
    fn load(&self) -> Option<String>;

    /// Persist a freshly issued token.
    fn save(&self, token: &str) -> anyhow::Result<()>;
}

/// Writes `[<section>].token` into the configuration file.
pub struct ConfigTokenStore {
    path: Option<PathBuf>,
    section: &'static str,
    initial: Option<String>,
}

impl ConfigTokenStore {
    /// `path` is `None` when running from built-in defaults; saving is then a
    /// no-op and the token only lives for this process.
    pub fn new(path: Option<PathBuf>, section: &'static str, initial: Option<String>) -> Self {
        Self {
            path,
            section,
            initial,
        }
    }
}

impl TokenStore for ConfigTokenStore {
    fn load(&self) -> Option<String> {
        self.initial.clone()
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        match &self.path {
            Some(path) => {
                persist::update_source_token(path, self.section, token)?;
                debug!(section = self.section, path = %path.display(), "token persisted");
                Ok(())
            }
            None => {
                warn!(
                    section = self.section,
                    "no config file, refreshed token will not be persisted"
                );
                Ok(())
            }
        }
    }
}

/// In-memory store, useful for tests and one-off sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
    saves: Mutex<u32>,
}

impl MemoryTokenStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: Mutex::new(initial),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u32 {
        *self.saves.lock()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        *self.token.lock() = Some(token.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new(None);
        assert_eq!(store.load(), None);
        store.save("abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc"));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_config_store_without_file_is_noop() {
        let store = ConfigTokenStore::new(None, "tvdb", Some("cached".into()));
        assert_eq!(store.load().as_deref(), Some("cached"));
        store.save("new").unwrap();
    }

    #[test]
    fn test_config_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tvdb]\napi_key = \"k\"\n").unwrap();

        let store = ConfigTokenStore::new(Some(path.clone()), "tvdb", None);
        store.save("tok").unwrap();

        let config = crate::config::load_config(&path).unwrap();
        assert_eq!(config.tvdb.token.as_deref(), Some("tok"));
    }
}
