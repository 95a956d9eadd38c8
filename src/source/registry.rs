//! Static source registry and the per-session source pool.
//!
//! The [`SourceRegistry`] maps a source id to a constructor function. It is
//! populated explicitly (see [`SourceRegistry::builtin`]); nothing registers
//! itself. The [`SourcePool`] builds each source on first use and hands out
//! the same instance afterwards.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use reelname_common::MediaKind;
use tracing::debug;

use super::{
    ConfigTokenStore, CustomSource, MetadataSource, SourceError, TvdbSource,
};
use crate::config::Config;

/// Everything a source constructor may need.
#[derive(Debug, Clone, Default)]
pub struct SourceEnv {
    pub config: Config,
    /// Config file refreshed tokens are written to.
    pub config_path: Option<PathBuf>,
}

/// Builds a live source instance.
pub type SourceConstructor = fn(&SourceEnv) -> Result<Arc<dyn MetadataSource>, SourceError>;

/// A registry entry.
#[derive(Clone)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub service: &'static str,
    pub kind: MediaKind,
    pub build: SourceConstructor,
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Mapping from source id to constructor, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<SourceDescriptor>,
}

fn build_tvdb(env: &SourceEnv) -> Result<Arc<dyn MetadataSource>, SourceError> {
    let store = ConfigTokenStore::new(
        env.config_path.clone(),
        "tvdb",
        env.config.tvdb.token.clone(),
    );
    Ok(Arc::new(TvdbSource::new(&env.config.tvdb, Arc::new(store))?))
}

fn build_custom(_env: &SourceEnv) -> Result<Arc<dyn MetadataSource>, SourceError> {
    Ok(Arc::new(CustomSource::new()))
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the sources shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SourceDescriptor {
            id: TvdbSource::ID,
            service: "TheTVDB",
            kind: MediaKind::Series,
            build: build_tvdb,
        });
        registry.register(SourceDescriptor {
            id: CustomSource::ID,
            service: "Custom",
            kind: MediaKind::Movie,
            build: build_custom,
        });
        registry
    }

    /// Add an entry. A later entry with the same id replaces the earlier one.
    pub fn register(&mut self, descriptor: SourceDescriptor) {
        self.entries.retain(|d| d.id != descriptor.id);
        self.entries.push(descriptor);
    }

    pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.entries
    }
}

/// One live instance per source id, built on demand.
pub struct SourcePool {
    registry: SourceRegistry,
    env: SourceEnv,
    live: Mutex<HashMap<&'static str, Arc<dyn MetadataSource>>>,
}

impl SourcePool {
    pub fn new(registry: SourceRegistry, env: SourceEnv) -> Self {
        Self {
            registry,
            env,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// The live instance for `id`, constructing it on first use.
    ///
    /// A failed construction is not cached, so fixing the config and asking
    /// again works within the same session.
    pub fn get(&self, id: &str) -> Result<Arc<dyn MetadataSource>, SourceError> {
        let descriptor = self
            .registry
            .get(id)
            .ok_or_else(|| SourceError::UnknownSource(id.to_string()))?;

        let mut live = self.live.lock();
        if let Some(source) = live.get(descriptor.id) {
            return Ok(Arc::clone(source));
        }

        debug!(source = descriptor.id, "constructing metadata source");
        let source = (descriptor.build)(&self.env)?;
        live.insert(descriptor.id, Arc::clone(&source));
        Ok(source)
    }
}
