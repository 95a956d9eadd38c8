pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Commented document written by `reelname config init`.
pub const DEFAULT_CONFIG: &str = r#"# reelname configuration

[general]
# UI preference
dark = true
# Only pick up files with these extensions during discovery (empty = all)
extensions = []

# Destination templates: one string per path component, relative to the
# common base directory of the batch. The original extension is appended.
[series]
template = ["{{n}} ({{y}})", "Season {{s}}", "{{n}} - {{s00e00}} - {{t}}"]

[movie]
template = ["{{ny}}", "{{ny}}"]

[probe]
# auto | mediainfo | ffprobe
backend = "auto"

[tvdb]
api_key = ""
# Refreshed automatically after a login
token = ""
language = "eng"
"#;

/// Locations searched when no `--config` is given, in order.
const DEFAULT_PATHS: &[&str] = &["./reelname.toml", "~/.config/reelname/config.toml"];

/// A configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// `None` when running from built-in defaults.
    pub path: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    normalize(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = custom_path {
        return Ok(LoadedConfig {
            config: load_config(path)?,
            path: Some(path.to_path_buf()),
        });
    }

    for path in candidate_paths() {
        if path.exists() {
            tracing::debug!(path = %path.display(), "using config file");
            return Ok(LoadedConfig {
                config: load_config(&path)?,
                path: Some(path),
            });
        }
    }

    tracing::debug!("no config file found, using defaults");
    Ok(LoadedConfig {
        config: Config::default(),
        path: None,
    })
}

/// Path `config init`/`config edit` operate on.
///
/// The first existing candidate wins; otherwise the per-user location.
pub fn default_config_path() -> PathBuf {
    let candidates = candidate_paths();
    candidates
        .iter()
        .find(|p| p.exists())
        .or_else(|| candidates.last())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("reelname.toml"))
}

fn candidate_paths() -> Vec<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .collect()
}

/// Write [`DEFAULT_CONFIG`] to `path` unless a file already exists.
///
/// Returns `true` when a file was created.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(true)
}

fn normalize(config: &mut Config) {
    // An empty token in the file means "not logged in yet"
    if config.tvdb.token.as_deref().is_some_and(str::is_empty) {
        config.tvdb.token = None;
    }
    for ext in &mut config.general.extensions {
        *ext = ext.trim_start_matches('.').to_lowercase();
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    config
        .compile_templates()
        .context("Invalid rename template")?;

    if config.tvdb.language.trim().is_empty() {
        anyhow::bail!("tvdb.language cannot be empty");
    }

    Ok(())
}
