use reelname_av::ProbeBackend;
use serde::{Deserialize, Serialize};

use crate::template::{TemplateError, TemplateSet, Templates};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default = "TemplateConfig::series")]
    pub series: TemplateConfig,

    #[serde(default = "TemplateConfig::movie")]
    pub movie: TemplateConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub tvdb: TvdbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            series: TemplateConfig::series(),
            movie: TemplateConfig::movie(),
            probe: ProbeConfig::default(),
            tvdb: TvdbConfig::default(),
        }
    }
}

impl Config {
    /// Compile both template lists.
    pub fn compile_templates(&self) -> Result<Templates, TemplateError> {
        Ok(Templates {
            series: TemplateSet::compile(&self.series.template)?,
            movie: TemplateSet::compile(&self.movie.template)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// UI preference, kept for the presentation layer
    #[serde(default = "default_true")]
    pub dark: bool,

    /// Extensions picked up during discovery (empty = every file)
    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dark: true,
            extensions: Vec::new(),
        }
    }
}

/// Ordered per-path-component templates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub template: Vec<String>,
}

impl TemplateConfig {
    pub(crate) fn series() -> Self {
        Self {
            template: vec![
                "{{n}} ({{y}})".to_string(),
                "Season {{s}}".to_string(),
                "{{n}} - {{s00e00}} - {{t}}".to_string(),
            ],
        }
    }

    pub(crate) fn movie() -> Self {
        Self {
            template: vec!["{{ny}}".to_string(), "{{ny}}".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub backend: ProbeBackend,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TvdbConfig {
    #[serde(default, alias = "apiKey")]
    pub api_key: String,

    /// Cached bearer token, refreshed after a login exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Translation preferred for display titles
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for TvdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            token: None,
            language: default_language(),
        }
    }
}
