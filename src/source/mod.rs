//! Metadata sources.
//!
//! A [`MetadataSource`] turns a user query into candidate [`ParentModel`]s
//! (series or movies) and lists the [`EpisodeModel`]s of a parent. Assigning
//! a parent (and, for series, an episode) to a file produces a [`Match`].
//!
//! Sources are constructed through the static [`registry::SourceRegistry`];
//! a [`registry::SourcePool`] keeps one live instance per source so HTTP
//! clients and bearer tokens are reused across a session.

pub mod custom;
pub mod registry;
pub mod retry;
pub mod token;
pub mod tvdb;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reelname_common::MediaKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{Context, Field, Origin};

pub use custom::CustomSource;
pub use registry::{SourceDescriptor, SourceEnv, SourcePool, SourceRegistry};
pub use retry::AuthRetryPolicy;
pub use token::{ConfigTokenStore, MemoryTokenStore, TokenStore};
pub use tvdb::TvdbSource;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A series or movie identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentModel {
    pub kind: MediaKind,
    /// Registry id of the source that produced this parent.
    pub source: String,
    /// Opaque source-specific reference (empty for local parents).
    pub ref_id: String,
    pub title: String,
    pub year: Option<i32>,
}

impl ParentModel {
    /// `Title (Year)`, or just the title when the year is unknown.
    pub fn display_name(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// A single episode of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeModel {
    pub ref_id: String,
    pub season: u32,
    pub episode: u32,
    pub name: Option<String>,
    pub air_date: Option<NaiveDate>,
}

impl EpisodeModel {
    /// `1x01`
    pub fn sxe(&self) -> String {
        format!("{}x{:02}", self.season, self.episode)
    }

    /// `S01E01`
    pub fn s00e00(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// Metadata assigned to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Match {
    Movie {
        parent: ParentModel,
    },
    Episode {
        parent: ParentModel,
        episode: EpisodeModel,
    },
}

impl Match {
    pub fn parent(&self) -> &ParentModel {
        match self {
            Match::Movie { parent } | Match::Episode { parent, .. } => parent,
        }
    }

    pub fn episode(&self) -> Option<&EpisodeModel> {
        match self {
            Match::Movie { .. } => None,
            Match::Episode { episode, .. } => Some(episode),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Match::Movie { .. } => MediaKind::Movie,
            Match::Episode { .. } => MediaKind::Series,
        }
    }

    /// Short description used in prompts and logs.
    pub fn label(&self) -> String {
        match self {
            Match::Movie { parent } => parent.display_name(),
            Match::Episode { parent, episode } => match &episode.name {
                Some(name) => format!("{} - {} - {}", parent.title, episode.sxe(), name),
                None => format!("{} - {}", parent.title, episode.sxe()),
            },
        }
    }

    /// Replace every match-derived field of `ctx` with values from this match.
    pub fn fill_context(&self, ctx: &mut Context) {
        ctx.clear_origin(Origin::Match);

        let parent = self.parent();
        ctx.set(Field::Name, parent.title.as_str());
        ctx.set_opt(Field::Year, parent.year);
        ctx.set(Field::NameYear, parent.display_name());
        ctx.set(Field::ItemType, self.kind().item_label());
        ctx.set_opt(Field::SortLetter, sort_letter(&parent.title));
        if !parent.ref_id.is_empty() {
            ctx.set(Field::Id, parent.ref_id.as_str());
        }
        if let Some(year) = parent.year {
            ctx.set(Field::Decade, year - year.rem_euclid(10));
        }

        let mut info = BTreeMap::from([
            ("title".to_string(), parent.title.clone()),
            ("kind".to_string(), parent.kind.to_string()),
            ("source".to_string(), parent.source.clone()),
        ]);
        if let Some(year) = parent.year {
            info.insert("year".to_string(), year.to_string());
        }
        if !parent.ref_id.is_empty() {
            info.insert("id".to_string(), parent.ref_id.clone());
        }

        if let Match::Episode { episode, .. } = self {
            ctx.set(Field::Season, episode.season);
            ctx.set(Field::Episode, episode.episode);
            ctx.set(Field::SxE, episode.sxe());
            ctx.set(Field::S00E00, episode.s00e00());
            ctx.set_opt(Field::Title, episode.name.clone());
            ctx.set_opt(Field::AirDate, episode.air_date);
            ctx.set(Field::EpisodeNumbers, vec![episode.episode.to_string()]);
            ctx.set(Field::EpisodeLabel, self.label());
            if let Some(date) = episode.air_date {
                info.insert("airdate".to_string(), date.to_string());
                info.insert("airyear".to_string(), date.year().to_string());
            }
        }

        ctx.set(Field::Info, info);
    }
}

/// Collection letter for a title, ignoring leading articles.
fn sort_letter(title: &str) -> Option<String> {
    let trimmed = title.trim();
    let body = ["the ", "a ", "an "]
        .iter()
        .find_map(|article| {
            trimmed
                .get(..article.len())
                .filter(|head| head.eq_ignore_ascii_case(article))
                .map(|_| &trimmed[article.len()..])
        })
        .unwrap_or(trimmed);

    let first = body.chars().find(|c| c.is_alphanumeric())?;
    if first.is_ascii_digit() {
        Some("0-9".to_string())
    } else {
        Some(first.to_uppercase().collect())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a metadata source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service} returned HTTP {status} for {url}")]
    Status {
        service: &'static str,
        status: u16,
        url: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} needs an API key; set `{section}.api_key` in the config file")]
    MissingCredentials {
        service: &'static str,
        section: &'static str,
    },

    #[error("{service} kept rejecting the session after {attempts} login attempts")]
    AuthExhausted { service: &'static str, attempts: u32 },

    #[error("failed to persist the refreshed {service} token: {message}")]
    Persist {
        service: &'static str,
        message: String,
    },

    #[error("unknown metadata source `{0}`")]
    UnknownSource(String),
}

impl SourceError {
    /// Whether the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SourceError::Status { status: 401, .. })
    }
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Search and episode-listing capabilities of a metadata provider.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Registry id (e.g. `"tvdb"`).
    fn id(&self) -> &'static str;

    /// Human readable service name (e.g. `"TheTVDB"`).
    fn service(&self) -> &'static str;

    /// Kind of parents this source returns.
    fn kind(&self) -> MediaKind;

    /// Candidate parents for a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<ParentModel>, SourceError>;

    /// Episodes of `parent`. Always empty for movies.
    async fn list_episodes(&self, parent: &ParentModel) -> Result<Vec<EpisodeModel>, SourceError>;
}
