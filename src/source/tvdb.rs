//! TheTVDB v4 metadata source.
//!
//! Implements [`MetadataSource`] for series using the v4 REST API.
//!
//! - Bearer-token authentication; a 401 triggers a login exchange through
//!   [`AuthRetryPolicy`] and the new token is handed to a [`TokenStore`].
//! - Token-bucket rate limiting at 5 requests / second via [`governor`].
//! - 30-second request timeout.
//! - Episode lists are followed page by page through `links.next`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use parking_lot::RwLock;
use reelname_common::MediaKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    AuthRetryPolicy, EpisodeModel, MetadataSource, ParentModel, SourceError, TokenStore,
};
use crate::config::TvdbConfig;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const TVDB_BASE_URL: &str = "https://api4.thetvdb.com/v4";
const SERVICE: &str = "TheTVDB";
const CONFIG_SECTION: &str = "tvdb";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUESTS_PER_SECOND: u32 = 5;
/// Upper bound on followed `links.next` pages.
const MAX_PAGES: usize = 200;

// ---------------------------------------------------------------------------
// TVDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

/// TVDB mixes numeric and string encodings for ids and years.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(i64),
    Text(String),
}

impl Scalar {
    fn as_string(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    tvdb_id: Option<Scalar>,
    id: Option<Scalar>,
    name: Option<String>,
    #[serde(default)]
    translations: std::collections::HashMap<String, String>,
    year: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(default)]
    episodes: Vec<TvdbEpisode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbEpisode {
    id: Option<Scalar>,
    season_number: Option<u32>,
    number: Option<u32>,
    name: Option<String>,
    aired: Option<String>,
}

// ---------------------------------------------------------------------------
// Source implementation
// ---------------------------------------------------------------------------

/// TheTVDB series source.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use reelname::config::TvdbConfig;
/// use reelname::source::{MemoryTokenStore, TvdbSource};
///
/// let settings = TvdbConfig { api_key: "key".into(), ..Default::default() };
/// let source = TvdbSource::new(&settings, Arc::new(MemoryTokenStore::default()))?;
/// # Ok::<(), reelname::source::SourceError>(())
/// ```
pub struct TvdbSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    token: RwLock<Option<String>>,
    store: Arc<dyn TokenStore>,
    retry: AuthRetryPolicy,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl std::fmt::Debug for TvdbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TvdbSource")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl TvdbSource {
    pub const ID: &'static str = "tvdb";

    /// Create a source from the `[tvdb]` config block.
    ///
    /// The cached token is read from `store`.
    pub fn new(settings: &TvdbConfig, store: Arc<dyn TokenStore>) -> Result<Self, SourceError> {
        if settings.api_key.trim().is_empty() {
            return Err(SourceError::MissingCredentials {
                service: SERVICE,
                section: CONFIG_SECTION,
            });
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SourceError::Transport {
                service: SERVICE,
                source,
            })?;

        let quota = Quota::per_second(
            NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            base_url: TVDB_BASE_URL.to_string(),
            api_key: settings.api_key.trim().to_string(),
            language: settings.language.clone(),
            token: RwLock::new(store.load().filter(|t| !t.is_empty())),
            store,
            retry: AuthRetryPolicy::default(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Point the source at another server (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: AuthRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange the API key for a bearer token and persist it.
    async fn login(&self) -> Result<(), SourceError> {
        self.rate_limiter.until_ready().await;

        let url = self.url("/login");
        debug!(url = %url, "TVDB login");

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "apikey": self.api_key }))
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                service: SERVICE,
                source,
            })?;

        let body: Envelope<LoginData> = decode(check_status(resp, &url)?).await?;
        let token = body.data.token;

        self.store
            .save(&token)
            .map_err(|e| SourceError::Persist {
                service: SERVICE,
                message: format!("{e:#}"),
            })?;
        *self.token.write() = Some(token);

        info!(service = SERVICE, "logged in");
        Ok(())
    }

    /// Execute an authenticated GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        self.rate_limiter.until_ready().await;

        let mut request = self.client.get(url).query(query);
        if let Some(token) = self.token.read().as_deref() {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                service: SERVICE,
                source,
            })?;

        decode(check_status(resp, url)?).await
    }

    /// Authenticated GET wrapped in the refresh-and-retry policy.
    async fn authed<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        if self.token.read().is_none() {
            debug!("no cached TVDB token, logging in first");
            self.login().await?;
        }
        self.retry
            .run(SERVICE, move || self.get_json(url, query), move || self.login())
            .await
    }

    fn display_title(&self, result: &SearchResult) -> Option<String> {
        result
            .translations
            .get(&self.language)
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .or_else(|| result.name.clone())
    }

    fn next_page_url(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            self.url(&format!("/{}", next.trim_start_matches('/')))
        }
    }
}

fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(SourceError::Status {
            service: SERVICE,
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SourceError> {
    resp.json().await.map_err(|e| SourceError::Decode {
        service: SERVICE,
        message: e.to_string(),
    })
}

fn parse_year(year: Option<&Scalar>) -> Option<i32> {
    match year? {
        Scalar::Number(n) => i32::try_from(*n).ok(),
        Scalar::Text(s) => s.get(..4).and_then(|y| y.parse().ok()),
    }
}

fn parse_air_date(aired: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(aired?, "%Y-%m-%d").ok()
}

#[async_trait]
impl MetadataSource for TvdbSource {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn service(&self) -> &'static str {
        SERVICE
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Series
    }

    async fn search(&self, query: &str) -> Result<Vec<ParentModel>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url("/search");
        debug!(url = %url, query, "TVDB search");

        let body: Envelope<Vec<SearchResult>> = self
            .authed(&url, &[("query", query), ("type", "series")])
            .await?;

        let parents = body
            .data
            .iter()
            .filter_map(|r| {
                let ref_id = r.tvdb_id.as_ref().or(r.id.as_ref())?.as_string();
                let title = self.display_title(r)?;
                Some(ParentModel {
                    kind: MediaKind::Series,
                    source: Self::ID.to_string(),
                    ref_id,
                    title,
                    year: parse_year(r.year.as_ref()),
                })
            })
            .collect();

        Ok(parents)
    }

    async fn list_episodes(&self, parent: &ParentModel) -> Result<Vec<EpisodeModel>, SourceError> {
        if parent.kind != MediaKind::Series {
            return Ok(Vec::new());
        }

        let mut url = self.url(&format!(
            "/series/{}/episodes/default/{}",
            parent.ref_id, self.language
        ));
        let mut query: &[(&str, &str)] = &[("page", "0")];
        let mut episodes = Vec::new();

        for page in 0..MAX_PAGES {
            debug!(url = %url, page, "TVDB episodes");
            let body: Envelope<EpisodePage> = self.authed(&url, query).await?;

            episodes.extend(body.data.episodes.into_iter().map(|ep| EpisodeModel {
                ref_id: ep.id.map(|id| id.as_string()).unwrap_or_default(),
                season: ep.season_number.unwrap_or(0),
                episode: ep.number.unwrap_or(0),
                name: ep.name.filter(|n| !n.trim().is_empty()),
                air_date: parse_air_date(ep.aired.as_deref()),
            }));

            match body.links.and_then(|l| l.next).filter(|n| !n.is_empty()) {
                Some(next) => {
                    url = self.next_page_url(&next);
                    // the next link already carries its page parameter
                    query = &[];
                }
                None => return Ok(episodes),
            }
        }

        warn!(series = %parent.ref_id, pages = MAX_PAGES, "TVDB episode list truncated");
        Ok(episodes)
    }
}
