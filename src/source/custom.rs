//! Local source for user-entered movie titles.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reelname_common::MediaKind;

use super::{EpisodeModel, MetadataSource, ParentModel, SourceError};

/// Turns `Title (Year)` or `Title` into a single movie parent.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomSource;

static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.+?)(?:\s*\((?P<year>\d+)\))?$").expect("input regex must compile")
});

impl CustomSource {
    pub const ID: &'static str = "custom";

    pub fn new() -> Self {
        Self
    }

    fn parse(query: &str) -> Option<ParentModel> {
        let query = query.trim();
        let caps = INPUT_RE.captures(query)?;
        let title = caps.name("title")?.as_str().trim();
        if title.is_empty() {
            return None;
        }
        Some(ParentModel {
            kind: MediaKind::Movie,
            source: Self::ID.to_string(),
            ref_id: String::new(),
            title: title.to_string(),
            year: caps.name("year").and_then(|y| y.as_str().parse().ok()),
        })
    }
}

#[async_trait]
impl MetadataSource for CustomSource {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn service(&self) -> &'static str {
        "Custom"
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Movie
    }

    async fn search(&self, query: &str) -> Result<Vec<ParentModel>, SourceError> {
        Ok(Self::parse(query).into_iter().collect())
    }

    async fn list_episodes(&self, _parent: &ParentModel) -> Result<Vec<EpisodeModel>, SourceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_year_of_any_length() {
        let results = CustomSource.search("Ancient (476)").await.unwrap();
        assert_eq!(results[0].title, "Ancient");
        assert_eq!(results[0].year, Some(476));
    }

    #[tokio::test]
    async fn test_title_and_year() {
        let results = CustomSource.search("Movie (2019)").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Movie");
        assert_eq!(results[0].year, Some(2019));
        assert_eq!(results[0].kind, MediaKind::Movie);
        assert_eq!(results[0].source, "custom");
    }

    #[tokio::test]
    async fn test_title_only() {
        let results = CustomSource.search("  Blade Runner 2049 ").await.unwrap();
        assert_eq!(results[0].title, "Blade Runner 2049");
        assert_eq!(results[0].year, None);
    }

    #[tokio::test]
    async fn test_parenthesised_title_without_year() {
        let results = CustomSource.search("Up (Pixar)").await.unwrap();
        assert_eq!(results[0].title, "Up (Pixar)");
        assert_eq!(results[0].year, None);
    }

    #[tokio::test]
    async fn test_blank_query() {
        assert!(CustomSource.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_episodes() {
        let parent = CustomSource.search("Movie (2019)").await.unwrap().remove(0);
        assert!(CustomSource.list_episodes(&parent).await.unwrap().is_empty());
    }
}
