//! Core type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media a metadata parent describes.
///
/// Series parents are matched together with an episode; movies stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A TV series whose files are individual episodes.
    Series,
    /// A single feature film.
    Movie,
}

impl MediaKind {
    /// Label used for the `type` template variable.
    pub fn item_label(self) -> &'static str {
        match self {
            Self::Series => "Episode",
            Self::Movie => "Movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Series => write!(f, "series"),
            Self::Movie => write!(f, "movie"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "series" | "tv" | "show" => Ok(Self::Series),
            "movie" | "film" => Ok(Self::Movie),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        for kind in [MediaKind::Series, MediaKind::Movie] {
            assert_eq!(kind.to_string().parse::<MediaKind>(), Ok(kind));
        }
        assert_eq!("TV".parse::<MediaKind>(), Ok(MediaKind::Series));
        assert!("music".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&MediaKind::Movie).unwrap();
        assert_eq!(json, "\"movie\"");
        let kind: MediaKind = serde_json::from_str("\"series\"").unwrap();
        assert_eq!(kind, MediaKind::Series);
    }

    #[test]
    fn test_item_label() {
        assert_eq!(MediaKind::Series.item_label(), "Episode");
        assert_eq!(MediaKind::Movie.item_label(), "Movie");
    }
}
