use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};

pub mod watchlist;

pub use watchlist::{
    timestamp_now, EntryDraft, EntryId, Rating, RatingOutOfRange, WatchStatus, Watchlist, WatchlistEntry,
};

/// Signed-in user whose watchlist lives in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Builds an identity from a provider user id; blank ids are rejected
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of title tracked in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media type: {}", other)),
        }
    }
}

/// Which kinds a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogScope {
    #[default]
    All,
    Only(MediaKind),
}

impl CatalogScope {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogScope::All => "all",
            CatalogScope::Only(kind) => kind.as_str(),
        }
    }
}

impl FromStr for CatalogScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CatalogScope::All),
            other => other.parse().map(CatalogScope::Only),
        }
    }
}

/// Trending time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// Optional filters for discovery listings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscoverFilters {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl DiscoverFilters {
    /// TMDB query parameters for the filters that are set
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        [
            ("with_genres", &self.genre),
            ("with_original_language", &self.lang),
            ("with_origin_country", &self.country),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (name, v.to_string()))
        })
        .collect()
    }
}

/// A movie, series or person record as returned by the catalog
///
/// Only the fields the service inspects are typed; everything else the
/// upstream sends is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogItem {
    /// Movie title or series name
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    /// Release date for movies, first air date for series
    pub fn premiere(&self) -> Option<NaiveDate> {
        [&self.release_date, &self.first_air_date]
            .into_iter()
            .flatten()
            .find_map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
    }

    pub fn year(&self) -> Option<String> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
            .map(str::to_string)
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.media_type = Some(kind.to_string());
        self
    }
}

/// `{ "results": [...] }` envelope of TMDB list endpoints and of our own listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub results: Vec<CatalogItem>,
}
