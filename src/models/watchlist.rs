use std::collections::HashSet;
use std::fmt::Display;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::MediaKind;

/// Catalog identifier of a tracked title
pub type EntryId = u64;

/// Current time at the millisecond precision entries are stored with
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Viewing progress of a watchlist entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    PlanToWatch,
    Watching,
    Completed,
    Dropped,
}

impl Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WatchStatus::PlanToWatch => "plan_to_watch",
            WatchStatus::Watching => "watching",
            WatchStatus::Completed => "completed",
            WatchStatus::Dropped => "dropped",
        };
        write!(f, "{}", label)
    }
}

/// Star rating from 0 to 5, where 0 means unrated
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_rated(self) -> bool {
        self.0 > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 0 and 5, got {0}")]
pub struct RatingOutOfRange(pub i64);

impl TryFrom<u8> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingOutOfRange(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Caller-provided part of a new watchlist entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryDraft {
    #[serde(rename = "tmdb_id")]
    pub id: EntryId,
    pub title: String,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

/// A tracked title with its status, rating and notes
///
/// Serialized with the field names and millisecond timestamps of the
/// on-device format so stored collections stay readable across versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    #[serde(rename = "tmdb_id")]
    pub id: EntryId,
    pub title: String,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl WatchlistEntry {
    pub fn from_draft(draft: EntryDraft, status: WatchStatus, added_at: DateTime<Utc>) -> Self {
        Self {
            id: draft.id,
            title: draft.title,
            media_kind: draft.media_kind,
            poster_path: draft.poster_path,
            status,
            added_at,
            rating: Rating::default(),
            rated_at: None,
            notes: String::new(),
            year: draft.year,
        }
    }
}

/// Ordered watchlist, most recently added first
///
/// Ids are unique. Every mutation reports whether anything changed so
/// callers only persist real changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
}

impl<'de> Deserialize<'de> for Watchlist {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<WatchlistEntry>::deserialize(deserializer).map(Self::from_entries)
    }
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a watchlist from stored entries, keeping the first occurrence of each id
    pub fn from_entries(entries: Vec<WatchlistEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.id))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<WatchlistEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntryId) -> Option<&WatchlistEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn get_mut(&mut self, id: EntryId) -> Option<&mut WatchlistEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Prepends a new entry unless the id is already tracked
    pub fn add(&mut self, draft: EntryDraft, status: WatchStatus, now: DateTime<Utc>) -> bool {
        if self.contains(draft.id) {
            return false;
        }
        self.entries
            .insert(0, WatchlistEntry::from_draft(draft, status, now));
        true
    }

    pub fn remove(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn set_status(&mut self, id: EntryId, status: WatchStatus) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Updates the rating and stamps `rated_at`, even when the value is unchanged
    pub fn set_rating(&mut self, id: EntryId, rating: Rating, now: DateTime<Utc>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.rating = rating;
                entry.rated_at = Some(now);
                true
            }
            None => false,
        }
    }

    pub fn set_notes(&mut self, id: EntryId, notes: String) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.notes = notes;
                true
            }
            None => false,
        }
    }
}
