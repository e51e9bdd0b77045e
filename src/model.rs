#![forbid(unsafe_code)]

//! Entities of the social/content graph.
//!
//! Field names mirror the JSON shape handed to API clients (camelCase), while
//! the store keeps snake_case columns.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    str::FromStr,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Opaque identifier shared by every entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a caller supplied reference; `field` names it in the error.
    pub fn parse(value: &str, field: &str) -> CoreResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| CoreError::invalid_id(field))
    }

    pub fn as_string(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value, "identifier")
    }
}

/// Reference to an externally stored binary asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub url: String,
    pub public_id: String,
}

impl AssetRef {
    pub fn new(url: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: public_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AssetRef>,
    pub created_at: DateTime<Utc>,
}

/// Trimmed owner projection attached to feed entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: EntityId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: EntityId,
    pub owner: EntityId,
    pub title: String,
    pub description: String,
    pub video_file: AssetRef,
    pub thumbnail: AssetRef,
    /// Seconds.
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input accepted when an owner publishes freshly uploaded assets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_file: AssetRef,
    pub thumbnail: AssetRef,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    pub video: EntityId,
    pub owner: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a like points at. Exactly one target per like by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LikeTarget {
    Video(EntityId),
    Comment(EntityId),
    Tweet(EntityId),
}

impl LikeTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Comment(_) => "comment",
            Self::Tweet(_) => "tweet",
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Video(id) | Self::Comment(id) | Self::Tweet(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: EntityId) -> Option<Self> {
        match kind {
            "video" => Some(Self::Video(id)),
            "comment" => Some(Self::Comment(id)),
            "tweet" => Some(Self::Tweet(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: EntityId,
    pub liked_by: EntityId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}

/// `subscriber` follows `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: EntityId,
    pub subscriber: EntityId,
    pub channel: EntityId,
    pub created_at: DateTime<Utc>,
}

/// Duplicate-free list of watched videos, most recent first.
///
/// The deque keeps recency order and the set answers membership in O(1).
#[derive(Debug, Clone, Default)]
pub struct WatchHistory {
    order: VecDeque<EntityId>,
    members: HashSet<EntityId>,
}

impl WatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from ids listed newest first. Later duplicates are
    /// dropped.
    pub fn from_recent_first(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut history = Self::new();
        for id in ids {
            if history.members.insert(id) {
                history.order.push_back(id);
            }
        }
        history
    }

    /// Moves `video` to the front, inserting it if it was never watched.
    /// Returns `true` when the entry is new.
    pub fn record(&mut self, video: EntityId) -> bool {
        let fresh = self.members.insert(video);
        if !fresh {
            self.order.retain(|id| *id != video);
        }
        self.order.push_front(video);
        fresh
    }

    pub fn contains(&self, video: &EntityId) -> bool {
        self.members.contains(video)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.order.iter()
    }
}

/// Timestamp format used for every stored `*_at` column. Fixed width, so
/// lexical order matches chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| CoreError::Internal(format!("corrupt timestamp {raw:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_rejects_garbage() {
        let err = EntityId::parse("not-an-id", "videoId").unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier(_)));
        assert_eq!(err.to_string(), "Invalid videoId");
    }

    #[test]
    fn entity_id_parses_its_own_display() {
        let id = EntityId::generate();
        let parsed = EntityId::parse(&id.to_string(), "id").unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.as_string(), id.to_string());
    }

    #[test]
    fn like_target_serializes_as_tagged_variant() {
        let id = EntityId::generate();
        let json = serde_json::to_value(LikeTarget::Comment(id)).unwrap();
        assert_eq!(json["kind"], "comment");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(LikeTarget::from_parts("comment", id), Some(LikeTarget::Comment(id)));
        assert_eq!(LikeTarget::from_parts("playlist", id), None);
    }

    #[test]
    fn watch_history_moves_rewatched_video_to_front() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        let mut history = WatchHistory::new();
        assert!(history.record(a));
        assert!(history.record(b));
        assert!(!history.record(a));

        let order: Vec<_> = history.iter().copied().collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(history.len(), 2);
        assert!(history.contains(&b));
    }

    #[test]
    fn watch_history_from_rows_drops_duplicates() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        let history = WatchHistory::from_recent_first([b, a, b]);
        let order: Vec<_> = history.iter().copied().collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn timestamps_round_trip_in_fixed_width() {
        let now = Utc::now();
        let raw = format_timestamp(now);
        assert!(raw.ends_with('Z'));
        let parsed = parse_timestamp(&raw).unwrap();
        assert_eq!(format_timestamp(parsed), raw);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
