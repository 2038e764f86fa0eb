use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Role of a profile. Unknown values read from the store fall back to `User`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Creator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Creator => "creator",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "creator" => Some(Self::Creator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Whether the role may publish artworks.
    pub fn can_publish(self) -> bool {
        matches!(self, Self::Creator | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user, creator or admin identity. `id` is the authenticated principal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: String,
}

impl Profile {
    /// Full name when set, username otherwise.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Body of `POST /profiles`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    /// Principal id. Defaults to the caller's own id.
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Artwork
// ---------------------------------------------------------------------------

/// A gallery item. `author_id` is a weak reference used for the byline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub id: String,
    pub title: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An artwork annotated with its author's names, as read from `artwork_cards`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkCard {
    #[serde(flatten)]
    pub artwork: Artwork,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_full_name: Option<String>,
}

/// Body of `POST /artworks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtwork {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the caller.
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Backfill support for imported items; defaults to now.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Favorite
// ---------------------------------------------------------------------------

/// Membership marker: one profile favorited one artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub artwork_id: String,
    pub created_at: String,
}

/// One row of the favorites page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub favorite_id: String,
    pub artwork: Artwork,
    /// Present only in the admin listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liker: Option<Profile>,
}

/// Result of a favorite toggle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
    pub liked: bool,
    pub favorite_id: Option<String>,
    /// Fresh count after the mutation; `None` when the refresh failed.
    pub favorites_count: Option<u64>,
}

/// Body of `POST /artworks/{id}/@favorite`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub favorite_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Search / feed
// ---------------------------------------------------------------------------

/// Ordering policy for the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Popular,
    Trending,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(Self::Newest),
            "popular" => Ok(Self::Popular),
            "trending" => Ok(Self::Trending),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

/// Input of the search merger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Free text matched against title, author names and tags.
    pub q: Option<String>,
    /// Single tag filter. `"all"` means no filter.
    pub tag: Option<String>,
    /// Multi-tag filter, matched by overlap.
    pub tags: Vec<String>,
    /// Per-sub-query window; the merger's default when absent.
    pub limit: Option<usize>,
    pub offset: usize,
}

/// One ranked row of the feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(flatten)]
    pub card: ArtworkCard,
    pub favorites_count: u64,
    pub liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_id: Option<String>,
}

/// A ranked, aggregated feed page.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub items: Vec<FeedItem>,
    pub counts: HashMap<String, u64>,
    /// artwork id -> the viewer's favorite row id
    pub liked: HashMap<String, String>,
    /// Names of sub-queries or aggregates that failed and contributed nothing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Where an event sits relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Upcoming,
    Past,
}

impl EventStatus {
    /// Active while `start <= now <= end`, past once `end` is behind.
    pub fn classify(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if start <= now && now <= end {
            Self::Active
        } else if end < now {
            Self::Past
        } else {
            Self::Upcoming
        }
    }
}

/// `?status=` of `GET /events`: `None` for `all` or empty.
pub fn parse_status_filter(s: &str) -> Result<Option<EventStatus>, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "all" => Ok(None),
        "active" => Ok(Some(EventStatus::Active)),
        "upcoming" => Ok(Some(EventStatus::Upcoming)),
        "past" => Ok(Some(EventStatus::Past)),
        other => Err(format!("unknown event status '{other}'")),
    }
}

/// A dated exhibition or meetup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub created_at: String,
}

impl Event {
    pub fn status_at(&self, now: DateTime<Utc>) -> EventStatus {
        EventStatus::classify(self.start_date, self.end_date, now)
    }
}

/// An event with its status at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub status: EventStatus,
}

/// Body of `POST /events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub external_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Artworks shown per collection.
pub const COLLECTION_PREVIEW: usize = 9;

/// A curated set of artworks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    /// First [`COLLECTION_PREVIEW`] items by position.
    pub artworks: Vec<Artwork>,
}

/// Body of `POST /collections`. Items take positions in the given order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artwork_ids: Vec<String>,
}

/// Body of `POST /collections/{id}/items`. Appends when `position` is absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollectionItem {
    pub artwork_id: String,
    #[serde(default)]
    pub position: Option<i64>,
}
