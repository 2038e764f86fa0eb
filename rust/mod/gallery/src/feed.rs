//! Feed assembly and client-side view state.
//!
//! `FeedService` wires the search merger, the favorite aggregator and the
//! ranking engine into one read path that never fails: every store problem
//! degrades to fewer rows or zero counts and is reported in
//! `Feed::degraded`. `FeedState` is the view-model a client keeps between
//! reads: one toggle per artwork in flight, later clicks queued as intent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::error::GalleryError;
use crate::favorites::FavoriteAggregator;
use crate::model::{Feed, FeedItem, SearchQuery, SortBy, Toggle};
use crate::ranking::rank;
use crate::relation::RelationStore;
use crate::search::SearchMerger;

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ToggleOutcome {
    Toggled(Toggle),
    /// No viewer identity; the client should prompt for sign-in.
    SignInRequired,
}

pub struct FeedService {
    merger: SearchMerger,
    aggregator: FavoriteAggregator,
}

impl FeedService {
    pub fn new(relation: Arc<dyn RelationStore>, window: usize) -> Self {
        Self {
            merger: SearchMerger::new(Arc::clone(&relation), window),
            aggregator: FavoriteAggregator::new(relation),
        }
    }

    pub fn aggregator(&self) -> &FavoriteAggregator {
        &self.aggregator
    }

    pub fn merger(&self) -> &SearchMerger {
        &self.merger
    }

    /// Search, aggregate and rank.
    pub async fn feed(&self, query: &SearchQuery, sort: SortBy, viewer: Option<&str>) -> Feed {
        let candidates = self.merger.merge(query).await;
        let mut degraded: Vec<String> = candidates
            .failed
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();

        let ids: Vec<String> = candidates
            .cards
            .iter()
            .map(|c| c.artwork.id.clone())
            .collect();
        let (counts, liked) = tokio::join!(
            self.aggregator.counts_for(&ids),
            self.aggregator.liked_set_for(viewer, &ids),
        );
        let counts = counts.unwrap_or_else(|e| {
            warn!(artworks = ids.len(), error = %e, "favorite counts unavailable");
            degraded.push("counts".into());
            HashMap::new()
        });
        let liked = liked.unwrap_or_else(|e| {
            warn!(viewer = viewer.unwrap_or("-"), error = %e, "liked set unavailable");
            degraded.push("liked".into());
            HashMap::new()
        });

        let mut items: Vec<FeedItem> = candidates
            .cards
            .into_iter()
            .map(|card| {
                let id = &card.artwork.id;
                FeedItem {
                    favorites_count: counts.get(id).copied().unwrap_or(0),
                    liked: liked.contains_key(id),
                    favorite_id: liked.get(id).cloned(),
                    card,
                }
            })
            .collect();
        rank(&mut items, sort, Utc::now());

        Feed {
            items,
            counts,
            liked,
            degraded,
        }
    }

    /// Toggle the viewer's favorite. Anonymous viewers get
    /// `SignInRequired` and the store is not touched.
    pub async fn toggle(
        &self,
        viewer: Option<&str>,
        artwork_id: &str,
        current: Option<&str>,
    ) -> Result<ToggleOutcome, GalleryError> {
        let Some(viewer) = viewer else {
            return Ok(ToggleOutcome::SignInRequired);
        };
        let toggle = self.aggregator.toggle(viewer, artwork_id, current).await?;
        Ok(ToggleOutcome::Toggled(toggle))
    }
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Favorite state of one artwork as shown to the viewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mark {
    pub liked: bool,
    pub favorite_id: Option<String>,
    pub count: u64,
}

/// Issued by [`FeedState::begin`] and [`FeedState::follow_up`]; only the
/// request in flight for an artwork, from the current generation, may
/// settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    artwork_id: String,
    seq: u64,
    generation: u64,
}

impl RequestToken {
    pub fn artwork_id(&self) -> &str {
        &self.artwork_id
    }
}

/// Favorite marks as shown to one viewer.
///
/// At most one toggle per artwork is in flight. Clicks made meanwhile only
/// change the shown intent; once the request settles, [`FeedState::follow_up`]
/// issues whatever it takes to reach that intent from the confirmed state.
#[derive(Debug)]
pub struct FeedState {
    shown: HashMap<String, Mark>,
    confirmed: HashMap<String, Mark>,
    in_flight: HashMap<String, u64>,
    next_seq: u64,
    generation: u64,
    open: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            shown: HashMap::new(),
            confirmed: HashMap::new(),
            in_flight: HashMap::new(),
            next_seq: 0,
            generation: 0,
            open: true,
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a fresh read. Requests still in flight
    /// belong to the old data and are dropped when they settle.
    pub fn load(&mut self, feed: &Feed) {
        self.generation += 1;
        self.in_flight.clear();
        self.shown = feed
            .items
            .iter()
            .map(|item| {
                (
                    item.card.artwork.id.clone(),
                    Mark {
                        liked: item.liked,
                        favorite_id: item.favorite_id.clone(),
                        count: item.favorites_count,
                    },
                )
            })
            .collect();
        self.confirmed = self.shown.clone();
    }

    pub fn get(&self, artwork_id: &str) -> Option<&Mark> {
        self.shown.get(artwork_id)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// A click: flip the shown liked flag.
    ///
    /// Returns the token plus the favorite row id to send, or `None` when
    /// the view is closed or a request for the artwork is already in flight.
    /// The count is left alone until the server reports a fresh one.
    pub fn begin(&mut self, artwork_id: &str) -> Option<(RequestToken, Option<String>)> {
        if !self.open {
            return None;
        }
        let mark = self.shown.entry(artwork_id.to_string()).or_default();
        mark.liked = !mark.liked;
        if self.in_flight.contains_key(artwork_id) {
            return None;
        }
        Some(self.issue(artwork_id))
    }

    /// The request still needed once nothing is in flight and the shown
    /// intent differs from the confirmed state.
    pub fn follow_up(&mut self, artwork_id: &str) -> Option<(RequestToken, Option<String>)> {
        if !self.open || self.in_flight.contains_key(artwork_id) {
            return None;
        }
        let wanted = self.shown.get(artwork_id)?.liked;
        if wanted == self.confirmed_liked(artwork_id) {
            return None;
        }
        Some(self.issue(artwork_id))
    }

    /// Apply a server-confirmed toggle. Returns whether it was applied.
    ///
    /// The shown liked flag keeps the viewer's latest intent.
    pub fn apply_confirmed(&mut self, token: &RequestToken, toggle: &Toggle) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.in_flight.remove(&token.artwork_id);
        let previous = self
            .confirmed
            .get(&token.artwork_id)
            .map(|m| m.count)
            .unwrap_or(0);
        let confirmed = Mark {
            liked: toggle.liked,
            favorite_id: toggle.favorite_id.clone(),
            count: toggle.favorites_count.unwrap_or(previous),
        };
        let wanted = self
            .shown
            .get(&token.artwork_id)
            .map_or(confirmed.liked, |m| m.liked);
        self.shown.insert(
            token.artwork_id.clone(),
            Mark {
                liked: wanted,
                ..confirmed.clone()
            },
        );
        self.confirmed.insert(token.artwork_id.clone(), confirmed);
        true
    }

    /// Restore the last confirmed value after a failed or refused request,
    /// dropping clicks queued behind it. Returns whether it was applied.
    pub fn rollback(&mut self, token: &RequestToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.in_flight.remove(&token.artwork_id);
        let mark = self
            .confirmed
            .get(&token.artwork_id)
            .cloned()
            .unwrap_or_default();
        self.shown.insert(token.artwork_id.clone(), mark);
        true
    }

    /// Settle a request with whatever the service returned.
    pub fn settle(
        &mut self,
        token: &RequestToken,
        result: &Result<ToggleOutcome, GalleryError>,
    ) -> bool {
        match result {
            Ok(ToggleOutcome::Toggled(toggle)) => self.apply_confirmed(token, toggle),
            Ok(ToggleOutcome::SignInRequired) | Err(_) => self.rollback(token),
        }
    }

    /// The view went away; every outstanding token is void.
    pub fn close(&mut self) {
        self.open = false;
        self.generation += 1;
    }

    /// Start a request toward the shown intent. Unliking sends the
    /// confirmed row id, never an optimistic one.
    fn issue(&mut self, artwork_id: &str) -> (RequestToken, Option<String>) {
        self.next_seq += 1;
        let token = RequestToken {
            artwork_id: artwork_id.to_string(),
            seq: self.next_seq,
            generation: self.generation,
        };
        self.in_flight.insert(artwork_id.to_string(), token.seq);

        let wanted = self.shown.get(artwork_id).is_some_and(|m| m.liked);
        let current = if wanted {
            None
        } else {
            self.confirmed
                .get(artwork_id)
                .and_then(|m| m.favorite_id.clone())
        };
        (token, current)
    }

    fn confirmed_liked(&self, artwork_id: &str) -> bool {
        self.confirmed.get(artwork_id).is_some_and(|m| m.liked)
    }

    fn is_current(&self, token: &RequestToken) -> bool {
        self.open
            && token.generation == self.generation
            && self.in_flight.get(&token.artwork_id) == Some(&token.seq)
    }
}
