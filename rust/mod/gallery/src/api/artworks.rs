use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::warn;

use gallery_core::ServiceError;

use super::GalleryState;
use crate::feed::ToggleOutcome;
use crate::model::{Artwork, Feed, FeedItem, NewArtwork, Role, SearchQuery, SortBy, ToggleRequest};

pub fn router(state: GalleryState) -> Router {
    Router::new()
        .route("/artworks", get(list_artworks).post(create_artwork))
        .route(
            "/artworks/{id}",
            get(get_artwork).put(update_artwork).delete(delete_artwork),
        )
        .route("/artworks/{id}/@favorite", post(toggle_favorite))
        .with_state(state)
}

/// Query string of `GET /artworks`. `tags` is comma-separated.
#[derive(Debug, Default, Deserialize)]
struct FeedParams {
    q: Option<String>,
    tag: Option<String>,
    tags: Option<String>,
    sort: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

impl FeedParams {
    fn into_query(self) -> Result<(SearchQuery, SortBy), ServiceError> {
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse::<SortBy>().map_err(ServiceError::Validation)?,
            None => SortBy::default(),
        };
        let tags = self
            .tags
            .as_deref()
            .map(|t| t.split(',').map(String::from).collect())
            .unwrap_or_default();
        let query = SearchQuery {
            q: self.q,
            tag: self.tag,
            tags,
            limit: self.limit.filter(|l| *l > 0),
            offset: self.offset,
        };
        Ok((query, sort))
    }
}

// ---------------------------------------------------------------------------
// GET /artworks
// ---------------------------------------------------------------------------

async fn list_artworks(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Query(params): Query<FeedParams>,
) -> Result<Json<Feed>, ServiceError> {
    let viewer = state.viewer(&headers)?;
    let (query, sort) = params.into_query()?;
    let feed = state.feed.feed(&query, sort, viewer.as_deref()).await;
    Ok(Json(feed))
}

// ---------------------------------------------------------------------------
// POST /artworks
// ---------------------------------------------------------------------------

async fn create_artwork(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Json(mut req): Json<NewArtwork>,
) -> Result<Json<Artwork>, ServiceError> {
    let (viewer, role) = state.require_role(&headers, Role::can_publish)?;
    match req.author_id.as_deref() {
        None => req.author_id = Some(viewer),
        Some(author) if author != viewer && role != Role::Admin => {
            return Err(ServiceError::PermissionDenied(
                "only admins may publish for another author".into(),
            ));
        }
        Some(_) => {}
    }
    let artwork = state.store.create_artwork(&req)?;
    Ok(Json(artwork))
}

// ---------------------------------------------------------------------------
// GET /artworks/{id}
// ---------------------------------------------------------------------------

async fn get_artwork(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<FeedItem>, ServiceError> {
    let viewer = state.viewer(&headers)?;
    let card = state.store.get_card(&id)?;
    let aggregator = state.feed.aggregator();

    let favorites_count = aggregator.count_for(&id).await.unwrap_or_else(|e| {
        warn!(artwork = %id, error = %e, "favorite count unavailable");
        0
    });
    let favorite_id = match viewer.as_deref() {
        Some(v) => aggregator.find(v, &id).await.unwrap_or_else(|e| {
            warn!(artwork = %id, error = %e, "liked flag unavailable");
            None
        }),
        None => None,
    };

    Ok(Json(FeedItem {
        card,
        favorites_count,
        liked: favorite_id.is_some(),
        favorite_id,
    }))
}

// ---------------------------------------------------------------------------
// PUT /artworks/{id}
// ---------------------------------------------------------------------------

async fn update_artwork(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Artwork>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    let artwork = state.store.update_artwork(&id, &patch)?;
    Ok(Json(artwork))
}

// ---------------------------------------------------------------------------
// DELETE /artworks/{id}
// ---------------------------------------------------------------------------

async fn delete_artwork(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    state.store.delete_artwork(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ---------------------------------------------------------------------------
// POST /artworks/{id}/@favorite
// ---------------------------------------------------------------------------

async fn toggle_favorite(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ToggleRequest>>,
) -> Result<Json<ToggleOutcome>, ServiceError> {
    let viewer = state.viewer(&headers)?;
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let outcome = state
        .feed
        .toggle(viewer.as_deref(), &id, req.favorite_id.as_deref())
        .await?;
    Ok(Json(outcome))
}
