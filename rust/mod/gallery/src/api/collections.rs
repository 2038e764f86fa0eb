use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use gallery_core::{ListResult, ServiceError};

use super::GalleryState;
use crate::model::{Collection, NewCollection, NewCollectionItem, Role};

pub fn router(state: GalleryState) -> Router {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/{id}",
            get(get_collection).delete(delete_collection),
        )
        .route("/collections/{id}/items", post(add_item))
        .route("/collections/{id}/items/{artwork_id}", delete(remove_item))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /collections
// ---------------------------------------------------------------------------

async fn list_collections(
    State(state): State<GalleryState>,
) -> Result<Json<ListResult<Collection>>, ServiceError> {
    let items = state.store.list_collections()?;
    Ok(Json(ListResult {
        total: items.len(),
        items,
    }))
}

// ---------------------------------------------------------------------------
// POST /collections
// ---------------------------------------------------------------------------

async fn create_collection(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Json(req): Json<NewCollection>,
) -> Result<Json<Collection>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    Ok(Json(state.store.create_collection(&req)?))
}

// ---------------------------------------------------------------------------
// GET /collections/{id}
// ---------------------------------------------------------------------------

async fn get_collection(
    State(state): State<GalleryState>,
    Path(id): Path<String>,
) -> Result<Json<Collection>, ServiceError> {
    Ok(Json(state.store.get_collection(&id)?))
}

// ---------------------------------------------------------------------------
// DELETE /collections/{id}
// ---------------------------------------------------------------------------

async fn delete_collection(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    state.store.delete_collection(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ---------------------------------------------------------------------------
// POST /collections/{id}/items
// ---------------------------------------------------------------------------

async fn add_item(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(item): Json<NewCollectionItem>,
) -> Result<Json<Collection>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    Ok(Json(state.store.add_collection_item(&id, &item)?))
}

// ---------------------------------------------------------------------------
// DELETE /collections/{id}/items/{artwork_id}
// ---------------------------------------------------------------------------

async fn remove_item(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path((id, artwork_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    let removed = state.store.remove_collection_item(&id, &artwork_id)?;
    Ok(Json(serde_json::json!({"ok": true, "removed": removed})))
}
