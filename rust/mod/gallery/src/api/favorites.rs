use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get};
use axum::{Json, Router};

use gallery_core::{ListResult, ServiceError};

use super::GalleryState;
use crate::model::FavoriteEntry;

pub fn router(state: GalleryState) -> Router {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/{id}", delete(remove_favorite))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /favorites
// ---------------------------------------------------------------------------

async fn list_favorites(
    State(state): State<GalleryState>,
    headers: HeaderMap,
) -> Result<Json<ListResult<FavoriteEntry>>, ServiceError> {
    let viewer = state.require_viewer(&headers)?;
    let items = state.store.favorites_for(&viewer)?;
    Ok(Json(ListResult {
        total: items.len(),
        items,
    }))
}

// ---------------------------------------------------------------------------
// DELETE /favorites/{id}
// ---------------------------------------------------------------------------

async fn remove_favorite(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let viewer = state.require_viewer(&headers)?;
    let removed = state.store.remove_favorite(&viewer, &id)?;
    Ok(Json(serde_json::json!({"ok": true, "removed": removed})))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{app, call};

    async fn liked_artwork(app: &axum::Router, by: &[&str]) -> (String, Vec<String>) {
        let (_, created) = call(
            app,
            "POST",
            "/artworks",
            Some("maker"),
            Some(json!({"title": "Dawn", "imageUrl": "dawn.png"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let mut favorites = Vec::new();
        for viewer in by {
            let (_, t) = call(app, "POST", &format!("/artworks/{id}/@favorite"), Some(viewer), None).await;
            favorites.push(t["favoriteId"].as_str().unwrap().to_string());
        }
        (id, favorites)
    }

    #[tokio::test]
    async fn listing_requires_sign_in() {
        let (app, _store) = app();
        let (status, json) = call(&app, "GET", "/favorites", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn users_see_own_admins_see_all() {
        let (app, _store) = app();
        liked_artwork(&app, &["viewer", "maker"]).await;

        let (_, own) = call(&app, "GET", "/favorites", Some("viewer"), None).await;
        assert_eq!(own["total"], 1);
        assert_eq!(own["items"][0]["artwork"]["title"], "Dawn");
        assert!(own["items"][0].get("liker").is_none());

        let (_, all) = call(&app, "GET", "/favorites", Some("admin"), None).await;
        assert_eq!(all["total"], 2);
        let mut likers: Vec<_> = all["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["liker"]["username"].as_str().unwrap().to_string())
            .collect();
        likers.sort();
        assert_eq!(likers, vec!["maker", "viewer"]);
    }

    #[tokio::test]
    async fn remove_is_owner_or_admin() {
        let (app, _store) = app();
        let (_, favorites) = liked_artwork(&app, &["viewer", "maker"]).await;
        let viewer_fav = format!("/favorites/{}", favorites[0]);
        let maker_fav = format!("/favorites/{}", favorites[1]);

        let (status, _) = call(&app, "DELETE", &viewer_fav, Some("maker"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, json) = call(&app, "DELETE", &viewer_fav, Some("viewer"), None).await;
        assert_eq!(json["removed"], true);
        let (status, json) = call(&app, "DELETE", &viewer_fav, Some("viewer"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], false);

        let (_, json) = call(&app, "DELETE", &maker_fav, Some("admin"), None).await;
        assert_eq!(json["removed"], true);
    }

    #[tokio::test]
    async fn deleting_artwork_clears_favorites() {
        let (app, _store) = app();
        let (id, _) = liked_artwork(&app, &["viewer"]).await;
        call(&app, "DELETE", &format!("/artworks/{id}"), Some("admin"), None).await;

        let (_, own) = call(&app, "GET", "/favorites", Some("viewer"), None).await;
        assert_eq!(own["total"], 0);
    }
}
