use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use gallery_core::{ListParams, ListResult, ServiceError};

use super::GalleryState;
use crate::model::{NewProfile, Profile, Role};

pub fn router(state: GalleryState) -> Router {
    Router::new()
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/{id}",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/authors", get(list_authors))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ProfileQuery {
    role: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

impl GalleryState {
    /// The viewer, if they are `id` or an admin, with their role.
    fn require_self_or_admin(
        &self,
        headers: &HeaderMap,
        id: &str,
    ) -> Result<(String, Role), ServiceError> {
        let viewer = self.require_viewer(headers)?;
        let role = self.store.role_of(&viewer)?;
        if viewer != id && role != Role::Admin {
            return Err(ServiceError::PermissionDenied(format!(
                "profile {id} belongs to someone else"
            )));
        }
        Ok((viewer, role))
    }
}

// ---------------------------------------------------------------------------
// GET /profiles
// ---------------------------------------------------------------------------

async fn list_profiles(
    State(state): State<GalleryState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ListResult<Profile>>, ServiceError> {
    let role = match query.role.as_deref().filter(|r| !r.is_empty()) {
        Some(r) => Some(
            Role::from_str(r)
                .ok_or_else(|| ServiceError::Validation(format!("unknown role '{r}'")))?,
        ),
        None => None,
    };
    let mut params = ListParams::default();
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        params.limit = limit;
    }
    params.offset = query.offset;

    Ok(Json(state.store.list_profiles(role, &params)?))
}

// ---------------------------------------------------------------------------
// GET /authors
// ---------------------------------------------------------------------------

async fn list_authors(
    State(state): State<GalleryState>,
) -> Result<Json<ListResult<Profile>>, ServiceError> {
    let items = state.store.list_authors()?;
    Ok(Json(ListResult {
        total: items.len(),
        items,
    }))
}

// ---------------------------------------------------------------------------
// POST /profiles
// ---------------------------------------------------------------------------

async fn create_profile(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Json(req): Json<NewProfile>,
) -> Result<Json<Profile>, ServiceError> {
    let viewer = state.require_viewer(&headers)?;
    let id = req.id.clone().unwrap_or_else(|| viewer.clone());

    // Signup creates the caller's own plain profile; anything else is admin work.
    if (id != viewer || req.role != Role::User) && state.store.role_of(&viewer)? != Role::Admin {
        return Err(ServiceError::PermissionDenied(
            "only admins create other profiles or assign roles".into(),
        ));
    }

    Ok(Json(state.store.create_profile(&id, &req)?))
}

// ---------------------------------------------------------------------------
// GET /profiles/{id}
// ---------------------------------------------------------------------------

async fn get_profile(
    State(state): State<GalleryState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ServiceError> {
    Ok(Json(state.store.get_profile(&id)?))
}

// ---------------------------------------------------------------------------
// PUT /profiles/{id}
// ---------------------------------------------------------------------------

async fn update_profile(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Profile>, ServiceError> {
    let (_, role) = state.require_self_or_admin(&headers, &id)?;
    if role != Role::Admin {
        if let Some(requested) = patch.get("role") {
            let current = state.store.get_profile(&id)?.role;
            if requested.as_str() != Some(current.as_str()) {
                return Err(ServiceError::PermissionDenied(
                    "only admins change roles".into(),
                ));
            }
        }
    }

    Ok(Json(state.store.update_profile(&id, &patch)?))
}

// ---------------------------------------------------------------------------
// DELETE /profiles/{id}
// ---------------------------------------------------------------------------

async fn delete_profile(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.require_self_or_admin(&headers, &id)?;
    state.store.delete_profile(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
