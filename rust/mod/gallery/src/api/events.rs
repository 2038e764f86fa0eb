use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use gallery_core::{ListResult, ServiceError};

use super::GalleryState;
use crate::model::{Event, EventView, NewEvent, Role, parse_status_filter};

pub fn router(state: GalleryState) -> Router {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct EventQuery {
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /events
// ---------------------------------------------------------------------------

async fn list_events(
    State(state): State<GalleryState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ListResult<EventView>>, ServiceError> {
    let status = parse_status_filter(query.status.as_deref().unwrap_or_default())
        .map_err(ServiceError::Validation)?;
    let items = state.store.list_events(status, Utc::now())?;
    Ok(Json(ListResult {
        total: items.len(),
        items,
    }))
}

// ---------------------------------------------------------------------------
// POST /events
// ---------------------------------------------------------------------------

async fn create_event(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Json(req): Json<NewEvent>,
) -> Result<Json<Event>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    Ok(Json(state.store.create_event(&req)?))
}

// ---------------------------------------------------------------------------
// GET /events/{id}
// ---------------------------------------------------------------------------

async fn get_event(
    State(state): State<GalleryState>,
    Path(id): Path<String>,
) -> Result<Json<EventView>, ServiceError> {
    let event = state.store.get_event(&id)?;
    Ok(Json(EventView {
        status: event.status_at(Utc::now()),
        event,
    }))
}

// ---------------------------------------------------------------------------
// PUT /events/{id}
// ---------------------------------------------------------------------------

async fn update_event(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Event>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    Ok(Json(state.store.update_event(&id, &patch)?))
}

// ---------------------------------------------------------------------------
// DELETE /events/{id}
// ---------------------------------------------------------------------------

async fn delete_event(
    State(state): State<GalleryState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.require_role(&headers, |r| r == Role::Admin)?;
    state.store.delete_event(&id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;

    use crate::api::test_support::{app, call};

    fn event(title: &str, starts_in_days: i64, lasts_days: i64) -> serde_json::Value {
        let start = Utc::now() + Duration::days(starts_in_days);
        json!({
            "title": title,
            "locationName": "Main hall",
            "startDate": start,
            "endDate": start + Duration::days(lasts_days),
        })
    }

    #[tokio::test]
    async fn only_admins_manage_events() {
        let (app, _store) = app();
        let body = event("Opening", 1, 1);

        let (status, _) = call(&app, "POST", "/events", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, "POST", "/events", Some("maker"), Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = call(&app, "POST", "/events", Some("admin"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();

        let uri = format!("/events/{id}");
        let patch = json!({"title": "Grand opening"});
        let (status, _) = call(&app, "PUT", &uri, Some("viewer"), Some(patch.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, updated) = call(&app, "PUT", &uri, Some("admin"), Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Grand opening");

        let (status, _) = call(&app, "DELETE", &uri, Some("viewer"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, json) = call(&app, "DELETE", &uri, Some("admin"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
        let (status, _) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (app, _store) = app();
        for body in [event("Soon", 3, 2), event("Running", -1, 3), event("Over", -10, 2)] {
            let (status, _) = call(&app, "POST", "/events", Some("admin"), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, all) = call(&app, "GET", "/events", None, None).await;
        assert_eq!(all["total"], 3);
        assert_eq!(all["items"][0]["title"], "Over");
        assert_eq!(all["items"][0]["status"], "past");
        assert_eq!(all["items"][1]["status"], "active");
        assert_eq!(all["items"][2]["status"], "upcoming");

        let (_, active) = call(&app, "GET", "/events?status=active", None, None).await;
        assert_eq!(active["total"], 1);
        assert_eq!(active["items"][0]["title"], "Running");
        assert_eq!(active["items"][0]["locationName"], "Main hall");

        let (_, upcoming) = call(&app, "GET", "/events?status=upcoming", None, None).await;
        assert_eq!(upcoming["items"][0]["title"], "Soon");

        let (_, everything) = call(&app, "GET", "/events?status=all", None, None).await;
        assert_eq!(everything["total"], 3);

        let (status, json) = call(&app, "GET", "/events?status=soon", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn single_event_carries_status() {
        let (app, _store) = app();
        let (_, created) = call(&app, "POST", "/events", Some("admin"), Some(event("Now", -1, 2))).await;
        let uri = format!("/events/{}", created["id"].as_str().unwrap());
        let (status, json) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "active");
    }

    #[tokio::test]
    async fn backwards_dates_are_rejected() {
        let (app, _store) = app();
        let (status, _) = call(&app, "POST", "/events", Some("admin"), Some(event("Oops", 2, -1))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
